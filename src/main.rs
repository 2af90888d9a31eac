//! civicgrid - recent 311 street-condition reports with photo evidence

use clap::{CommandFactory, Parser};

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod media;
mod models;
mod output;
mod portal;
mod report;

use cli::args::GlobalOptions;
use cli::feed::FeedArgs;
use cli::{CacheCommands, Cli, Commands, ConfigCommands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Feed {
            pages,
            save_dir,
            no_resolve,
        } => {
            let args = FeedArgs {
                pages,
                save_dir,
                no_resolve,
            };
            cli::feed::run(&opts, &args).await
        }
        Commands::Resolve { media, output } => {
            cli::resolve::run(&opts, &media, output.as_deref()).await
        }
        Commands::Classify { media } => cli::resolve::classify(&opts, &media),
        Commands::Cache(cmd) => match cmd {
            CacheCommands::Status => cli::cache::status(opts.format),
            CacheCommands::Clear { kind } => cli::cache::clear(opts.format, kind),
            CacheCommands::Path => cli::cache::path(),
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Init { force } => cli::config::init(opts.config_ref(), force),
            ConfigCommands::Show => cli::config::show(opts.config_ref(), opts.format),
        },
        Commands::Completion { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "civicgrid",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Commands::Version => {
            println!("civicgrid version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// `--debug` raises the default level to debug; `RUST_LOG` wins when set
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
