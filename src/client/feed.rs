//! Open-data feed client (Socrata SODA endpoint)

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use log::debug;
use reqwest::{Client as HttpClient, StatusCode};

use super::FeedApi;
use super::models::ComplaintRecord;
use crate::config::FeedConfig;
use crate::error::{ApiError, Result};

/// Records added per "load more" step
pub const LOAD_MORE_INCREMENT: usize = 300;

/// Feed query parameters.
///
/// `limit` is owned by the caller: the presentation layer decides how many
/// pages it wants and threads that through [`FeedQuery::from_config`] or
/// [`FeedQuery::load_more`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub neighborhood: String,
    pub categories: Vec<String>,
    pub subtypes: Vec<String>,
    pub window_days: u32,
    pub since: NaiveDateTime,
    pub limit: usize,
}

impl FeedQuery {
    /// Build the query for `pages` pages of results ending at `now`
    pub fn from_config(config: &FeedConfig, pages: usize, now: NaiveDateTime) -> Self {
        Self {
            neighborhood: config.neighborhood.clone(),
            categories: config.categories.clone(),
            subtypes: config.subtypes.clone(),
            window_days: config.window_days,
            since: now - ChronoDuration::days(i64::from(config.window_days)),
            limit: config.page_size * pages.max(1),
        }
    }

    /// Same query with room for one more page
    pub fn load_more(&self, increment: usize) -> Self {
        Self {
            limit: self.limit + increment,
            ..self.clone()
        }
    }

    /// SoQL `$where` expression
    pub fn where_clause(&self) -> String {
        let mut clauses = vec![
            format!("analysis_neighborhood = '{}'", soql_escape(&self.neighborhood)),
            format!(
                "requested_datetime > '{}'",
                self.since.format("%Y-%m-%dT%H:%M:%S")
            ),
            "media_url IS NOT NULL".to_string(),
        ];

        let category_terms: Vec<String> = self
            .categories
            .iter()
            .map(|c| format!("service_name LIKE '%{}%'", soql_escape(c)))
            .chain(
                self.subtypes
                    .iter()
                    .map(|s| format!("service_subtype = '{}'", soql_escape(s))),
            )
            .collect();
        if !category_terms.is_empty() {
            clauses.push(format!("({})", category_terms.join(" OR ")));
        }

        clauses.join(" AND ")
    }

    /// Query-string parameters for the request
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("$where", self.where_clause()),
            ("$order", "requested_datetime DESC".to_string()),
            ("$limit", self.limit.to_string()),
        ]
    }

    /// Parameters identifying this query for caching.
    ///
    /// The rolling lower bound is represented by the window length rather
    /// than the exact timestamp so repeated runs within the TTL hit the cache.
    pub fn cache_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("neighborhood", self.neighborhood.clone()),
            ("categories", self.categories.join("|")),
            ("subtypes", self.subtypes.join("|")),
            ("window_days", self.window_days.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// Escape a value for a single-quoted SoQL literal
fn soql_escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// HTTP client for the open-data feed
pub struct FeedClient {
    http: HttpClient,
    endpoint: String,
}

impl FeedClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl FeedApi for FeedClient {
    async fn fetch_records(&self, query: &FeedQuery) -> Result<Vec<ComplaintRecord>> {
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.endpoint, e)))?;

        debug!("Feed query: {}", query.where_clause());
        let response = self
            .http
            .get(url)
            .query(&query.to_params())
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let records = response.json::<Vec<ComplaintRecord>>().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse feed: {}", e))
                })?;
                debug!("Feed returned {} records", records.len());
                Ok(records)
            }
            StatusCode::BAD_REQUEST => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(msg).into())
            }
            status if status.is_server_error() => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                Err(ApiError::ServerError(msg).into())
            }
            _ => Err(ApiError::InvalidResponse(format!("Unexpected status code: {}", status)).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::NaiveDate;
    use mockito::Matcher;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_query_from_config() {
        let query = FeedQuery::from_config(&FeedConfig::default(), 2, now());
        assert_eq!(query.limit, 600);
        assert_eq!(query.since.format("%Y-%m-%d").to_string(), "2024-04-01");
    }

    #[test]
    fn test_zero_pages_means_one() {
        let query = FeedQuery::from_config(&FeedConfig::default(), 0, now());
        assert_eq!(query.limit, 300);
    }

    #[test]
    fn test_load_more_grows_limit_only() {
        let query = FeedQuery::from_config(&FeedConfig::default(), 1, now());
        let more = query.load_more(LOAD_MORE_INCREMENT);
        assert_eq!(more.limit, 600);
        assert_eq!(more.since, query.since);
        assert_eq!(more.neighborhood, query.neighborhood);
    }

    #[test]
    fn test_where_clause() {
        let query = FeedQuery::from_config(&FeedConfig::default(), 1, now());
        assert_eq!(
            query.where_clause(),
            "analysis_neighborhood = 'South of Market' AND \
             requested_datetime > '2024-04-01T12:00:00' AND media_url IS NOT NULL AND \
             (service_name LIKE '%General Request%' OR service_name LIKE '%Encampment%')"
        );
    }

    #[test]
    fn test_where_clause_subtypes_and_escaping() {
        let config = FeedConfig {
            neighborhood: "Fisherman's Wharf".to_string(),
            categories: vec![],
            subtypes: vec!["human_waste".to_string()],
            ..FeedConfig::default()
        };
        let clause = FeedQuery::from_config(&config, 1, now()).where_clause();
        assert!(clause.contains("'Fisherman''s Wharf'"));
        assert!(clause.ends_with("(service_subtype = 'human_waste')"));
    }

    #[test]
    fn test_where_clause_without_category_filter() {
        let config = FeedConfig {
            categories: vec![],
            subtypes: vec![],
            ..FeedConfig::default()
        };
        let clause = FeedQuery::from_config(&config, 1, now()).where_clause();
        assert!(clause.ends_with("media_url IS NOT NULL"));
    }

    #[tokio::test]
    async fn test_fetch_records() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/resource/feed.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("$limit".into(), "300".into()),
                Matcher::UrlEncoded("$order".into(), "requested_datetime DESC".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"service_request_id": "1", "media_url": "https://cdn.test/a.jpg"}]"#)
            .create_async()
            .await;

        let client = FeedClient::new(format!("{}/resource/feed.json", server.url())).unwrap();
        let query = FeedQuery::from_config(&FeedConfig::default(), 1, now());
        let records = client.fetch_records(&query).await.unwrap();

        assert_eq!(records.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_records_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/resource/feed.json")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = FeedClient::new(format!("{}/resource/feed.json", server.url())).unwrap();
        let query = FeedQuery::from_config(&FeedConfig::default(), 1, now());
        let err = client.fetch_records(&query).await.unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::ServerError(_))));
    }

    #[tokio::test]
    async fn test_fetch_records_invalid_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/resource/feed.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": true}"#)
            .create_async()
            .await;

        let client = FeedClient::new(format!("{}/resource/feed.json", server.url())).unwrap();
        let query = FeedQuery::from_config(&FeedConfig::default(), 1, now());
        let err = client.fetch_records(&query).await.unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::InvalidResponse(_))));
    }
}
