//! Portal session establishment
//!
//! A [`PortalSession`] is built for exactly one wrapper URL and dropped when
//! that resolution finishes. It owns its own HTTP client so the cookie jar is
//! never shared between cases.

use std::sync::Arc;

use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderValue, ORIGIN, REFERER};
use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::Value;
use url::Url;

use super::client::Limiter;
use super::scrape;
use super::{PortalError, PortalResult};
use crate::config::PortalConfig;

/// Header the portal expects the scraped CSRF token in
const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Marker the custom-action endpoint uses to route attachment calls
const ATTACHMENT_FORM_NAME: &str = "download_attachments";

/// Authorized session for one portal case
pub struct PortalSession {
    http: HttpClient,
    limiter: Arc<Limiter>,
    origin: Url,
    page_url: String,
    case_id: String,
    form_ref: String,
    csrf_token: Option<String>,
    authorization: Option<HeaderValue>,
}

impl std::fmt::Debug for PortalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalSession")
            .field("origin", &self.origin.as_str())
            .field("case_id", &self.case_id)
            .field("form_ref", &self.form_ref)
            .field("has_csrf", &self.csrf_token.is_some())
            .field("has_authorization", &self.authorization.is_some())
            .finish()
    }
}

impl PortalSession {
    /// Run the page-load and handshake steps for a wrapper URL.
    ///
    /// Fails without touching the network when the URL carries no `caseid`.
    pub async fn establish(
        wrapper_url: &str,
        config: &PortalConfig,
        limiter: Arc<Limiter>,
    ) -> PortalResult<Self> {
        let wrapper =
            Url::parse(wrapper_url).map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
        let case_id = scrape::case_id(&wrapper).ok_or(PortalError::MissingCaseId)?;
        let origin = origin_of(&wrapper)?;

        let http = HttpClient::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| PortalError::Network(e.to_string()))?;

        limiter.until_ready().await;
        let response = http
            .get(wrapper.clone())
            .header(REFERER, config.referer.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::PageLoad(status.as_u16()));
        }

        let page_url = response.url().to_string();
        let html = response.text().await?;

        let form_ref = scrape::form_ref(&html).ok_or(PortalError::MissingFormRef)?;
        let csrf_token = scrape::csrf_token(&html);
        debug!(
            "Case {}: formref={} csrf={}",
            case_id,
            form_ref,
            csrf_token.is_some()
        );

        let mut session = Self {
            http,
            limiter,
            origin,
            page_url,
            case_id,
            form_ref,
            csrf_token,
            authorization: None,
        };
        session.authorization = session.handshake().await;

        Ok(session)
    }

    /// Case identifier from the wrapper URL
    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    /// Bootstrap the citizen session.
    ///
    /// Some deployments hand back an `Authorization` header that every later
    /// call must echo; others need nothing. Any failure here leaves the
    /// session unauthorized rather than failing it.
    async fn handshake(&self) -> Option<HeaderValue> {
        let mut url = self.endpoint("api/citizen")?;
        url.query_pairs_mut()
            .append_pair("archived", "Y")
            .append_pair("preview", "false")
            .append_pair("locale", "en");

        self.limiter.until_ready().await;
        let request = self.decorate(self.http.get(url), false);
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let auth = response.headers().get(AUTHORIZATION).cloned();
                if auth.is_none() {
                    debug!("Case {}: handshake returned no Authorization", self.case_id);
                }
                auth
            }
            Ok(response) => {
                debug!(
                    "Case {}: handshake returned HTTP {}, continuing without it",
                    self.case_id,
                    response.status()
                );
                None
            }
            Err(e) => {
                debug!("Case {}: handshake failed: {}", self.case_id, e);
                None
            }
        }
    }

    /// POST a custom action carrying this case's identifiers.
    ///
    /// `extra` fields are merged into the `data` object next to `caseid` and
    /// `formref`. Returns the parsed JSON body.
    pub async fn custom_action(
        &self,
        action: &str,
        extra: &[(&str, &str)],
    ) -> PortalResult<Value> {
        let mut url = self
            .endpoint("api/custom")
            .ok_or_else(|| PortalError::InvalidUrl(self.origin.to_string()))?;
        url.query_pairs_mut()
            .append_pair("action", action)
            .append_pair("actionedby", "")
            .append_pair("loadform", "true")
            .append_pair("access", "citizen")
            .append_pair("locale", "en");

        let mut data = serde_json::Map::new();
        data.insert("caseid".to_string(), Value::from(self.case_id.as_str()));
        data.insert("formref".to_string(), Value::from(self.form_ref.as_str()));
        for (key, value) in extra {
            data.insert((*key).to_string(), Value::from(*value));
        }
        let body = serde_json::json!({
            "data": data,
            "name": ATTACHMENT_FORM_NAME,
        });

        self.limiter.until_ready().await;
        let response = self
            .decorate(self.http.post(url), true)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(PortalError::from)
    }

    /// Attach Referer, Origin, CSRF and (optionally) Authorization headers
    fn decorate(&self, request: RequestBuilder, with_auth: bool) -> RequestBuilder {
        let mut request = request
            .header(REFERER, self.page_url.as_str())
            .header(ORIGIN, self.origin_header());
        if let Some(ref token) = self.csrf_token {
            request = request.header(CSRF_HEADER, token.as_str());
        }
        if with_auth && let Some(ref auth) = self.authorization {
            request = request.header(AUTHORIZATION, auth.clone());
        }
        request
    }

    fn endpoint(&self, path: &str) -> Option<Url> {
        self.origin.join(path).ok()
    }

    fn origin_header(&self) -> String {
        self.origin.origin().ascii_serialization()
    }
}

/// `scheme://host[:port]/` of the wrapper URL
fn origin_of(wrapper: &Url) -> PortalResult<Url> {
    let origin = wrapper.origin();
    if !origin.is_tuple() {
        return Err(PortalError::InvalidUrl(wrapper.to_string()));
    }
    Url::parse(&format!("{}/", origin.ascii_serialization()))
        .map_err(|e| PortalError::InvalidUrl(e.to_string()))
}
