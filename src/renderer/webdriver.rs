use crate::config::ServiceConfig;
use crate::error::RenderError;
use crate::renderer::{BrowsingContext, Renderer};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fantoccini::wd::{Capabilities, WebDriverCompatibleCommand};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Interval between readiness polls while waiting for the network to go idle
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Reports the load state and how many resources the page has requested so far
const LOAD_STATE_SCRIPT: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

/// Renderer backed by a WebDriver server (e.g. ChromeDriver).
///
/// Each [`BrowsingContext`] is its own WebDriver session, so cookies, storage
/// and history never leak between fetches.
#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    webdriver_url: String,
    capabilities: Capabilities,
}

impl WebDriverRenderer {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            capabilities: build_capabilities(config),
        }
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }
}

/// Browser options announced to the WebDriver server on session creation
fn build_capabilities(config: &ServiceConfig) -> Capabilities {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--window-size=1920,1080".to_string(),
        format!("--user-agent={}", config.user_agent),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }

    let mut capabilities = Capabilities::new();
    // "eager" returns from navigation at DOMContentLoaded
    capabilities.insert("pageLoadStrategy".to_string(), json!("eager"));
    capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    capabilities
}

#[async_trait]
impl Renderer for WebDriverRenderer {
    async fn open(&self) -> Result<Box<dyn BrowsingContext>, RenderError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities.clone());

        match builder.connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Opened WebDriver session at {}", self.webdriver_url);
                Ok(Box::new(WebDriverContext { client }))
            }
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
                Err(RenderError::Connect {
                    endpoint: self.webdriver_url.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// A single WebDriver session
struct WebDriverContext {
    client: Client,
}

#[async_trait]
impl BrowsingContext for WebDriverContext {
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError> {
        self.client
            .goto(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn wait_until_idle(&mut self) -> Result<(), RenderError> {
        let mut last_resource_count: Option<u64> = None;

        loop {
            let state = self.client.execute(LOAD_STATE_SCRIPT, vec![]).await?;
            let ready = state.get(0).and_then(|v| v.as_str()) == Some("complete");
            let resources = state.get(1).and_then(|v| v.as_u64());

            if ready && resources.is_some() && resources == last_resource_count {
                return Ok(());
            }
            last_resource_count = resources;

            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), RenderError> {
        self.client
            .wait()
            .forever()
            .for_element(Locator::Css(selector))
            .await?;
        Ok(())
    }

    async fn title(&mut self) -> Result<String, RenderError> {
        Ok(self.client.title().await?)
    }

    async fn document_html(&mut self) -> Result<String, RenderError> {
        Ok(self.client.source().await?)
    }

    async fn element_html(&mut self, selector: &str) -> Result<Option<String>, RenderError> {
        match self.client.find(Locator::Css(selector)).await {
            Ok(element) => Ok(Some(element.html(true).await?)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, RenderError> {
        Ok(self.client.screenshot().await?)
    }

    async fn pdf(&mut self) -> Result<Vec<u8>, RenderError> {
        let value = self.client.issue_cmd(PrintPage).await?;
        decode_pdf(&value)
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        Ok(self.client.close().await?)
    }
}

/// WebDriver "Print Page" command, answered with the PDF as base64
#[derive(Debug)]
struct PrintPage;

impl WebDriverCompatibleCommand for PrintPage {
    fn endpoint(&self, base_url: &Url, session_id: Option<&str>) -> Result<Url, url::ParseError> {
        let session_id = session_id.ok_or(url::ParseError::EmptyHost)?;
        base_url.join(&format!("session/{}/print", session_id))
    }

    fn method_and_body(&self, _request_url: &Url) -> (http::Method, Option<String>) {
        let body = json!({ "background": true });
        (http::Method::POST, Some(body.to_string()))
    }
}

fn decode_pdf(value: &serde_json::Value) -> Result<Vec<u8>, RenderError> {
    let encoded = value
        .as_str()
        .ok_or_else(|| RenderError::Command("print returned no document".to_string()))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| RenderError::Command(format!("print returned invalid base64: {}", e)))
}
