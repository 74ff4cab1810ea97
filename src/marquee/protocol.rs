use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::MarqueeError;
use crate::marquee::messages::{Decision, PreviewImage};
use crate::marquee::session::{ImageRef, Session};

const SUBMIT_PATH: &str = "flow_assistor/submit_crop";
const API_PREFIX: &str = "api/";
const VIEW_PATH: &str = "api/view";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal HTTP surface the client needs. `Err` means no response arrived.
pub trait HttpTransport: Send + Sync {
    fn post_json(&self, url: &Url, body: &str) -> Result<HttpResponse>;
    fn get(&self, url: &Url) -> Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("flow-marquee overlay")
            .build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json(&self, url: &Url, body: &str) -> Result<HttpResponse> {
        let resp = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()?;
        let status = resp.status().as_u16();
        let body = resp.bytes().context("read response body")?.to_vec();
        Ok(HttpResponse { status, body })
    }

    fn get(&self, url: &Url) -> Result<HttpResponse> {
        let resp = self.client.get(url.clone()).send()?;
        let status = resp.status().as_u16();
        let body = resp.bytes().context("read response body")?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Server routes relative to a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: &str) -> Result<Self, MarqueeError> {
        let mut base = Url::parse(base.trim())
            .map_err(|e| MarqueeError::Config(format!("server_url '{base}': {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(MarqueeError::Config(format!(
                "server_url must be http or https, got '{}'",
                base.scheme()
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        Ok(Self { base })
    }

    fn join(&self, path: &str) -> Result<Url, MarqueeError> {
        self.base
            .join(path)
            .map_err(|e| MarqueeError::Config(format!("cannot build url for '{path}': {e}")))
    }

    /// Resume route behind the host's api prefix.
    pub fn submit_primary(&self) -> Result<Url, MarqueeError> {
        self.join(&format!("{API_PREFIX}{SUBMIT_PATH}"))
    }

    /// The same route mounted without the prefix.
    pub fn submit_fallback(&self) -> Result<Url, MarqueeError> {
        self.join(SUBMIT_PATH)
    }

    pub fn view(&self, image: &ImageRef, cache_bust: i64) -> Result<Url, MarqueeError> {
        let mut url = self.join(VIEW_PATH)?;
        url.query_pairs_mut()
            .append_pair("filename", &image.filename)
            .append_pair("type", &image.kind)
            .append_pair("subfolder", &image.subfolder)
            .append_pair("t", &cache_bust.to_string());
        Ok(url)
    }
}

/// Sends decisions and fetches previews for marquee sessions.
#[derive(Clone)]
pub struct ResumeClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
}

impl ResumeClient {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Post `decision` for `session` and wait for the acknowledgement.
    ///
    /// The primary route is tried first. The fallback route is only used
    /// when the primary produced no response or answered 404/405; any other
    /// status is final for this attempt.
    pub fn submit_decision(&self, session: &Session, decision: &Decision) -> Result<(), MarqueeError> {
        let payload = decision.payload(session);
        let body =
            serde_json::to_string(&payload).map_err(|e| MarqueeError::Encode(e.to_string()))?;
        let primary = self.endpoints.submit_primary()?;

        match self.transport.post_json(&primary, &body) {
            Ok(resp) if resp.is_success() => Ok(()),
            Ok(resp) if matches!(resp.status, 404 | 405) => {
                tracing::debug!(status = resp.status, url = %primary, "primary resume route missing, using fallback");
                self.post_fallback(&body)
            }
            Ok(resp) => Err(MarqueeError::from_status(resp.status, &resp.text())),
            Err(err) => {
                tracing::warn!(url = %primary, error = %err, "primary resume request failed, using fallback");
                self.post_fallback(&body)
            }
        }
    }

    fn post_fallback(&self, body: &str) -> Result<(), MarqueeError> {
        let fallback = self.endpoints.submit_fallback()?;
        match self.transport.post_json(&fallback, body) {
            Ok(resp) if resp.is_success() => Ok(()),
            Ok(resp) => Err(MarqueeError::from_status(resp.status, &resp.text())),
            Err(err) => Err(MarqueeError::transport(format!("{err:#}"))),
        }
    }

    /// Download and decode the preview image.
    pub fn fetch_image(&self, image: &ImageRef) -> Result<PreviewImage, MarqueeError> {
        let url = self.endpoints.view(image, chrono::Utc::now().timestamp_millis())?;
        let resp = self
            .transport
            .get(&url)
            .map_err(|e| MarqueeError::transport(format!("{e:#}")))?;
        if !resp.is_success() {
            return Err(MarqueeError::transport(format!(
                "http status {} fetching {}",
                resp.status, image.filename
            )));
        }
        decode_preview(&resp.body)
    }
}

pub fn decode_preview(bytes: &[u8]) -> Result<PreviewImage, MarqueeError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| MarqueeError::InvalidImage(e.to_string()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(MarqueeError::InvalidImage(format!(
            "image has no pixels ({width}x{height})"
        )));
    }
    Ok(PreviewImage {
        width,
        height,
        rgba: img.into_raw(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport answering from a script and recording every request.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<HttpResponse, String>>>,
        pub requests: Mutex<Vec<(String, Url, String)>>,
    }

    impl ScriptedTransport {
        pub fn with_replies(replies: Vec<Result<HttpResponse, String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn next(&self, method: &str, url: &Url, body: &str) -> Result<HttpResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((method.into(), url.clone(), body.into()));
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
                None => Err(anyhow::anyhow!("no scripted reply")),
            }
        }

        pub fn paths(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(_, url, _)| url.path().to_string())
                .collect()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn post_json(&self, url: &Url, body: &str) -> Result<HttpResponse> {
            self.next("POST", url, body)
        }

        fn get(&self, url: &Url) -> Result<HttpResponse> {
            self.next("GET", url, "")
        }
    }

    pub fn status(status: u16, body: &str) -> Result<HttpResponse, String> {
        Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        })
    }
}
