use std::future::Future;
use std::time::Duration;

use crate::error::Error;
use crate::prefix::{HashMode, Prefix};

/// Default range endpoint of the Pwned Passwords API.
pub const DEFAULT_BASE_URL: &str = "https://api.pwnedpasswords.com/range";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base delay for exponential backoff (doubles each retry)
pub const RETRY_BASE_DELAY_MS: u64 = 100;

/// Something that can answer a k-anonymity range query.
///
/// Implementations return the provider's raw body: one `SUFFIX:COUNT` per
/// line. Parsing is left to the caller so no intermediate map is built.
pub trait RangeSource: Send + Sync + 'static {
    fn query_prefix(&self, prefix: &Prefix) -> impl Future<Output = Result<String, Error>> + Send;
}

/// [`RangeSource`] backed by the Pwned Passwords HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRangeClient {
    http: reqwest::Client,
    base_url: String,
    mode: HashMode,
    retries: u32,
}

impl HttpRangeClient {
    pub fn builder() -> HttpRangeClientBuilder {
        HttpRangeClientBuilder::default()
    }

    /// Full request URL for a prefix, e.g. `.../range/ABCDE?mode=ntlm`.
    pub fn url_for(&self, prefix: &Prefix) -> String {
        match self.mode.query_param() {
            Some(param) => format!("{}/{}?{}", self.base_url, prefix, param),
            None => format!("{}/{}", self.base_url, prefix),
        }
    }

    async fn fetch_once(&self, url: &str, prefix: &Prefix) -> Result<String, Error> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::HttpRequest { prefix: prefix.to_string(), source: e })?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                prefix: prefix.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| Error::HttpRequest { prefix: prefix.to_string(), source: e })
    }
}

impl RangeSource for HttpRangeClient {
    async fn query_prefix(&self, prefix: &Prefix) -> Result<String, Error> {
        let url = self.url_for(prefix);

        let mut attempt = 0;
        loop {
            match self.fetch_once(&url, prefix).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    let delay = RETRY_BASE_DELAY_MS * (1 << attempt.min(10));
                    tracing::debug!(%prefix, attempt, delay_ms = delay, error = %e, "retrying range query");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Configures an [`HttpRangeClient`].
///
/// Defaults: [`DEFAULT_BASE_URL`], NTLM mode, [`DEFAULT_TIMEOUT`], a single
/// attempt per prefix.
#[derive(Debug, Clone)]
pub struct HttpRangeClientBuilder {
    base_url: String,
    mode: HashMode,
    timeout: Duration,
    retries: u32,
    pool_max_idle_per_host: Option<usize>,
}

impl Default for HttpRangeClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            mode: HashMode::default(),
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            pool_max_idle_per_host: None,
        }
    }
}

impl HttpRangeClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn mode(mut self, mode: HashMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra attempts after the first failure. 0 means failures are final.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Usually the worker count, so every worker can keep a warm connection.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    pub fn build(self) -> Result<HttpRangeClient, Error> {
        let mut http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("hibp-checker/", env!("CARGO_PKG_VERSION")));
        if let Some(max) = self.pool_max_idle_per_host {
            http = http.pool_max_idle_per_host(max);
        }

        Ok(HttpRangeClient {
            http: http.build().map_err(Error::Build)?,
            base_url: self.base_url,
            mode: self.mode,
            retries: self.retries,
        })
    }
}
