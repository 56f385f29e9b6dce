// IP geolocation lookup with a fixed retry budget.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::region::Region;

const IPINFO_BASE_URL: &str = "https://ipinfo.io";
const IPAPI_BASE_URL: &str = "https://ipapi.co";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("http error from {provider}: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0} returned no country code")]
    MissingCountry(&'static str),
    #[error("no geolocation providers configured")]
    NoProviders,
    #[error("gave up after {0:?}")]
    OutOfTime(Duration),
}

/// A third-party geolocation endpoint.
#[derive(Debug, Clone)]
pub enum Provider {
    IpInfo { base_url: String },
    IpApi { base_url: String },
}

impl Provider {
    pub fn ipinfo() -> Self {
        Provider::IpInfo {
            base_url: IPINFO_BASE_URL.to_string(),
        }
    }

    pub fn ipapi() -> Self {
        Provider::IpApi {
            base_url: IPAPI_BASE_URL.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::IpInfo { .. } => "ipinfo",
            Provider::IpApi { .. } => "ipapi",
        }
    }

    fn url(&self, ip: IpAddr) -> String {
        match self {
            Provider::IpInfo { base_url } => format!("{}/{ip}/json", base_url.trim_end_matches('/')),
            Provider::IpApi { base_url } => format!("{}/{ip}/json/", base_url.trim_end_matches('/')),
        }
    }

    /// Pull the country code out of a provider response body.
    pub fn parse_country(&self, body: &Value) -> Option<String> {
        if body.get("error").and_then(Value::as_bool) == Some(true) {
            return None;
        }
        let code = match self {
            Provider::IpInfo { .. } => body.get("country"),
            Provider::IpApi { .. } => body.get("country_code").or_else(|| body.get("country")),
        };
        code.and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| c.len() == 2)
            .map(str::to_ascii_uppercase)
    }
}

/// How a region was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Caller asked for a region explicitly.
    Override,
    /// No routable client address; no lookup attempted.
    Local,
    /// Served from the per-IP cache.
    Cache,
    /// Looked up through a provider.
    Lookup,
    /// Every attempt failed.
    Fallback,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Override => "override",
            Source::Local => "local",
            Source::Cache => "cache",
            Source::Lookup => "lookup",
            Source::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub region: Region,
    pub country_code: Option<String>,
    pub source: Source,
}

impl Resolution {
    pub fn overridden(region: Region) -> Self {
        Self {
            region,
            country_code: None,
            source: Source::Override,
        }
    }

    fn local() -> Self {
        Self {
            region: Region::International,
            country_code: None,
            source: Source::Local,
        }
    }

    fn fallback() -> Self {
        Self {
            region: Region::International,
            country_code: None,
            source: Source::Fallback,
        }
    }
}

/// Resolver settings.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub providers: Vec<Provider>,
    pub attempts: u32,
    pub backoff_base: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Cap on a whole resolution, all attempts and backoff included.
    pub budget: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            providers: vec![Provider::ipinfo(), Provider::ipapi()],
            attempts: 3,
            backoff_base: Duration::from_millis(1000),
            timeout: Duration::from_millis(3000),
            budget: Duration::from_millis(4000),
        }
    }
}

/// Maps a client IP to a [`Region`] through the configured providers.
#[derive(Debug, Clone)]
pub struct GeoResolver {
    client: reqwest::Client,
    config: ResolverConfig,
}

impl GeoResolver {
    pub fn new(config: ResolverConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Resolve the region for `ip`. Never fails: lookup errors resolve to
    /// [`Region::International`].
    pub async fn resolve(&self, ip: Option<IpAddr>) -> Resolution {
        let ip = match ip {
            Some(ip) if is_public(ip) => ip,
            _ => return Resolution::local(),
        };

        let attempts = self.config.attempts.max(1);
        let lookup = retry_with_linear_backoff(attempts, self.config.backoff_base, |attempt| {
            tracing::debug!(%ip, attempt, "geolocation lookup");
            self.lookup_once(ip)
        });
        let result = tokio::time::timeout(self.config.budget, lookup)
            .await
            .unwrap_or(Err(ResolveError::OutOfTime(self.config.budget)));

        match result {
            Ok(code) => Resolution {
                region: Region::from_country_code(&code),
                country_code: Some(code),
                source: Source::Lookup,
            },
            Err(err) => {
                tracing::warn!(%ip, error = %err, "geolocation failed, defaulting to international");
                Resolution::fallback()
            }
        }
    }

    /// One pass over every provider; the first country code wins.
    async fn lookup_once(&self, ip: IpAddr) -> Result<String, ResolveError> {
        let mut last_err = ResolveError::NoProviders;
        for provider in &self.config.providers {
            match self.query(provider, ip).await {
                Ok(code) => return Ok(code),
                Err(err) => {
                    tracing::debug!(provider = provider.name(), error = %err, "provider failed");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    async fn query(&self, provider: &Provider, ip: IpAddr) -> Result<String, ResolveError> {
        let http = |source| ResolveError::Http {
            provider: provider.name(),
            source,
        };
        let body: Value = self
            .client
            .get(provider.url(ip))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http)?
            .json()
            .await
            .map_err(http)?;

        provider
            .parse_country(&body)
            .ok_or(ResolveError::MissingCountry(provider.name()))
    }
}

/// Run `op` up to `attempts` times, sleeping `base * attempt` after each failure.
pub async fn retry_with_linear_backoff<T, E, F, Fut>(
    attempts: u32,
    base: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => {
                tokio::time::sleep(base * attempt).await;
                attempt += 1;
            }
        }
    }
}

/// Whether `ip` is worth sending to a geolocation provider.
pub fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}
