//! User-Agent stamping.
//!
//! Platform names use the Go spellings (`darwin`, `amd64`, `arm64`, ...) so
//! the header reads the same as the one sent by the Go provider, which
//! servers may already parse.

use super::{Transport, TransportError};
use async_trait::async_trait;
use http::header::{HeaderValue, USER_AGENT};
use reqwest::{Request, Response};

/// Format the User-Agent value: `<product>/<version> (<os>; <arch>)`.
///
/// ```
/// let ua = foxops_client::transport::user_agent("Foxops Terraform Provider", "1.2.0");
/// assert!(ua.starts_with("Foxops Terraform Provider/1.2.0 ("));
/// assert!(ua.ends_with(')'));
/// ```
pub fn user_agent(product: &str, version: &str) -> String {
    format!(
        "{product}/{version} ({}; {})",
        platform_os(std::env::consts::OS),
        platform_arch(std::env::consts::ARCH)
    )
}

fn platform_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn platform_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

/// Adds a `User-Agent` header to every request before delegating.
///
/// Method, URL and body are passed through untouched, and so is whatever the
/// inner transport returns.
#[derive(Debug, Clone)]
pub struct UserAgentTransport<T> {
    value: HeaderValue,
    inner: T,
}

impl<T> UserAgentTransport<T> {
    /// Wrap `inner`, identifying as `product` at `version`.
    ///
    /// Characters that cannot appear in a header are dropped from the value.
    pub fn new(product: &str, version: &str, inner: T) -> Self {
        let formatted = user_agent(product, version);
        let value = HeaderValue::from_str(&formatted).unwrap_or_else(|_| {
            let visible: String = formatted
                .chars()
                .filter(|c| c.is_ascii() && !c.is_ascii_control())
                .collect();
            HeaderValue::from_str(&visible).unwrap_or_else(|_| HeaderValue::from_static("foxops-client"))
        });
        UserAgentTransport { value, inner }
    }

    /// The header value stamped on requests.
    pub fn header_value(&self) -> &HeaderValue {
        &self.value
    }
}

#[async_trait]
impl<T: Transport> Transport for UserAgentTransport<T> {
    async fn execute(&self, mut request: Request) -> Result<Response, TransportError> {
        request.headers_mut().append(USER_AGENT, self.value.clone());
        self.inner.execute(request).await
    }
}
