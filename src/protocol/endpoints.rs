//! Incarnation API paths.

use crate::error::ConfigError;
use url::Url;

/// Collection path, relative to the API base URL.
pub const INCARNATIONS_PATH: &str = "api/incarnations";

/// URL builder for the incarnation endpoints.
///
/// The base URL always ends with `/`, so relative paths join under any prefix
/// the instance is served from.
///
/// ```
/// use foxops_client::protocol::Endpoints;
///
/// let endpoints = Endpoints::new("https://example.com/foxops").unwrap();
/// assert_eq!(
///     endpoints.incarnation(42).as_str(),
///     "https://example.com/foxops/api/incarnations/42"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Parse the base URL.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let mut base = Url::parse(endpoint).map_err(|err| invalid(err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Endpoints { base })
    }

    /// Base URL, with trailing slash.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST` target: `/api/incarnations`.
    pub fn incarnations(&self) -> Url {
        self.join(INCARNATIONS_PATH)
    }

    /// `GET`/`PUT`/`DELETE` target: `/api/incarnations/{id}`.
    pub fn incarnation(&self, id: i64) -> Url {
        self.join(&format!("{INCARNATIONS_PATH}/{id}"))
    }

    fn join(&self, path: &str) -> Url {
        // Only ever joins the fixed relative paths above onto a base URL.
        let mut url = self.base.clone();
        url.set_path(&format!("{}{}", self.base.path(), path));
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_endpoint() {
        let endpoints = Endpoints::new("http://localhost").unwrap();
        assert_eq!(endpoints.incarnations().as_str(), "http://localhost/api/incarnations");
        assert_eq!(
            endpoints.incarnation(1234).path(),
            "/api/incarnations/1234"
        );
    }

    #[test]
    fn test_prefix_with_trailing_slash() {
        let endpoints = Endpoints::new("http://localhost:8080/foxops/").unwrap();
        assert_eq!(
            endpoints.incarnation(7).as_str(),
            "http://localhost:8080/foxops/api/incarnations/7"
        );
    }

    #[test]
    fn test_rejects_relative_url() {
        let err = Endpoints::new("foxops.local").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
        assert!(Endpoints::new("mailto:ops@example.com").is_err());
    }
}
