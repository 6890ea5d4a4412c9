//!
//! Option source backed by the DCIM HTTP endpoints.
//!
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::{OptionSource, OptionsRequest};
use crate::choice::{Choice, ChoiceList};
use crate::{Error, Result};

/// Builder for an [`HttpSource`]
#[derive(Clone, Default)]
pub struct Builder {
    root_ca: Vec<reqwest::Certificate>,
    disable_cert_verification: bool,
    timeout: Option<std::time::Duration>,
    session_cookie: Option<String>,
    headers: Vec<(String, String)>,
}

impl Builder {
    /// Create a new builder instance
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root certificate for server certificate verification
    pub fn add_root_certificate(mut self, cert: &[u8]) -> Result<Self> {
        self.root_ca.push(reqwest::Certificate::from_pem(cert)?);
        Ok(self)
    }

    /// Disable certificate verification
    #[must_use]
    pub fn danger_accept_invalid_certs(self) -> Self {
        Self {
            disable_cert_verification: true,
            ..self
        }
    }

    /// Give up on a request after `timeout`. No timeout is applied by default.
    #[must_use]
    pub fn timeout(self, timeout: std::time::Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    /// Send this `Cookie` header with every request, e.g. `sessionid=...`
    #[must_use]
    pub fn session_cookie(self, cookie: &str) -> Self {
        Self {
            session_cookie: Some(cookie.to_string()),
            ..self
        }
    }

    /// Send an extra header with every request
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Build a source resolving relative endpoints against `base_url`
    pub fn build(&self, base_url: &str) -> Result<HttpSource> {
        let base_url = url::Url::parse(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        if let Some(cookie) = &self.session_cookie {
            headers.insert(
                reqwest::header::COOKIE,
                HeaderValue::from_str(cookie)
                    .map_err(|_e| Error::general("Failed to set Cookie header"))?,
            );
        }
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_e| Error::General(format!("Invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_e| Error::General(format!("Invalid value for header '{}'", name)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true);

        let client = self
            .root_ca
            .iter()
            .fold(client, |client, ca| client.add_root_certificate(ca.clone()));

        let client = client.danger_accept_invalid_certs(self.disable_cert_verification);

        let client = match self.timeout {
            Some(timeout) => client.timeout(timeout),
            None => client,
        };

        Ok(HttpSource {
            base_url,
            client: client.build()?,
        })
    }
}

/// Fetches options with `GET <url>?<param>=<value>` and reads the `results` list
#[derive(Clone, Debug)]
pub struct HttpSource {
    base_url: url::Url,
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a builder
    #[must_use]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Base URL relative endpoints are resolved against
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }
}

#[async_trait]
impl OptionSource for HttpSource {
    async fn fetch(&self, request: &OptionsRequest) -> Result<Vec<Choice>> {
        let url = self.base_url.join(&request.target())?;

        tracing::debug!("GET {}", url);

        let result = self.client.get(url).send().await?;

        if result.status().is_success() {
            let list: ChoiceList = result.json().await?;
            tracing::debug!("{} {} choices", request.param, list.results.len());
            Ok(list.results)
        } else {
            Err(Error::WebServer(
                result.status().as_u16(),
                result.status().to_string(),
            ))
        }
    }
}
