//!
//! Where field options come from.
//!
use async_trait::async_trait;

use crate::choice::Choice;
use crate::{Error, Result};

pub mod http;

/// Request for the options of one field, filtered by its parent's id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionsRequest {
    /// Endpoint configured for the field, may already carry a query string
    pub url: String,
    /// Name of the filter parameter, `site` or `area`
    pub param: &'static str,
    /// Parent id
    pub value: String,
}

impl OptionsRequest {
    /// Endpoint with the filter appended, using `&` if the endpoint already has
    /// a query string.
    #[must_use]
    pub fn target(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            self.url,
            separator,
            self.param,
            urlencoding::encode(&self.value)
        )
    }
}

/// Fetches the options of a field
#[async_trait]
pub trait OptionSource: Send + Sync {
    /// Fetch the choices matching `request`. An empty list is a valid answer,
    /// failures are reported as errors.
    async fn fetch(&self, request: &OptionsRequest) -> Result<Vec<Choice>>;
}

#[async_trait]
impl<T: OptionSource + ?Sized> OptionSource for std::sync::Arc<T> {
    async fn fetch(&self, request: &OptionsRequest) -> Result<Vec<Choice>> {
        (**self).fetch(request).await
    }
}

/// Why a fetch produced no options
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with a non-success status
    Status(u16),
    /// Connection, TLS or timeout problem
    Transport(String),
    /// The body was not a result list
    Decode(String),
    /// Anything else, e.g. a malformed endpoint URL
    Other(String),
}

impl From<&Error> for FailureKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::WebServer(status, _) => Self::Status(*status),
            Error::HTTPClient(e) if e.is_decode() => Self::Decode(e.to_string()),
            Error::HTTPClient(e) => match e.status() {
                Some(status) if !status.is_success() => Self::Status(status.as_u16()),
                _ => Self::Transport(e.to_string()),
            },
            Error::Serde(e) => Self::Decode(e.to_string()),
            e => Self::Other(e.to_string()),
        }
    }
}
