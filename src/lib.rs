//!
//! Cascading Site, Area and Rack selection for DCIM admin forms.
//!
//! Selecting a site fetches the areas of that site, selecting an area fetches
//! its racks, and clearing a parent resets and disables everything below it.
//! When an existing record is edited, [`CascadeController::initialize`] restores
//! the stored hierarchy.
//!
//! ## Binding a form
//! ```no_run
//! #[tokio::main]
//! async fn main() -> Result<(), location_cascade::Error> {
//!     use location_cascade::{Document, HttpSource, Select};
//!
//!     let source = HttpSource::builder()
//!         .session_cookie("sessionid=abc123")
//!         .build("https://dcim.example.net")?;
//!
//!     let document = Document::new()
//!         .with(Select::new("id_site").with_value("5").with_data("areasUrl", "/dcim/areas/"))
//!         .with(Select::new("id_area").with_data("racksUrl", "/dcim/racks/").with_data("currentValue", "12"))
//!         .with(Select::new("id_rack"));
//!
//!     // Missing elements leave the form untouched
//!     let Some(controller) = document.attach(source) else {
//!         return Ok(());
//!     };
//!
//!     controller.initialize().await;
//!     controller.on_area_changed("13").await;
//!
//!     let racks = controller.select(location_cascade::FieldKind::Rack).await;
//!     for entry in racks.entries() {
//!         println!("{} {}", entry.value, entry.label);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::missing_errors_doc)]

pub mod choice;
pub mod controller;
pub mod document;
pub mod field;
pub mod select;
pub mod source;

#[cfg(feature = "env-helper")]
pub mod env_helper;

pub use choice::{Choice, ChoiceId, Entry};
pub use controller::{CascadeController, Endpoints, LoadOutcome};
pub use document::Document;
pub use field::{FieldKind, FieldState};
pub use select::Select;
pub use source::{http::HttpSource, FailureKind, OptionSource, OptionsRequest};

/// Error returned by option sources
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Non-success status returned by the HTTP server
    #[error("HTTP failed {0}, {1}")]
    WebServer(u16, String),

    /// JSON serialization/deserialization error
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL: {0}")]
    URL(#[from] url::ParseError),

    /// HTTP client error
    #[error("Reqwest: {0}")]
    HTTPClient(#[from] reqwest::Error),

    /// A required environment variable is not set
    #[error("Missing environment variable '{0}'")]
    MissingEnv(String),

    /// General Error
    #[error("Error {0}")]
    General(String),
}

impl Error {
    /// Create a general error
    #[must_use]
    pub fn general(err: &str) -> Self {
        Self::General(err.to_string())
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
