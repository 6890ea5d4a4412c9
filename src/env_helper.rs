//!
//! Optional module for configuring the HTTP source from the environment

use crate::source::http::HttpSource;

/// Build an [`HttpSource`] from environment variables
/// * `DCIM_BASE_URL` - address of the admin site, e.g. `https://dcim.example.net`
/// * `DCIM_SESSION_COOKIE` - optional `Cookie` header value, e.g. `sessionid=...`
/// * `DCIM_CA` - optional PEM encoded root certificate
/// * `DCIM_TIMEOUT_SECS` - optional request timeout in seconds
pub fn source_from_env() -> crate::Result<HttpSource> {
    let base_url = std::env::var("DCIM_BASE_URL")
        .map_err(|_| crate::Error::MissingEnv("DCIM_BASE_URL".into()))?;
    tracing::info!("Fetching locations from {}", base_url);

    let builder = HttpSource::builder();

    let builder = match std::env::var("DCIM_CA") {
        Ok(ca) => builder.add_root_certificate(ca.as_bytes())?,
        Err(_) => builder,
    };

    let builder = match std::env::var("DCIM_SESSION_COOKIE") {
        Ok(cookie) => builder.session_cookie(&cookie),
        Err(_) => builder,
    };

    let builder = match std::env::var("DCIM_TIMEOUT_SECS") {
        Ok(secs) => {
            let secs = secs.parse::<u64>().map_err(|_e| {
                crate::Error::General(format!("DCIM_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            builder.timeout(std::time::Duration::from_secs(secs))
        }
        Err(_) => builder,
    };

    builder.build(&base_url)
}
