//! Cross-origin resource sharing policy.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::{CorsConfig, Environment};
use crate::error::StartupError;

/// Build the CORS layer for `environment`. Origins, methods and headers are
/// validated here so a bad entry stops startup.
pub fn cors_layer(config: &CorsConfig, environment: Environment) -> Result<CorsLayer, StartupError> {
    let origins = config
        .origins_for(environment)
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| StartupError::Header(format!("invalid CORS origin '{}'", o)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let methods = config
        .allowed_methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.as_bytes())
                .map_err(|_| StartupError::Header(format!("invalid CORS method '{}'", m)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let headers = config
        .allowed_headers
        .iter()
        .map(|h| {
            HeaderName::from_bytes(h.as_bytes())
                .map_err(|_| StartupError::Header(format!("invalid CORS header '{}'", h)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.allow_credentials))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_for_each_environment() {
        let config = CorsConfig::default();
        assert!(cors_layer(&config, Environment::Development).is_ok());
        assert!(cors_layer(&config, Environment::Production).is_ok());
    }

    #[test]
    fn test_rejects_bad_method() {
        let config = CorsConfig {
            allowed_methods: vec!["GET POST".to_string()],
            ..Default::default()
        };
        assert!(cors_layer(&config, Environment::Test).is_err());
    }
}
