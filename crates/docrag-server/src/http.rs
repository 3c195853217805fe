//! Layers shared by both services

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, Request};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use docrag_core::{Error, Result};

use crate::config::{CorsOrigins, ServiceConfig};

/// CORS policy for the configured origins.
///
/// Credentials are not allowed; tower-http rejects them in combination with
/// wildcard headers.
pub fn cors_layer(origins: &CorsOrigins) -> Result<CorsLayer> {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => {
            let values = list
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin).map_err(|_| {
                        Error::Configuration(format!("invalid CORS origin {:?}", origin))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            AllowOrigin::list(values)
        }
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any))
}

/// Wrap a service router with the body limit, CORS and request tracing
pub fn with_layers(router: Router, config: &ServiceConfig) -> Result<Router> {
    let project = config.project.clone();
    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        tracing::info_span!(
            "request",
            project = %project,
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Ok(router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins)?)
        .layer(trace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origins_are_configuration_errors() {
        let origins = CorsOrigins::List(vec!["http://bad\norigin".to_string()]);
        assert!(matches!(cors_layer(&origins), Err(Error::Configuration(_))));
        assert!(cors_layer(&CorsOrigins::Any).is_ok());
    }
}
