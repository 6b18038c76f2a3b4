use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

use crate::auth::{require_session, AuthConfig, AuthState};

pub mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::{auth, health, users};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router.
///
/// `/api/v1/users*` and `/api/v1/me` sit behind the session gate. Everything
/// else is public. `allowed_origin` of `None` allows any origin.
pub fn router(state: AuthState, allowed_origin: Option<HeaderValue>) -> Router {
    let protected = Router::new()
        .route("/api/v1/users", get(users::list_users))
        .route("/api/v1/users/:id", get(users::get_user))
        .route("/api/v1/me", get(users::me))
        .route_layer(middleware::from_fn_with_state(
            state.authority.clone(),
            require_session,
        ));

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(allowed_origin.map_or_else(AllowOrigin::any, AllowOrigin::exact));

    Router::new()
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi_json))
        .route("/openapi", get(openapi_page))
        .route("/api/v1/auth/request-otp", post(auth::request_otp))
        .route("/api/v1/auth/verify", post(auth::verify))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if the origin is invalid or the listener fails
pub async fn new(port: u16, config: AuthConfig, allowed_origin: Option<String>) -> Result<()> {
    let allowed_origin = allowed_origin
        .map(|origin| {
            HeaderValue::from_str(origin.trim())
                .with_context(|| format!("Invalid allowed origin: {origin}"))
        })
        .transpose()?;

    let state = AuthState::new(&config);
    let app = router(state, allowed_origin);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

async fn openapi_json() -> impl IntoResponse {
    Json(openapi())
}

async fn openapi_page() -> Html<&'static str> {
    Html(concat!(
        "<!doctype html><html><head><title>",
        env!("CARGO_PKG_NAME"),
        " API</title></head><body><h1>",
        env!("CARGO_PKG_NAME"),
        " ",
        env!("CARGO_PKG_VERSION"),
        "</h1><p><a href=\"/openapi.json\">OpenAPI document</a></p></body></html>"
    ))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = AuthConfig::new(SecretString::from("router-test-secret".to_string()));
        router(AuthState::new(&config), None)
    }

    #[tokio::test]
    async fn request_id_is_generated_and_propagated() -> anyhow::Result<()> {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(Ulid::from_string(request_id).is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn request_id_is_kept_when_present() -> anyhow::Result<()> {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, "caller-id")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER),
            Some(&HeaderValue::from_static("caller-id"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn protected_routes_require_token() -> anyhow::Result<()> {
        for uri in ["/api/v1/users", "/api/v1/me", "/api/v1/users/abc"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty())?)
                .await?;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() -> anyhow::Result<()> {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/auth/request-otp")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"phone\":"))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(body["error"], "invalid request body");
        Ok(())
    }

    #[tokio::test]
    async fn openapi_document_is_served() -> anyhow::Result<()> {
        let response = app()
            .oneshot(Request::builder().uri("/openapi.json").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&body)?;
        assert!(body["paths"]["/api/v1/auth/verify"].is_object());

        let response = app()
            .oneshot(Request::builder().uri("/openapi").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() -> anyhow::Result<()> {
        let config = AuthConfig::new(SecretString::from("router-test-secret".to_string()));
        let app = router(
            AuthState::new(&config),
            Some(HeaderValue::from_static("https://app.example.com")),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/v1/auth/request-otp")
                    .header("origin", "https://app.example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(
            response.headers().get("access-control-allow-origin"),
            Some(&HeaderValue::from_static("https://app.example.com"))
        );
        Ok(())
    }
}
