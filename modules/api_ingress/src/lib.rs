//! HTTP ingress: owns the axum router's cross-cutting middleware stack and the
//! listening socket. Feature crates hand their routes to [`ApiIngress::build_router`]
//! and the binary drives [`ApiIngress::serve`] until the cancellation token fires.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware::from_fn, routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

pub struct ApiIngress {
    config: ApiIngressConfig,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Wrap feature routes with `/healthz`, a JSON fallback and the middleware stack.
    ///
    /// Middleware order, outermost first:
    /// SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions -> Timeout -> BodyLimit
    /// with CORS outside everything when enabled.
    pub fn build_router(&self, routes: Router) -> Router {
        let x_request_id = request_id::header();

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                request_id::MakeReqId,
            ))
            .layer(PropagateRequestIdLayer::new(x_request_id))
            .layer(request_id::create_trace_layer())
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_sec,
            )))
            .map_response(axum::response::IntoResponse::into_response)
            .layer(RequestBodyLimitLayer::new(self.config.body_limit_bytes));

        let mut router = Router::new()
            .route("/healthz", get(web::health_check))
            .merge(routes)
            .fallback(web::route_not_found)
            .layer(middleware);

        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router
    }

    /// Bind the configured address and serve until `cancel` fires.
    pub async fn serve(&self, router: Router, cancel: CancellationToken) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.config.bind_addr))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        serve_on(listener, router, cancel).await
    }
}

/// Serve on an already-bound listener with graceful shutdown on cancellation.
pub async fn serve_on(listener: TcpListener, router: Router, cancel: CancellationToken) -> Result<()> {
    tracing::info!("HTTP server bound on {}", listener.local_addr()?);

    let shutdown = async move {
        cancel.cancelled().await;
        tracing::info!("HTTP server shutting down gracefully (cancellation)");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server terminated with error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn ingress() -> ApiIngress {
        ApiIngress::new(ApiIngressConfig::default())
    }

    #[tokio::test]
    async fn health_endpoint_is_always_mounted() {
        let app = ingress().build_router(Router::new());
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn unknown_path_gets_json_404() {
        let app = ingress().build_router(Router::new());
        let response = app
            .oneshot(Request::builder().uri("/a/b/c").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Route not found");
    }

    #[tokio::test]
    async fn serve_rejects_invalid_bind_addr() {
        let ingress = ApiIngress::new(ApiIngressConfig {
            bind_addr: "not-an-address".into(),
            ..Default::default()
        });
        let err = ingress
            .serve(Router::new(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid bind address"));
    }
}
