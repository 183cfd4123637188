//! Layer and router tests — driven in-process through `tower::ServiceExt`.

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode};
    use reqctx_core::{ContextStorage, Store};
    use reqctx_http::*;
    use reqctx_middleware::{MiddlewareConfig, async_local_storage_middleware};
    use serde_json::{Value, json};
    use tower::{Layer, ServiceExt, service_fn};

    fn layer(storage: &ContextStorage, config: MiddlewareConfig) -> ContextLayer {
        ContextLayer::new(async_local_storage_middleware(storage.clone()).configure(config))
    }

    async fn get_json(app: axum::Router, request: Request<Body>) -> Value {
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────
    // ContextLayer
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn inner_service_sees_header_store() {
        let storage = ContextStorage::create();
        let reader = storage.clone();
        let service = layer(&storage, MiddlewareConfig::default().with_headers(true)).layer(
            service_fn(move |_request: Request<()>| {
                let reader = reader.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    Ok::<_, Infallible>(reader.get_store())
                }
            }),
        );

        let request = Request::builder()
            .header("X-Request-Id", "abc-123")
            .header("X-Session-Id", "sess-9")
            .body(())
            .unwrap();
        let store = service.oneshot(request).await.unwrap().unwrap();

        assert_eq!(store.request_id(), Some("abc-123"));
        assert_eq!(store.session_id(), Some("sess-9"));
        assert_eq!(storage.get_store(), None);
    }

    #[tokio::test]
    async fn inner_call_runs_inside_the_binding() {
        let storage = ContextStorage::create();
        let reader = storage.clone();
        let service = layer(&storage, MiddlewareConfig::default().with_headers(true)).layer(
            service_fn(move |_request: Request<()>| {
                // Read before any future is created
                let seen = reader.get_store();
                async move { Ok::<_, Infallible>(seen) }
            }),
        );

        let request = Request::builder().header("x-request-id", "sync-1").body(()).unwrap();
        let store = service.oneshot(request).await.unwrap().unwrap();
        assert_eq!(store.request_id(), Some("sync-1"));
    }

    #[tokio::test]
    async fn without_headers_inner_service_sees_empty_store() {
        let storage = ContextStorage::create();
        let reader = storage.clone();
        let service = layer(&storage, MiddlewareConfig::default()).layer(service_fn(
            move |_request: Request<()>| {
                let reader = reader.clone();
                async move { Ok::<_, Infallible>(reader.get_store()) }
            },
        ));

        let request = Request::builder().header("x-request-id", "ignored").body(()).unwrap();
        assert_eq!(service.oneshot(request).await.unwrap(), Some(Store::new()));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Router
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn context_route_reports_store_and_spawned_store() {
        let config = ServerConfig {
            middleware: MiddlewareConfig::default()
                .with_headers(true)
                .with_header_names([("requestId", "X-Request-Id")]),
            ..ServerConfig::default()
        };
        let app = ContextServer::router(&config, ContextStorage::create());

        let request = Request::builder()
            .uri("/context")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let body = get_json(app, request).await;

        assert_eq!(body["store"], json!({"requestId": "abc-123"}));
        assert_eq!(body["spawned"], body["store"]);
    }

    #[tokio::test]
    async fn health_route() {
        let app = ContextServer::router(&ServerConfig::default(), ContextStorage::create());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(get_json(app, request).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn invalid_hostname_is_rejected() {
        let config = ServerConfig {
            hostname: "not an address".into(),
            port: 0,
            ..ServerConfig::default()
        };
        let err = ContextServer::start(config, ContextStorage::create())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }
}
