use axum::{
    routing::{get, MethodRouter},
    Router,
    Json,
    extract::{rejection::JsonRejection, Path, State},
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::storage::{Database, SqliteStore};
use crate::Entity;

pub mod routes;

/// Server state
pub struct AppState {
    pub database: Database,
}

impl AppState {
    pub fn new(database: Database) -> Arc<Self> {
        Arc::new(Self { database })
    }

    /// Run `op` on a connection of its own, off the async runtime.
    ///
    /// The connection is dropped before the result is returned.
    pub async fn with_store<T, F>(&self, op: F) -> crate::Result<T>
    where
        F: FnOnce(&mut SqliteStore) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let database = self.database.clone();
        tokio::task::spawn_blocking(move || {
            let mut store = database.connect()?;
            op(&mut store)
        })
        .await
        .map_err(|e| crate::Error::Io(std::io::Error::other(e)))?
    }
}

/// Build the router: one collection route per entity, an id route for
/// entities keyed by `id`, and one route per exposed column projection.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(routes::health))
        .route("/stats", get(routes::stats));

    for entity in Entity::ALL {
        app = app.merge(entity_routes(entity));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn entity_routes(entity: Entity) -> Router<Arc<AppState>> {
    let base = entity.route();

    let collection: MethodRouter<Arc<AppState>> =
        get(move |state: State<Arc<AppState>>| routes::list_all(state, entity));
    let collection = if entity == Entity::Delivery {
        collection.put(routes::upsert_delivery)
    } else if entity.is_insertable() {
        collection.put(
            move |state: State<Arc<AppState>>, body: Result<Json<Value>, JsonRejection>| {
                routes::insert(state, entity, body)
            },
        )
    } else {
        collection
    };

    let mut router = Router::new().route(base, collection);

    for (segment, column) in entity.projections() {
        let column: &'static str = column;
        router = router.route(
            &format!("{base}/{segment}"),
            get(move |state: State<Arc<AppState>>| routes::get_column(state, entity, column)),
        );
    }

    if entity.has_id() {
        router = router.route(
            &format!("{base}/{{id}}"),
            get(move |state: State<Arc<AppState>>, path: Path<i64>| {
                routes::get_by_id(state, entity, path)
            }),
        );
    }

    router
}

pub async fn start_server(host: &str, port: u16, database: Database) -> anyhow::Result<()> {
    let app = router(AppState::new(database));

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup_test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("test.db"));
        database.initialize().unwrap();
        (dir, router(AppState::new(database)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = setup_test_app();
        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"service": "ecomdb", "status": "ok"}));
    }

    #[tokio::test]
    async fn test_list_and_projection_routes() {
        let (_dir, app) = setup_test_app();

        let (status, body) = send(&app, "GET", "/customers", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"id": 1, "name": "Alice"},
                {"id": 2, "name": "Bob"},
                {"id": 3, "name": "Carol"}
            ])
        );

        let (_, names) = send(&app, "GET", "/customers/names", None).await;
        assert_eq!(names, json!(["Alice", "Bob", "Carol"]));

        let (_, nations) = send(&app, "GET", "/sellers/nations", None).await;
        assert_eq!(nations, json!(["Italy", "France"]));

        let (_, colors) = send(&app, "GET", "/catalog/colors", None).await;
        assert_eq!(colors, json!(["red", "blue", "black"]));

        let (_, dates) = send(&app, "GET", "/orders/dates", None).await;
        assert_eq!(dates, json!(["2026-02-01", "2026-02-02"]));

        let (_, quantities) = send(&app, "GET", "/deliveries/quantities", None).await;
        assert_eq!(quantities, json!([100, 50, 70]));

        let (_, quantities) = send(&app, "GET", "/order-items/quantities", None).await;
        assert_eq!(quantities, json!([2, 1, 1]));
    }

    #[tokio::test]
    async fn test_get_by_id_and_miss() {
        let (_dir, app) = setup_test_app();

        let (status, body) = send(&app, "GET", "/catalog/3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 3, "name": "Shoes", "color": "black"}));

        let (status, body) = send(&app, "GET", "/customers/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "not found"}));

        let (status, _) = send(&app, "GET", "/deliveries/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_insert_routes() {
        let (_dir, app) = setup_test_app();

        let (status, body) = send(&app, "PUT", "/customers", Some(json!({"name": "Dave"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"success": true, "message": "inserted"}));

        let (_, names) = send(&app, "GET", "/customers/names", None).await;
        assert_eq!(names, json!(["Alice", "Bob", "Carol", "Dave"]));

        let (status, body) = send(&app, "PUT", "/customers", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "message": "Empty payload"}));

        let (status, body) = send(&app, "PUT", "/customers", Some(Value::Null)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Empty payload");

        let (status, body) = send(
            &app,
            "PUT",
            "/order-items",
            Some(json!({"order_id": 2, "catalog_id": 2, "quantity": 4})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("UNIQUE"));
    }

    async fn send_raw(
        app: &Router,
        uri: &str,
        content_type: Option<&str>,
        body: &'static str,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method("PUT").uri(uri);
        if let Some(content_type) = content_type {
            request = request.header("Content-Type", content_type);
        }

        let response = app
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unreadable_bodies_get_write_response() {
        let (_dir, app) = setup_test_app();

        for uri in ["/customers", "/deliveries"] {
            let (status, body) = send_raw(&app, uri, Some("application/json"), "{bad").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(body["message"].is_string());

            let (status, body) = send_raw(&app, uri, None, r#"{"name": "Dave"}"#).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(body["message"].as_str().unwrap().contains("Content-Type"));
        }

        let (_, names) = send(&app, "GET", "/customers/names", None).await;
        assert_eq!(names, json!(["Alice", "Bob", "Carol"]));
    }

    #[tokio::test]
    async fn test_delivery_upsert_route() {
        let (_dir, app) = setup_test_app();

        let (status, body) = send(
            &app,
            "PUT",
            "/deliveries",
            Some(json!({"seller_id": 1, "catalog_id": 1, "quantity": 25})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"success": true, "message": "inserted", "quantity": 125}));

        let (status, body) = send(
            &app,
            "PUT",
            "/deliveries",
            Some(json!({"seller_id": 1, "quantity": 25})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "message": "seller_id, catalog_id and quantity are required"})
        );

        let (_, quantities) = send(&app, "GET", "/deliveries/quantities", None).await;
        assert_eq!(quantities, json!([125, 50, 70]));
    }

    #[tokio::test]
    async fn test_stats_route() {
        let (_dir, app) = setup_test_app();
        let (status, body) = send(&app, "GET", "/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["customers"], 3);
        assert_eq!(body["deliveries"], 3);
    }
}
