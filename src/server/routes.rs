use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
    http::StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use crate::server::AppState;
use crate::storage::DeliveryUpsert;
use crate::{Entity, Error, Row};
use std::sync::Arc;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Outcome of a write: `success` plus a message, and the stored total for deliveries
#[derive(Serialize)]
pub struct WriteResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

type ReadResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn read_error(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %err, "read failed");
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

fn written(quantity: Option<i64>) -> (StatusCode, Json<WriteResponse>) {
    (
        StatusCode::CREATED,
        Json(WriteResponse {
            success: true,
            message: "inserted".to_string(),
            quantity,
        }),
    )
}

fn rejected(err: Error) -> (StatusCode, Json<WriteResponse>) {
    tracing::warn!(error = %err, "write rejected");
    (
        StatusCode::BAD_REQUEST,
        Json(WriteResponse {
            success: false,
            message: err.to_string(),
            quantity: None,
        }),
    )
}

/// `null` counts as an empty payload; anything else must be an object.
fn into_payload(body: Result<Json<Value>, JsonRejection>) -> crate::Result<Row> {
    let Json(body) = body.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    match body {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Row::new()),
        _ => Err(Error::Validation("payload must be a JSON object".to_string())),
    }
}

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({"service": "ecomdb", "status": "ok"}))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> ReadResult<crate::DbStats> {
    let stats = state
        .with_store(|store| store.stats())
        .await
        .map_err(read_error)?;
    Ok(Json(stats))
}

pub async fn list_all(State(state): State<Arc<AppState>>, entity: Entity) -> ReadResult<Vec<Row>> {
    let rows = state
        .with_store(move |store| store.list_all(entity))
        .await
        .map_err(read_error)?;
    Ok(Json(rows))
}

pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    entity: Entity,
    Path(id): Path<i64>,
) -> ReadResult<Row> {
    let row = state
        .with_store(move |store| store.get_by_id(entity, id))
        .await
        .map_err(read_error)?;

    row.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not found".to_string(),
            }),
        )
    })
}

pub async fn get_column(
    State(state): State<Arc<AppState>>,
    entity: Entity,
    column: &'static str,
) -> ReadResult<Vec<Value>> {
    let values = state
        .with_store(move |store| store.get_column(entity, column))
        .await
        .map_err(read_error)?;
    Ok(Json(values))
}

pub async fn insert(
    State(state): State<Arc<AppState>>,
    entity: Entity,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<WriteResponse>) {
    let payload = match into_payload(body) {
        Ok(payload) => payload,
        Err(err) => return rejected(err),
    };

    match state
        .with_store(move |store| store.insert(entity, &payload))
        .await
    {
        Ok(_) => written(None),
        Err(err) => rejected(err),
    }
}

pub async fn upsert_delivery(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<WriteResponse>) {
    let delivery = match into_payload(body).and_then(|payload| DeliveryUpsert::from_payload(&payload)) {
        Ok(delivery) => delivery,
        Err(err) => return rejected(err),
    };

    match state
        .with_store(move |store| store.upsert_delivery(&delivery))
        .await
    {
        Ok(outcome) => written(Some(outcome.quantity())),
        Err(err) => rejected(err),
    }
}
