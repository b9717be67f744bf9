//! REST handlers for the record collections.
//!
//! Every successful response uses the `{success, data}` envelope; failures
//! use `{success: false, error}` with a matching status code.

use crate::error::StorageError;
use crate::server::ClubServer;
use crate::storage::{RecordStorage, StoredRecord};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use sync_types::{ApiErrorBody, ApiResponse, ChangeEvent, Collection, Record, RecordId, SyncRequest};

/// Application errors surfaced by the REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The path named a collection that does not exist.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// The record id in the path or body could not be parsed.
    #[error("invalid record id: {0}")]
    InvalidId(String),

    /// The record body failed validation.
    #[error("invalid record body: {0}")]
    InvalidBody(String),

    /// Storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownCollection(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidId(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiErrorBody::new(self.to_string()))).into_response()
    }
}

/// Count an application error before returning it.
fn fail(server: &ClubServer, error: ApiError) -> ApiError {
    server.metrics().errors_total.fetch_add(1, Ordering::Relaxed);
    error
}

fn parse_collection(server: &ClubServer, raw: &str) -> Result<Collection, ApiError> {
    Collection::from_str(raw).map_err(|_| fail(server, ApiError::UnknownCollection(raw.to_string())))
}

fn parse_id(server: &ClubServer, raw: &str) -> Result<RecordId, ApiError> {
    RecordId::from_str(raw).map_err(|_| fail(server, ApiError::InvalidId(raw.to_string())))
}

/// Pull the record id out of a body, or mint one when the client sent none.
fn body_id(server: &ClubServer, body: &Value) -> Result<RecordId, ApiError> {
    match body.get("id") {
        None | Some(Value::Null) => Ok(RecordId::new()),
        Some(Value::String(raw)) => parse_id(server, raw),
        Some(other) => Err(fail(
            server,
            ApiError::InvalidId(other.to_string()),
        )),
    }
}

/// Validate a body against the collection's record shape and store it.
async fn validate_and_store(
    server: &ClubServer,
    collection: Collection,
    id: RecordId,
    mut body: Value,
) -> Result<StoredRecord, ApiError> {
    if !body.is_object() {
        return Err(fail(
            server,
            ApiError::InvalidBody("record body must be a JSON object".to_string()),
        ));
    }
    body["id"] = json!(id.to_string());

    // Shape check only - storage keeps the JSON document
    Record::from_value(collection, body.clone())
        .map_err(|e| fail(server, ApiError::InvalidBody(e.to_string())))?;

    server
        .storage()
        .upsert(collection, id, body)
        .await
        .map_err(|e| fail(server, e.into()))
}

/// `GET /api/<collection>` - list all records.
pub async fn list_handler(
    Path(raw): Path<String>,
    Extension(server): Extension<Arc<ClubServer>>,
) -> Result<Json<ApiResponse<Vec<Value>>>, ApiError> {
    let collection = parse_collection(&server, &raw)?;

    let records = server
        .storage()
        .list(collection)
        .await
        .map_err(|e| fail(&server, e.into()))?;

    server.metrics().lists_total.fetch_add(1, Ordering::Relaxed);

    let payloads = records.into_iter().map(|r| r.payload).collect();
    Ok(Json(ApiResponse::ok(payloads)))
}

/// `POST /api/<collection>` - create (upsert by id) a record.
pub async fn create_handler(
    Path(raw): Path<String>,
    Extension(server): Extension<Arc<ClubServer>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), ApiError> {
    let collection = parse_collection(&server, &raw)?;
    let id = body_id(&server, &body)?;

    let stored = validate_and_store(&server, collection, id, body).await?;

    server.metrics().creates_total.fetch_add(1, Ordering::Relaxed);
    server.broadcast(ChangeEvent::RecordAdded {
        collection,
        record: stored.payload.clone(),
    });

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(stored.payload))))
}

/// `PUT /api/<collection>/<id>` - update (upsert) a record.
///
/// The path id wins over any id in the body.
pub async fn update_handler(
    Path((raw, raw_id)): Path<(String, String)>,
    Extension(server): Extension<Arc<ClubServer>>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let collection = parse_collection(&server, &raw)?;
    let id = parse_id(&server, &raw_id)?;

    let stored = validate_and_store(&server, collection, id, body).await?;

    server.metrics().updates_total.fetch_add(1, Ordering::Relaxed);
    server.broadcast(ChangeEvent::RecordChanged {
        collection,
        record: stored.payload.clone(),
    });

    Ok(Json(ApiResponse::ok(stored.payload)))
}

/// `DELETE /api/<collection>/<id>` - idempotent delete.
pub async fn delete_handler(
    Path((raw, raw_id)): Path<(String, String)>,
    Extension(server): Extension<Arc<ClubServer>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let collection = parse_collection(&server, &raw)?;
    let id = parse_id(&server, &raw_id)?;

    let deleted = server
        .storage()
        .delete(collection, &id)
        .await
        .map_err(|e| fail(&server, e.into()))?;

    server.metrics().deletes_total.fetch_add(1, Ordering::Relaxed);
    if deleted {
        server.broadcast(ChangeEvent::RecordDeleted { collection, id });
    }

    Ok(Json(ApiResponse::ok(json!({ "deleted": deleted }))))
}

/// `POST /api/sync` - replace every collection with the submitted snapshot.
///
/// Last-writer-wins by contract: the whole server-side dataset becomes the
/// client's snapshot, atomically, then every subscriber is told to re-fetch.
pub async fn sync_handler(
    Extension(server): Extension<Arc<ClubServer>>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let replaced = server
        .storage()
        .replace_all(&request.data)
        .await
        .map_err(|e| fail(&server, e.into()))?;

    server
        .metrics()
        .snapshot_syncs_total
        .fetch_add(1, Ordering::Relaxed);
    server.broadcast(ChangeEvent::DataSync);

    Ok(Json(ApiResponse::ok(json!({ "replaced": replaced }))))
}
