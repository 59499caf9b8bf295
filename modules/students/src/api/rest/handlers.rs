use std::sync::Arc;

use axum::{body::Bytes, extract::Path, response::Json, Extension};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::info;

use crate::api::rest::dto::{CreateStudentReq, MessageDto, StudentDto, UpdateStudentReq};
use crate::api::rest::error::{
    map_create_error, map_lookup_error, map_precheck_error, map_write_error, ApiError,
};
use crate::domain::service::Service;

/// Decode a JSON object body regardless of the declared content type.
///
/// Derived struct deserializers also accept sequences, so the body is checked
/// to be an object before it is bound. A bare `null` binds like `{}`.
fn bind_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let value = match value {
        obj @ Value::Object(_) => obj,
        Value::Null => Value::Object(Map::new()),
        other => {
            return Err(ApiError::bad_request(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };
    serde_json::from_value(value).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Get the first active student with the given name
pub async fn get_student(
    Extension(svc): Extension<Arc<Service>>,
    Path(name): Path<String>,
) -> Result<Json<StudentDto>, ApiError> {
    info!("Getting student: {}", name);

    let student = svc.get_student(&name).await.map_err(map_lookup_error)?;
    Ok(Json(student.into()))
}

/// Create a new student
pub async fn create_student(
    Extension(svc): Extension<Arc<Service>>,
    body: Bytes,
) -> Result<Json<StudentDto>, ApiError> {
    let req: CreateStudentReq = bind_json(&body)?;
    info!("Creating student: {:?}", req);

    let student = svc
        .create_student(req.into())
        .await
        .map_err(map_create_error)?;
    Ok(Json(student.into()))
}

/// Rename the first active student with the given name
pub async fn update_student(
    Extension(svc): Extension<Arc<Service>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<StudentDto>, ApiError> {
    info!("Updating student: {}", name);

    // Existence is checked before the body is looked at.
    let current = svc
        .get_student(&name)
        .await
        .map_err(map_precheck_error)?;

    let req: UpdateStudentReq = bind_json(&body)?;
    let student = svc
        .update_student(current, req.into())
        .await
        .map_err(map_write_error)?;
    Ok(Json(student.into()))
}

/// Soft-delete the first active student with the given name
pub async fn delete_student(
    Extension(svc): Extension<Arc<Service>>,
    Path(name): Path<String>,
) -> Result<Json<MessageDto>, ApiError> {
    info!("Deleting student: {}", name);

    svc.delete_student(&name).await.map_err(map_write_error)?;
    Ok(Json(MessageDto {
        message: "Student deleted".to_owned(),
    }))
}
