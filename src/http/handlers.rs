//! Route handlers
//!
//! Thin wrappers: parse the request, call the [`SessionManager`], shape the response.

use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::{json, Value};

use super::response::{
    ApiError, ChangeDirectoryResponse, ConnectRequest, ConnectResponse, Context,
    CreateDirectoryRequest, ListQuery, ListResponse, OperationResponse, RenameRequest,
    STATUS_SUCCESS,
};
use super::AppState;
use crate::error::{RequestError, SessionError};
use crate::session::SessionId;

type ApiResult<T> = Result<T, ApiError>;

/// Unparseable ids are just unknown sessions
fn parse_session_id(raw: &str) -> Result<SessionId, SessionError> {
    raw.parse()
        .map_err(|_| SessionError::NotFound(raw.to_string()))
}

fn require(field: &'static str, value: String) -> Result<String, RequestError> {
    if value.trim().is_empty() {
        Err(RequestError::MissingField(field))
    } else {
        Ok(value)
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "FTP Client API" }))
}

pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> ApiResult<Json<ConnectResponse>> {
    let host = req.host.clone();
    let session_id = state
        .manager
        .connect(req.host, req.port, req.username, req.password)
        .await
        .context("Connection failed")?;

    Ok(Json(ConnectResponse {
        session_id: session_id.to_string(),
        status: STATUS_SUCCESS.to_string(),
        message: format!("Successfully connected to {}", host),
    }))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<OperationResponse>> {
    let id = parse_session_id(&session_id).context("Disconnect failed")?;
    let outcome = state
        .manager
        .disconnect(&id)
        .await
        .context("Disconnect failed")?;
    Ok(Json(OperationResponse::success(outcome.message())))
}

pub async fn list(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let id = parse_session_id(&session_id).context("Failed to list files")?;
    let listing = state
        .manager
        .list(&id, query.path)
        .await
        .context("Failed to list files")?;

    Ok(Json(ListResponse {
        files: listing.entries,
        current_path: listing.current_path,
        status: STATUS_SUCCESS.to_string(),
    }))
}

pub async fn upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<OperationResponse>> {
    let id = parse_session_id(&session_id).context("Failed to upload file")?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RequestError::MalformedBody(e.to_string()))
        .context("Failed to upload file")?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|f| !f.is_empty())
            .ok_or(RequestError::MissingFilename)
            .context("Failed to upload file")?;
        let data = field
            .bytes()
            .await
            .map_err(|e| RequestError::MalformedBody(e.to_string()))
            .context("Failed to upload file")?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) = upload
        .ok_or(RequestError::MissingField("file"))
        .context("Failed to upload file")?;

    state
        .manager
        .upload(&id, filename.clone(), data)
        .await
        .context("Failed to upload file")?;

    Ok(Json(OperationResponse::success(format!(
        "File '{}' uploaded successfully",
        filename
    ))))
}

pub async fn download(
    State(state): State<AppState>,
    Path((session_id, filename)): Path<(String, String)>,
) -> ApiResult<Response> {
    let id = parse_session_id(&session_id).context("Failed to download file")?;
    let data = state
        .manager
        .download(&id, filename.clone())
        .await
        .context("Failed to download file")?;

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (header::CONTENT_DISPOSITION, content_disposition(&filename)),
    ];
    Ok((headers, data).into_response())
}

/// `attachment; filename="..."`, or bare `attachment` when the name cannot go in a header
fn content_disposition(filename: &str) -> HeaderValue {
    let cleaned = filename.replace(['"', '\\'], "");
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", cleaned))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

pub async fn change_directory(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    request: Request,
) -> ApiResult<Json<ChangeDirectoryResponse>> {
    let id = parse_session_id(&session_id).context("Failed to change directory")?;
    let path = form_field(request, "path")
        .await
        .and_then(|p| require("path", p))
        .context("Failed to change directory")?;

    let current_path = state
        .manager
        .change_directory(&id, path)
        .await
        .context("Failed to change directory")?;

    Ok(Json(ChangeDirectoryResponse {
        status: STATUS_SUCCESS.to_string(),
        message: format!("Changed directory to {}", current_path),
        current_path,
    }))
}

/// Read one field from a multipart or urlencoded form body
async fn form_field(request: Request, name: &'static str) -> Result<String, RequestError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| RequestError::MalformedBody(e.to_string()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RequestError::MalformedBody(e.to_string()))?
        {
            if field.name() == Some(name) {
                return field
                    .text()
                    .await
                    .map_err(|e| RequestError::MalformedBody(e.to_string()));
            }
        }
        Err(RequestError::MissingField(name))
    } else {
        let Form(mut fields) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|e| RequestError::MalformedBody(e.to_string()))?;
        fields.remove(name).ok_or(RequestError::MissingField(name))
    }
}

pub async fn create_directory(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<CreateDirectoryRequest>,
) -> ApiResult<Json<OperationResponse>> {
    let id = parse_session_id(&session_id).context("Failed to create directory")?;
    let name = require("directory_name", req.directory_name).context("Failed to create directory")?;

    state
        .manager
        .create_directory(&id, name.clone())
        .await
        .context("Failed to create directory")?;

    Ok(Json(OperationResponse::success(format!(
        "Directory '{}' created successfully",
        name
    ))))
}

pub async fn rename(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<OperationResponse>> {
    let id = parse_session_id(&session_id).context("Failed to rename")?;
    let old_name = require("old_name", req.old_name).context("Failed to rename")?;
    let new_name = require("new_name", req.new_name).context("Failed to rename")?;

    state
        .manager
        .rename(&id, old_name.clone(), new_name.clone())
        .await
        .context("Failed to rename")?;

    Ok(Json(OperationResponse::success(format!(
        "Renamed '{}' to '{}'",
        old_name, new_name
    ))))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((session_id, name)): Path<(String, String)>,
) -> ApiResult<Json<OperationResponse>> {
    let id = parse_session_id(&session_id).context("Failed to delete")?;

    state
        .manager
        .delete(&id, name.clone())
        .await
        .context("Failed to delete")?;

    Ok(Json(OperationResponse::success(format!(
        "'{}' deleted successfully",
        name
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_id() {
        let id = SessionId::new();
        assert_eq!(parse_session_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_session_id("bogus"),
            Err(SessionError::NotFound(raw)) if raw == "bogus"
        ));
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("report.pdf"),
            HeaderValue::from_static("attachment; filename=\"report.pdf\"")
        );
        assert_eq!(
            content_disposition("we\"ird.txt"),
            HeaderValue::from_static("attachment; filename=\"weird.txt\"")
        );
        assert_eq!(content_disposition("caf\u{e9}\n.txt"), HeaderValue::from_static("attachment"));
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(require("path", "  ".to_string()).is_err());
        assert_eq!(require("path", "/pub".to_string()).unwrap(), "/pub");
    }
}
