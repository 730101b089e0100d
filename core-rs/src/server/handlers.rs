/**
 * handlers.rs
 * Request handlers for /get, /set and /del
 */

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::AppState;
use crate::errors::PaldError;
use crate::grammar::{is_valid_address, is_valid_name, split_addresses};

/// Error answer: a status code plus a one-line plain text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PaldError> for ApiError {
    fn from(err: PaldError) -> Self {
        let status = match &err {
            PaldError::NotFound(_) => StatusCode::NOT_FOUND,
            PaldError::InvalidName(_) | PaldError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            e if e.is_conflict() => StatusCode::PRECONDITION_FAILED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, format!("{}\n", self.message)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Params {
    service: Option<String>,
    port: Option<String>,
    addr: Option<String>,
}

fn service_name(params: &Params) -> Result<&str, ApiError> {
    match params.service.as_deref() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ApiError::bad_request("Service name is missing")),
    }
}

fn parse_port(raw: &str) -> Result<u16, ApiError> {
    raw.parse::<u16>()
        .map_err(|e| ApiError::bad_request(format!("Invalid port {:?}: {}", raw, e)))
}

pub(super) async fn get_port(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<String, ApiError> {
    let name = service_name(&params)?;
    let (port, _) = state.registry.lookup(name)?;
    Ok(format!("{}\n", port))
}

pub(super) async fn set_port(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<String, ApiError> {
    let name = service_name(&params)?;
    if !is_valid_name(name) {
        return Err(ApiError::bad_request(format!(
            "Service name {:?} may only contain letters, digits, '_', '.' and '-'",
            name
        )));
    }

    let addresses = params.addr.as_deref().map(split_addresses).unwrap_or_default();
    if let Some(bad) = addresses.iter().find(|a| !is_valid_address(a)) {
        return Err(ApiError::bad_request(format!("Invalid address {:?}", bad)));
    }
    let addresses: Vec<&str> = addresses.iter().map(String::as_str).collect();

    let body = match params.port.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => {
            let port = parse_port(raw)?;
            state.registry.fix(port, name, &addresses)?;
            "OK\n".to_string()
        }
        None => {
            let port = state.registry.alloc(name, &addresses)?;
            format!("{}\n", port)
        }
    };

    state.flusher.flush().await;
    Ok(body)
}

pub(super) async fn del_port(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<String, ApiError> {
    let port = match params.port.as_deref() {
        Some(raw) if !raw.is_empty() => parse_port(raw)?,
        _ => return Err(ApiError::bad_request("Port number is missing")),
    };

    state.registry.forget(port);
    state.flusher.flush().await;
    Ok("OK\n".to_string())
}
