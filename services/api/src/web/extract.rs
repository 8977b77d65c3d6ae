//! services/api/src/web/extract.rs
//!
//! Request extractors whose rejections render as `ApiError` bodies.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` with malformed bodies reported as 400 `ErrorBody` responses.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);
