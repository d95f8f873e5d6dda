//! Request extractors whose rejections use the crate error taxonomy
//!
//! axum's stock extractors reject with plain-text bodies and their own status
//! codes (422 for a malformed JSON body). These wrappers route every
//! rejection through [`Error::BadRequest`] instead, so a bad body, query
//! string, or path segment comes back as a 400 with the same
//! `{"error":"<message>"}` shape every other failure uses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::Error;

/// JSON body extractor rejecting with [`Error::BadRequest`]
///
/// Also usable as a response body, like `axum::Json`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string extractor rejecting with [`Error::BadRequest`]
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Query<T>(pub T);

/// Path segment extractor rejecting with [`Error::BadRequest`]
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}
