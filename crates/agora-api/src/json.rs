use crate::error::ApiError;
use axum::{
    Json as AxumJson,
    extract::FromRequest,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Json extractor whose rejection flows through the ApiError taxonomy, so a
/// malformed or missing body produces the documented 400 instead of axum's
/// default rejection status.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}
