mod contact;
mod health_check;
mod subscriptions;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub use contact::{send_contact_message, ContactError};
pub use health_check::health_check;
pub use subscriptions::{subscribe, SubscribeError};

#[derive(Serialize)]
struct SuccessBody {
    message: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn json_message(message: &'static str) -> Response {
    (StatusCode::OK, Json(SuccessBody { message })).into_response()
}

pub(crate) fn json_error(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
        .into_response()
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}
