//! REST API definitions.
//!
//! Every body is JSON. Failures are rendered as [`Error`]s.

pub mod auth;
pub mod category;
pub mod dish;
pub mod user;

use std::str::FromStr;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{gate::csrf, Error};

/// Builds the [`Router`] of the whole REST API.
///
/// The gate's CSRF middleware and the [`Context`] extension are expected to
/// be layered on top of it.
///
/// [`Context`]: crate::Context
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/csrf-token", get(csrf::token))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", put(auth::change_password))
        .route(
            "/api/categories",
            get(category::list).post(category::create),
        )
        .route(
            "/api/categories/:id",
            put(category::update)
                .patch(category::update)
                .delete(category::delete),
        )
        .route("/api/plats", get(dish::list).post(dish::create))
        .route(
            "/api/plats/:id",
            get(dish::get)
                .put(dish::update)
                .patch(dish::update)
                .delete(dish::delete),
        )
        .route("/api/utilisateurs", get(user::list).post(user::create))
        .route("/api/utilisateurs/me", get(user::me))
        .route("/api/utilisateurs/check", post(user::check))
        .route("/api/utilisateurs/admin-only", get(user::admin_only))
        .route(
            "/api/utilisateurs/:id",
            put(user::update).patch(user::update).delete(user::delete),
        )
}

/// Reports the server being alive.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
pub async fn health() -> Json<Message> {
    Json(Message::new("OK"))
}

/// Informational response.
#[derive(Clone, Debug, Serialize)]
pub struct Message {
    /// Human-readable text.
    pub message: &'static str,
}

impl Message {
    /// Creates a new [`Message`].
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Parses the provided raw `value` into a validated domain type.
///
/// # Errors
///
/// With `BAD_REQUEST` if the `value` is invalid.
pub fn parse<T>(value: &str) -> Result<T, Error>
where
    T: FromStr<Err = &'static str>,
{
    value.parse().map_err(Error::bad_request)
}

/// Validates the provided raw `value` with the provided constructor.
///
/// # Errors
///
/// With `BAD_REQUEST` mentioning the `what` if the `value` is invalid.
pub fn validate<T>(
    value: &str,
    new: impl FnOnce(&str) -> Option<T>,
    what: &str,
) -> Result<T, Error> {
    new(value).ok_or_else(|| Error::bad_request(format!("invalid `{what}`")))
}

/// Deserializes a present field (even a `null` one) as [`Some`], so it's
/// distinguishable from an absent one when used along with
/// `#[serde(default)]`.
///
/// # Errors
///
/// If the field is not a valid `T`.
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
