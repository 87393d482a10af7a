//! Request extractors.
//!
//! The caller is identified by the `x-user-id` header, set by whatever
//! authenticates requests in front of this service. Body and path extractors
//! are wrapped so their rejections use the crate's error envelope.

use crate::{
    core::user,
    entities,
    errors::Error,
    web::AppState,
};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub entities::user::Model);

impl CurrentUser {
    /// The user's id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.0.id
    }
}

fn header_user_id(parts: &Parts) -> Result<i64, Error> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or(Error::Unauthenticated)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = header_user_id(parts)?;
        match user::get_user(state.db(), user_id).await {
            Ok(model) => Ok(Self(model)),
            Err(Error::UserNotFound { .. }) => Err(Error::Unauthenticated),
            Err(e) => Err(e),
        }
    }
}

/// JSON body whose rejection is reported as a validation error
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct AppJson<T>(pub T);

/// Path parameters whose rejection is reported as a validation error
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct AppPath<T>(pub T);
