//! Acting user resolved from the `x-user-id` request header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use notes::StaticIdentity;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

/// The signed-in user, if the request names one.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserId>);

impl MaybeUser {
    pub fn identity(&self) -> StaticIdentity {
        StaticIdentity::from(self.0.clone())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.headers.get(USER_HEADER) {
            None => None,
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| ApiError::BadRequest(format!("{USER_HEADER} is not valid text")))?
                    .trim();
                (!value.is_empty()).then(|| UserId::new(value))
            }
        };
        Ok(MaybeUser(user))
    }
}

/// A signed-in user; rejects the request with 401 otherwise.
#[derive(Debug, Clone)]
pub struct User(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for User {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(User)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_HEADER} header")))
    }
}
