//! Request extractors
//!
//! Identity arrives from the trusted front proxy as headers; the gateway
//! performs authorization, not authentication. A missing or unrecognized
//! role yields a user with no capabilities rather than a rejection, so
//! denials flow through the normal permission gate and get audited.

use std::convert::Infallible;
use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::application::router::ActingUser;
use crate::domain::permissions::Role;

/// Identity header set by the front proxy
pub const USER_HEADER: &str = "x-gateway-user";
/// Role header set by the front proxy
pub const ROLE_HEADER: &str = "x-gateway-role";

/// The acting user, extracted from trusted upstream identity headers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub ActingUser);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let user_id = header(USER_HEADER).unwrap_or("anonymous").to_string();
        let role = header(ROLE_HEADER).and_then(|raw| Role::from_str(raw).ok());

        Ok(Self(ActingUser { user_id, role }))
    }
}
