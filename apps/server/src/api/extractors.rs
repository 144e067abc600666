//! Custom Axum extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::search::Identity;
use crate::state::AppState;

/// The caller's identity, taken from the trusted header the fronting proxy
/// sets. A missing or non-UTF-8 header is anonymous.
#[derive(Debug, Clone)]
pub struct RemoteIdentity(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for RemoteIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(state.config.server.identity_header.as_str())
            .and_then(|v| v.to_str().ok());
        Ok(RemoteIdentity(Identity::classify(
            user_id,
            &state.config.search.admin_users,
        )))
    }
}
