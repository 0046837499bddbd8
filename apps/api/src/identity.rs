//! Caller identity.
//!
//! The login system sits in front of this service and forwards who the user
//! is in two headers:
//!
//! - `X-User-Id`: opaque user identifier, recorded on bills and events
//! - `X-User-Role`: `admin`, `pharmacist` or `audit`
//!
//! Handlers take an [`Identity`] argument and call [`require`] with the
//! action they perform.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use crate::error::ApiError;
use pharmos_core::{Action, Caller, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Identity(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Missing X-User-Id header"))?;

        let role: Role = header(USER_ROLE_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Missing X-User-Role header"))?
            .parse()
            .map_err(|_| ApiError::unauthorized("Unknown role in X-User-Role header"))?;

        Ok(Identity(Caller::new(user_id, role)))
    }
}

/// Fails with 403 unless the caller's role grants `action`.
pub fn require(caller: &Caller, action: Action) -> Result<(), ApiError> {
    if caller.role.can(action) {
        Ok(())
    } else {
        debug!(user_id = %caller.user_id, role = %caller.role, action = %action, "Capability denied");
        Err(ApiError::forbidden(format!(
            "Role '{}' may not {}",
            caller.role, action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_require() {
        let pharmacist = Caller::new("p-1", Role::Pharmacist);
        assert!(require(&pharmacist, Action::CreateBill).is_ok());

        let err = require(&pharmacist, Action::CancelBill).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let auditor = Caller::new("a-1", Role::Audit);
        assert!(require(&auditor, Action::ViewEvents).is_ok());
        assert!(require(&auditor, Action::CreateBill).is_err());
    }
}
