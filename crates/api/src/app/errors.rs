//! Error → HTTP response mapping.
//!
//! | class | status | `error` |
//! |-------|--------|---------|
//! | unauthenticated | 401 | `unauthenticated` |
//! | forbidden | 403 | `forbidden` |
//! | not found | 404 | `not_found` |
//! | conflict / validation | 400 | `conflict`, `validation_error`, `invalid_transition` |
//! | consistency / backend | 500 | `internal_error` |
//!
//! Internal failures are logged here and never echoed to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use hrdesk_auth::{AuthError, DenialKind, GateError};
use hrdesk_core::DomainError;
use hrdesk_infra::{AccountError, LedgerError, StoreError};

const UNAUTHENTICATED: &str = "could not validate credentials";
const INTERNAL: &str = "internal server error";

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn unauthenticated() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", UNAUTHENTICATED)
}

fn internal(err: &dyn std::fmt::Display) -> Response {
    tracing::error!(error = %err, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL)
}

pub fn gate_error(err: GateError) -> Response {
    match err.kind() {
        DenialKind::Unauthenticated => unauthenticated(),
        DenialKind::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        DenialKind::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        DenialKind::Internal => internal(&err),
    }
}

pub fn store_error(err: StoreError) -> Response {
    match &err {
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        StoreError::Conflict(m) => json_error(StatusCode::BAD_REQUEST, "conflict", m.clone()),
        StoreError::Validation(m) => json_error(StatusCode::BAD_REQUEST, "validation_error", m.clone()),
        StoreError::Consistency(_) | StoreError::Backend(_) => internal(&err),
    }
}

pub fn domain_error(err: DomainError) -> Response {
    store_error(err.into())
}

pub fn ledger_error(err: LedgerError) -> Response {
    match &err {
        LedgerError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        LedgerError::Conflict(m) => json_error(StatusCode::BAD_REQUEST, "conflict", m.clone()),
        LedgerError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        LedgerError::InvalidTransition { .. } => {
            json_error(StatusCode::BAD_REQUEST, "invalid_transition", err.to_string())
        }
        LedgerError::Consistency(_) => internal(&err),
    }
}

pub fn account_error(err: AccountError) -> Response {
    match err {
        AccountError::Auth(AuthError::InvalidCredentials) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "incorrect username or password")
        }
        AccountError::Auth(e) if e.is_unauthenticated() => unauthenticated(),
        AccountError::Auth(e) => internal(&e),
        AccountError::Store(e) => store_error(e),
    }
}

#[cfg(test)]
mod tests {
    use hrdesk_auth::Permission;
    use hrdesk_leave::LeaveStatus;

    use super::*;

    #[test]
    fn gate_denials_follow_the_taxonomy() {
        let cases = [
            (GateError::Unauthenticated(AuthError::TokenExpired), StatusCode::UNAUTHORIZED),
            (GateError::MissingPermission(Permission::new("get_user")), StatusCode::FORBIDDEN),
            (GateError::CrossDepartmentDenied, StatusCode::FORBIDDEN),
            (GateError::InsufficientHierarchy, StatusCode::FORBIDDEN),
            (GateError::TargetNotFound(hrdesk_core::UserId::new()), StatusCode::NOT_FOUND),
            (GateError::Directory("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(gate_error(err).status(), status);
        }
    }

    #[test]
    fn conflicts_are_bad_requests_and_backend_failures_are_internal() {
        assert_eq!(store_error(StoreError::conflict("dup")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(store_error(StoreError::backend("io")).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ledger_error(LedgerError::InvalidTransition { from: LeaveStatus::Rejected, to: LeaveStatus::Approved }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ledger_error(LedgerError::consistency("neg")).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn inactive_accounts_are_unauthenticated() {
        assert_eq!(account_error(AuthError::AccountInactive.into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(account_error(AuthError::Crypto("x".into()).into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
