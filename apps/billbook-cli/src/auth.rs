//! Role guard.
//!
//! Identity is issued elsewhere; this module only answers "may this role
//! run this action".

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// Role of the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Staff,
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "STAFF" => Ok(Role::Staff),
            other => Err(ApiError::validation(format!("Unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Staff => write!(f, "STAFF"),
        }
    }
}

/// Fails with `FORBIDDEN` unless `role` is one of `allowed`.
pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(role))
    }
}

/// Roles allowed to change the catalogue, stock or the owner profile.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Roles allowed to sell and read.
pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::Staff];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" STAFF ".parse::<Role>().unwrap(), Role::Staff);
        assert!("cashier".parse::<Role>().is_err());
    }

    #[test]
    fn test_guard() {
        assert!(require_role(Role::Admin, ADMIN_ONLY).is_ok());
        assert!(require_role(Role::Staff, ANY_ROLE).is_ok());
        let err = require_role(Role::Staff, ADMIN_ONLY).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Forbidden);
    }
}
