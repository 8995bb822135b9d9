//! Role-header authorization.
//!
//! Callers identify themselves with an `x-role` header; each role maps
//! to a fixed permission set. Absent header defaults to the least
//! privileged read/evaluate role.

use axum::http::HeaderMap;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SecurityArchitect,
    AppsecEngineer,
    DevLead,
    Auditor,
    PlatformAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Ingest,
    Evaluate,
    Admin,
}

impl Role {
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Role::SecurityArchitect | Role::PlatformAdmin => true,
            Role::AppsecEngineer => permission != Permission::Admin,
            Role::DevLead => matches!(permission, Permission::Read | Permission::Evaluate),
            Role::Auditor => permission == Permission::Read,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "security_architect" => Ok(Role::SecurityArchitect),
            "appsec_engineer" => Ok(Role::AppsecEngineer),
            "dev_lead" => Ok(Role::DevLead),
            "auditor" => Ok(Role::Auditor),
            "platform_admin" => Ok(Role::PlatformAdmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Resolve the caller's role and check it against the required
/// permission. With auth disabled every caller is an admin.
pub fn require(
    auth_enabled: bool,
    headers: &HeaderMap,
    permission: Permission,
) -> Result<Role, ApiError> {
    if !auth_enabled {
        return Ok(Role::PlatformAdmin);
    }
    let raw = headers
        .get("x-role")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("dev_lead");
    let role: Role = raw
        .parse()
        .map_err(|_| ApiError::Unauthorized("invalid role".to_string()))?;
    if !role.allows(permission) {
        return Err(ApiError::Forbidden("insufficient permissions".to_string()));
    }
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_matrix() {
        assert!(Role::PlatformAdmin.allows(Permission::Admin));
        assert!(Role::SecurityArchitect.allows(Permission::Ingest));
        assert!(Role::AppsecEngineer.allows(Permission::Evaluate));
        assert!(!Role::AppsecEngineer.allows(Permission::Admin));
        assert!(Role::DevLead.allows(Permission::Evaluate));
        assert!(!Role::DevLead.allows(Permission::Ingest));
        assert!(Role::Auditor.allows(Permission::Read));
        assert!(!Role::Auditor.allows(Permission::Evaluate));
    }

    #[test]
    fn missing_header_defaults_to_dev_lead() {
        let headers = HeaderMap::new();
        let role = require(true, &headers, Permission::Read).unwrap();
        assert_eq!(role, Role::DevLead);
        assert!(require(true, &headers, Permission::Ingest).is_err());
    }

    #[test]
    fn unknown_role_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert("x-role", "intern".parse().unwrap());
        assert!(matches!(
            require(true, &headers, Permission::Read),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn disabled_auth_allows_everything() {
        let headers = HeaderMap::new();
        assert!(require(false, &headers, Permission::Admin).is_ok());
    }
}
