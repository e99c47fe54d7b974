//! Tenant routing module
//!
//! Resolves which tenant schema a request operates on and guarantees the
//! identifier is safe to interpolate into `SET search_path`.

mod middleware;
mod resolver;

pub use middleware::require_tenant;
pub use resolver::{resolve_tenant, Organization, OrganizationRepo};

use crate::error::AppError;
use once_cell::sync::Lazy;
use regex::Regex;

/// DNS-safe, SQL-identifier-safe schema names only. Anything else is a
/// provisioning bug, not a request error.
static SCHEMA_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").expect("schema name regex"));

/// A validated tenant schema identifier.
///
/// Construction is the only place validation happens; everything downstream
/// (schema pinning, the migration runner) interpolates `as_str()` into DDL
/// on the strength of this check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantSchema(String);

impl TenantSchema {
    /// Validate and wrap a schema identifier.
    ///
    /// A rejected identifier means the organizations table holds a value we
    /// never provisioned; that is a fatal configuration error surfaced as
    /// 500, never a per-request 4xx.
    pub fn new(name: impl Into<String>) -> Result<Self, AppError> {
        let name = name.into();
        if !SCHEMA_NAME_RE.is_match(&name) {
            return Err(AppError::Internal(format!(
                "invalid tenant schema identifier: {:?}",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_provisioned_shapes() {
        for name in ["t_acme", "acme", "a", "tenant_42", "x1_y2_z3"] {
            assert!(TenantSchema::new(name).is_ok(), "should accept {name}");
        }
    }

    #[test]
    fn accepts_max_length_identifier() {
        // 1 leading letter + 62 tail chars = Postgres identifier limit
        let name = format!("a{}", "b".repeat(62));
        assert!(TenantSchema::new(name).is_ok());
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        let cases = [
            "",
            "1tenant",
            "_tenant",
            "Tenant",
            "t-acme",
            "t acme",
            "t.acme",
            "t\"acme",
            "t;DROP SCHEMA public CASCADE;--",
            "t'||'x",
            "public, pg_catalog",
            &format!("a{}", "b".repeat(63)),
        ];
        for name in cases {
            assert!(TenantSchema::new(name).is_err(), "should reject {name:?}");
        }
    }

    #[test]
    fn rejected_identifiers_surface_as_internal() {
        let err = TenantSchema::new("t;x").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
