//! Workspace roles
//!
//! Role-based access control within a workspace. Roles are hierarchical:
//! Viewer < Editor < Owner.

use crate::error::AppError;
use bytes::BytesMut;
use postgres_types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use serde::{Deserialize, Serialize};

/// Member role within a workspace.
///
/// | Role   | Read | Write | Delete | Invite | Manage members |
/// |--------|------|-------|--------|--------|----------------|
/// | owner  | yes  | yes   | yes    | yes    | yes            |
/// | editor | yes  | yes   | no     | no     | no             |
/// | viewer | yes  | no    | no     | no     | no             |
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access
    Viewer = 1,

    /// Can create and edit content
    Editor = 2,

    /// Full workspace control
    Owner = 3,
}

impl Role {
    /// Parse a role from its string representation (case-insensitive)
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "owner" => Ok(Self::Owner),
            other => Err(AppError::Validation(format!("invalid role: {:?}", other))),
        }
    }

    /// Lowercase string representation, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Owner => "owner",
        }
    }

    /// Position in the role hierarchy: owner(3) > editor(2) > viewer(1)
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Minimum-role gate: does this role meet the required minimum?
    pub fn meets(&self, minimum: Role) -> bool {
        self.rank() >= minimum.rank()
    }

    pub fn can_read(&self) -> bool {
        true
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Role::Editor | Role::Owner)
    }

    pub fn can_delete(&self) -> bool {
        matches!(self, Role::Owner)
    }

    pub fn can_invite(&self) -> bool {
        matches!(self, Role::Owner)
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> FromSql<'a> for Role {
    fn from_sql(
        ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let s = <&str as FromSql>::from_sql(ty, raw)?;
        Role::parse(s).map_err(|e| e.to_string().into())
    }

    fn accepts(ty: &Type) -> bool {
        <&str as FromSql>::accepts(ty)
    }
}

impl ToSql for Role {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.as_str().to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <&str as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL: [Role; 3] = [Role::Viewer, Role::Editor, Role::Owner];

    #[test]
    fn capability_matrix() {
        // (role, read, write, delete, invite, manage_members)
        let expected = [
            (Role::Owner, true, true, true, true, true),
            (Role::Editor, true, true, false, false, false),
            (Role::Viewer, true, false, false, false, false),
        ];
        for (role, read, write, delete, invite, manage) in expected {
            assert_eq!(role.can_read(), read, "{role} read");
            assert_eq!(role.can_write(), write, "{role} write");
            assert_eq!(role.can_delete(), delete, "{role} delete");
            assert_eq!(role.can_invite(), invite, "{role} invite");
            assert_eq!(role.can_manage_members(), manage, "{role} manage");
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("owner").unwrap(), Role::Owner);
        assert_eq!(Role::parse("OWNER").unwrap(), Role::Owner);
        assert_eq!(Role::parse("Editor").unwrap(), Role::Editor);
        assert_eq!(Role::parse("vIeWeR").unwrap(), Role::Viewer);
    }

    #[test]
    fn parse_rejects_everything_else() {
        for s in ["", "admin", "guest", "owner ", " owner", "own", "editor2"] {
            let err = Role::parse(s).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "should reject {s:?}");
        }
    }

    #[test]
    fn parse_round_trips_as_str() {
        for role in ALL {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn rank_ordering() {
        assert!(Role::Owner > Role::Editor);
        assert!(Role::Editor > Role::Viewer);
        assert_eq!(Role::Owner.rank(), 3);
        assert_eq!(Role::Editor.rank(), 2);
        assert_eq!(Role::Viewer.rank(), 1);
    }

    #[test]
    fn minimum_role_gate_is_rank_comparison() {
        // admits r under minimum m  <=>  rank(r) >= rank(m)
        for r in ALL {
            for m in ALL {
                assert_eq!(r.meets(m), r.rank() >= m.rank(), "{r} meets {m}");
            }
        }
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"viewer\"").unwrap(),
            Role::Viewer
        );
    }
}
