//! Member mutation rules
//!
//! Pure invariant checks shared by the member handlers. Kept free of I/O so
//! the invariants are testable in isolation.

use crate::error::AppError;
use crate::workspace::Role;
use uuid::Uuid;

/// A member may be removed unless they are the caller or hold the owner
/// role. Ownership is transferred, never removed.
pub fn ensure_member_removable(
    actor: Uuid,
    target: Uuid,
    target_role: Role,
) -> Result<(), AppError> {
    if actor == target {
        return Err(AppError::CannotRemoveSelf);
    }
    if target_role == Role::Owner {
        return Err(AppError::CannotRemoveOwner);
    }
    Ok(())
}

/// A member's role may be changed unless the target is the caller, the
/// target holds the owner role (demotion would strip the workspace of its
/// owner), or the new role would mint a second owner.
pub fn ensure_role_changeable(
    actor: Uuid,
    target: Uuid,
    current_role: Role,
    new_role: Role,
) -> Result<(), AppError> {
    if actor == target {
        return Err(AppError::CannotChangeOwnRole);
    }
    if current_role == Role::Owner {
        return Err(AppError::CannotRemoveOwner);
    }
    if new_role == Role::Owner {
        return Err(AppError::Validation(
            "ownership cannot be granted; transfer is not supported".to_string(),
        ));
    }
    Ok(())
}

/// Invitations grant editor or viewer; the owner role is fixed at creation.
pub fn ensure_invitable(role: Role) -> Result<(), AppError> {
    if role == Role::Owner {
        return Err(AppError::Validation(
            "cannot invite a member as owner".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_remove_self() {
        let user = Uuid::new_v4();
        for role in [Role::Viewer, Role::Editor, Role::Owner] {
            let err = ensure_member_removable(user, user, role).unwrap_err();
            assert!(matches!(err, AppError::CannotRemoveSelf), "{role}");
        }
    }

    #[test]
    fn cannot_remove_owner() {
        let err =
            ensure_member_removable(Uuid::new_v4(), Uuid::new_v4(), Role::Owner).unwrap_err();
        assert!(matches!(err, AppError::CannotRemoveOwner));
    }

    #[test]
    fn can_remove_other_non_owner() {
        for role in [Role::Viewer, Role::Editor] {
            assert!(ensure_member_removable(Uuid::new_v4(), Uuid::new_v4(), role).is_ok());
        }
    }

    #[test]
    fn cannot_change_own_role() {
        let user = Uuid::new_v4();
        let err = ensure_role_changeable(user, user, Role::Editor, Role::Viewer).unwrap_err();
        assert!(matches!(err, AppError::CannotChangeOwnRole));
    }

    #[test]
    fn cannot_demote_owner() {
        let err = ensure_role_changeable(Uuid::new_v4(), Uuid::new_v4(), Role::Owner, Role::Editor)
            .unwrap_err();
        assert!(matches!(err, AppError::CannotRemoveOwner));
    }

    #[test]
    fn cannot_promote_to_owner() {
        let err = ensure_role_changeable(Uuid::new_v4(), Uuid::new_v4(), Role::Viewer, Role::Owner)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn can_change_between_editor_and_viewer() {
        assert!(
            ensure_role_changeable(Uuid::new_v4(), Uuid::new_v4(), Role::Viewer, Role::Editor)
                .is_ok()
        );
        assert!(
            ensure_role_changeable(Uuid::new_v4(), Uuid::new_v4(), Role::Editor, Role::Viewer)
                .is_ok()
        );
    }

    #[test]
    fn invitations_exclude_owner() {
        assert!(ensure_invitable(Role::Viewer).is_ok());
        assert!(ensure_invitable(Role::Editor).is_ok());
        assert!(ensure_invitable(Role::Owner).is_err());
    }
}
