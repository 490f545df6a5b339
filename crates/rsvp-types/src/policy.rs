//! Role policy. The rank table below is the only place role ordering is
//! defined; everything else goes through these functions.

use crate::models::Role;

pub fn rank(role: Role) -> u8 {
    match role {
        Role::Guest => 0,
        Role::Editor => 1,
        Role::Admin => 2,
    }
}

pub fn has_permission(actual: Role, required: Role) -> bool {
    rank(actual) >= rank(required)
}

/// Editors and admins may change the event details and read the full roster.
pub fn can_edit_event(role: Role) -> bool {
    has_permission(role, Role::Editor)
}

pub fn is_admin(role: Role) -> bool {
    role == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_follows_rank() {
        for actual in Role::ALL {
            for required in Role::ALL {
                assert_eq!(
                    has_permission(actual, required),
                    rank(actual) >= rank(required),
                    "{actual} vs {required}"
                );
            }
        }
        assert!(has_permission(Role::Admin, Role::Guest));
        assert!(!has_permission(Role::Guest, Role::Editor));
    }

    #[test]
    fn rank_agrees_with_derived_order() {
        for a in Role::ALL {
            for b in Role::ALL {
                assert_eq!(a <= b, rank(a) <= rank(b));
            }
        }
    }

    #[test]
    fn event_editing_is_editor_and_up() {
        assert!(!can_edit_event(Role::Guest));
        assert!(can_edit_event(Role::Editor));
        assert!(can_edit_event(Role::Admin));
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(!is_admin(Role::Guest));
        assert!(!is_admin(Role::Editor));
        assert!(is_admin(Role::Admin));
    }
}
