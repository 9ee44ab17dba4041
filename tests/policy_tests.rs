use todo_portal::models::{Todo, User};
use todo_portal::policy::{self, Role};

// --- Builders ---

fn user(id: i64, role: &str) -> User {
    User {
        id,
        name: format!("user-{}", id),
        email: format!("user{}@example.com", id),
        role: role.to_string(),
        ..Default::default()
    }
}

fn todo(id: i64, owner: i64) -> Todo {
    Todo {
        id,
        user_id: owner,
        title: "a todo".to_string(),
        ..Default::default()
    }
}

// --- Role parsing ---

#[test]
fn role_parse_accepts_only_known_roles() {
    assert_eq!(Role::parse("user"), Some(Role::User));
    assert_eq!(Role::parse("admin"), Some(Role::Admin));
    assert_eq!(Role::parse("superuser"), None);
    assert_eq!(Role::parse("Admin"), None);
    assert_eq!(Role::parse(""), None);
}

#[test]
fn unknown_stored_role_degrades_to_user() {
    // A corrupted role column must never grant admin access.
    let actor = user(1, "root");
    assert_eq!(actor.role(), Role::User);
    assert!(policy::require_admin(&actor).is_err());
}

// --- Todo access ---

#[test]
fn owner_can_access_own_todo() {
    let actor = user(1, "user");
    assert!(policy::can_access_todo(&actor, &todo(10, 1)));
}

#[test]
fn non_admin_cannot_access_other_users_todo() {
    // For all non-admin U and todos T with T.user_id != U.id: denied.
    let actor = user(1, "user");
    for owner in [2, 3, 99] {
        assert!(!policy::can_access_todo(&actor, &todo(10, owner)));
    }
}

#[test]
fn admin_can_access_any_todo() {
    let admin = user(1, "admin");
    for owner in [1, 2, 3, 99] {
        assert!(policy::can_access_todo(&admin, &todo(10, owner)));
    }
}

// --- Profile management ---

#[test]
fn profile_management_is_self_only() {
    let actor = user(5, "user");
    assert!(policy::can_manage_profile(&actor, 5));
    assert!(!policy::can_manage_profile(&actor, 6));
}

#[test]
fn admins_get_no_exception_for_other_profiles() {
    // Admins manage other accounts via role assignment only; the self-service
    // profile routes treat them like everyone else.
    let admin = user(1, "admin");
    assert!(policy::can_manage_profile(&admin, 1));
    assert!(!policy::can_manage_profile(&admin, 2));
}

// --- Admin gate ---

#[test]
fn require_admin_rejects_regular_users() {
    assert!(policy::require_admin(&user(1, "user")).is_err());
    assert!(policy::require_admin(&user(1, "admin")).is_ok());
}
