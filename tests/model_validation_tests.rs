use todo_portal::error::ApiError;
use todo_portal::models::{
    AssignRoleRequest, CreateTodoRequest, RegisterRequest, UpdateTodoRequest, UpdateUserRequest,
    User,
};
use todo_portal::policy::Role;

fn validation_fields(err: ApiError) -> Vec<String> {
    match err {
        ApiError::Validation { errors, .. } => errors.keys().cloned().collect(),
        other => panic!("expected a validation error, got {:?}", other),
    }
}

// --- Registration validation ---

#[test]
fn register_rejects_missing_and_malformed_fields() {
    let payload = RegisterRequest {
        name: "  ".to_string(),
        email: "not-an-email".to_string(),
        password: "short".to_string(),
    };

    let fields = validation_fields(payload.validate().unwrap_err());
    assert_eq!(fields, vec!["email", "name", "password"]);
}

#[test]
fn register_accepts_valid_payload() {
    let payload = RegisterRequest {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "password123".to_string(),
    };
    assert!(payload.validate().is_ok());
}

#[test]
fn register_password_boundary_is_eight_characters() {
    let mut payload = RegisterRequest {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "1234567".to_string(),
    };
    assert!(payload.validate().is_err());

    payload.password = "12345678".to_string();
    assert!(payload.validate().is_ok());
}

// --- Todo validation ---

#[test]
fn todo_title_boundary_is_255_characters() {
    let ok = CreateTodoRequest {
        title: "a".repeat(255),
        description: None,
    };
    assert!(ok.validate().is_ok());

    let too_long = CreateTodoRequest {
        title: "a".repeat(256),
        description: None,
    };
    assert_eq!(
        validation_fields(too_long.validate().unwrap_err()),
        vec!["title"]
    );
}

#[test]
fn todo_title_is_required() {
    let payload = CreateTodoRequest {
        title: "".to_string(),
        description: Some("details".to_string()),
    };
    assert!(payload.validate().is_err());
}

#[test]
fn todo_update_allows_empty_payload_but_not_blank_title() {
    let empty = UpdateTodoRequest::default();
    assert!(empty.validate().is_ok());

    let blank_title = UpdateTodoRequest {
        title: Some("   ".to_string()),
        ..Default::default()
    };
    assert!(blank_title.validate().is_err());
}

#[test]
fn create_todo_payload_has_no_owner_field() {
    // A user_id smuggled into the body must be ignored: the payload type
    // simply has nowhere to put it.
    let payload: CreateTodoRequest = serde_json::from_value(serde_json::json!({
        "title": "X",
        "user_id": 999,
    }))
    .unwrap();
    assert_eq!(payload.title, "X");
}

// --- Partial update payloads ---

#[test]
fn update_payloads_omit_absent_fields_when_serialized() {
    let partial = UpdateUserRequest {
        name: Some("New Name".to_string()),
        ..Default::default()
    };
    let json = serde_json::to_string(&partial).unwrap();
    assert!(json.contains(r#""name":"New Name""#));
    assert!(!json.contains("email"));
    assert!(!json.contains("password"));
}

#[test]
fn update_user_validates_only_supplied_fields() {
    let payload = UpdateUserRequest {
        password: Some("short".to_string()),
        ..Default::default()
    };
    assert_eq!(
        validation_fields(payload.validate().unwrap_err()),
        vec!["password"]
    );
}

// --- Role assignment ---

#[test]
fn assign_role_accepts_only_user_or_admin() {
    let ok = AssignRoleRequest {
        role: "admin".to_string(),
    };
    assert_eq!(ok.validate().unwrap(), Role::Admin);

    let bad = AssignRoleRequest {
        role: "root".to_string(),
    };
    assert_eq!(validation_fields(bad.validate().unwrap_err()), vec!["role"]);
}

// --- Serialization safety ---

#[test]
fn password_hash_never_serializes() {
    let user = User {
        id: 1,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        role: "user".to_string(),
        ..Default::default()
    };

    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["email"], "alice@example.com");
}

// --- Error mapping ---

#[test]
fn row_not_found_maps_to_not_found() {
    let err: ApiError = sqlx::Error::RowNotFound.into();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn validation_error_body_carries_field_map() {
    let err = ApiError::validation("email", "The email has already been taken.");
    match err {
        ApiError::Validation { message, errors } => {
            assert_eq!(message, "The given data was invalid.");
            assert_eq!(
                errors["email"],
                vec!["The email has already been taken.".to_string()]
            );
        }
        other => panic!("unexpected variant: {:?}", other),
    }
}
