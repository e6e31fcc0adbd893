//! 数据模型与请求校验测试

use admin_system::models::{
    assignment::AssignRoleRequest,
    permission::CreatePermissionRequest,
    review::{CreateReviewRequest, ReviewDecision, ReviewStatus},
    role::{CreateRoleRequest, RoleCategory},
};
use uuid::Uuid;
use validator::Validate;

#[test]
fn test_assign_role_request_requires_reason() {
    let request = AssignRoleRequest {
        role_id: Uuid::new_v4(),
        valid_from: None,
        valid_until: None,
        reason: String::new(),
    };
    assert!(request.validate().is_err());

    let request = AssignRoleRequest { reason: "incident response duty".to_string(), ..request };
    assert!(request.validate().is_ok());
}

#[test]
fn test_create_role_request_name_bounds() {
    let request = CreateRoleRequest {
        name: String::new(),
        category: RoleCategory::Business,
        description: None,
        requires_mfa: false,
        max_session_duration_secs: 28800,
    };
    assert!(request.validate().is_err());

    let request = CreateRoleRequest { name: "a".repeat(65), ..request };
    assert!(request.validate().is_err());

    let request = CreateRoleRequest { name: "billing_admin".to_string(), ..request };
    assert!(request.validate().is_ok());
}

#[test]
fn test_create_permission_request_validation() {
    let request = CreatePermissionRequest {
        name: "billing.refund".to_string(),
        resource: "billing".to_string(),
        action: "refund".to_string(),
        description: None,
        is_dangerous: true,
    };
    assert!(request.validate().is_ok());

    let request = CreatePermissionRequest { resource: String::new(), ..request };
    assert!(request.validate().is_err());
}

#[test]
fn test_create_review_request_period_label() {
    let request = CreateReviewRequest {
        user_id: Uuid::new_v4(),
        review_period: "2026-Q3".to_string(),
        review_type: "quarterly".to_string(),
    };
    assert!(request.validate().is_ok());

    let request = CreateReviewRequest { review_period: String::new(), ..request };
    assert!(request.validate().is_err());
}

#[test]
fn test_role_category_deserializes_from_wire_format() {
    let category: RoleCategory = serde_json::from_str("\"security\"").unwrap();
    assert_eq!(category, RoleCategory::Security);

    let category: RoleCategory = serde_json::from_str("\"business\"").unwrap();
    assert!(category.is_auto_approved());

    assert!(serde_json::from_str::<RoleCategory>("\"superuser\"").is_err());
}

#[test]
fn test_review_enums_wire_format() {
    let decision: ReviewDecision = serde_json::from_str("\"revoke_some\"").unwrap();
    assert_eq!(decision, ReviewDecision::RevokeSome);

    assert_eq!(serde_json::to_string(&ReviewDecision::ApproveAll).unwrap(), "\"approve_all\"");
    assert_eq!(serde_json::to_string(&ReviewStatus::Pending).unwrap(), "\"pending\"");
}
