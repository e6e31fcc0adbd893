//! 访问审查工作流集成测试
//!
//! 覆盖：快照冻结、revoke_some 精确撤销、revoke_all、
//! 决定与 revoked_roles 的校验、审查只能完成一次

use admin_system::{
    error::AppError,
    models::{
        assignment::AssignRoleRequest,
        review::{CompleteReviewRequest, CreateReviewRequest, ReviewDecision, ReviewStatus},
        role::RoleCategory,
    },
    services::{AssignmentService, AuditService, PermissionService, ReviewService},
};
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::{create_test_admin, create_test_config, create_test_role, unique_name};

struct TestServices {
    assignment: AssignmentService,
    permission: PermissionService,
    review: ReviewService,
}

fn build_services(pool: &sqlx::PgPool) -> TestServices {
    let audit = Arc::new(AuditService::new(pool.clone()));
    TestServices {
        assignment: AssignmentService::new(pool.clone(), audit.clone()),
        permission: PermissionService::new(pool.clone()),
        review: ReviewService::new(pool.clone(), audit),
    }
}

fn open_ended(role_id: Uuid) -> AssignRoleRequest {
    AssignRoleRequest {
        role_id,
        valid_from: None,
        valid_until: None,
        reason: "quarterly grant".to_string(),
    }
}

fn review_request(user_id: Uuid) -> CreateReviewRequest {
    CreateReviewRequest {
        user_id,
        review_period: "2026-Q3".to_string(),
        review_type: "quarterly".to_string(),
    }
}

/// 创建用户并分配 n 个自动批准的角色，返回 (user, assigner, role_ids)
async fn user_with_roles(pool: &sqlx::PgPool, svc: &TestServices, n: usize) -> (Uuid, Uuid, Vec<Uuid>) {
    let user_id = create_test_admin(pool, &unique_name("user")).await;
    let assigner = create_test_admin(pool, &unique_name("assigner")).await;

    let mut role_ids = Vec::new();
    for i in 0..n {
        let role_id =
            create_test_role(pool, &unique_name(&format!("role{}", i)), RoleCategory::Business)
                .await;
        svc.assignment.assign(user_id, open_ended(role_id), assigner).await.unwrap();
        role_ids.push(role_id);
    }

    (user_id, assigner, role_ids)
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_create_review_freezes_role_snapshot() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let (user_id, assigner, role_ids) = user_with_roles(&pool, &svc, 2).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let review = svc.review.create_review(review_request(user_id), reviewer).await.unwrap();

    assert_eq!(review.status, ReviewStatus::Pending);
    assert_eq!(review.roles_reviewed.len(), 2);
    for role_id in &role_ids {
        assert!(review.roles_reviewed.contains(role_id));
    }

    // 快照之后的分配变化不影响已创建的审查
    let late_role =
        create_test_role(&pool, &unique_name("late"), RoleCategory::Business).await;
    svc.assignment.assign(user_id, open_ended(late_role), assigner).await.unwrap();

    let refreshed = svc.review.get_review(review.id).await.unwrap();
    assert_eq!(refreshed.roles_reviewed.len(), 2);
    assert!(!refreshed.roles_reviewed.contains(&late_role));
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_approve_all_leaves_assignments_untouched() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let (user_id, _assigner, _role_ids) = user_with_roles(&pool, &svc, 2).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let review = svc.review.create_review(review_request(user_id), reviewer).await.unwrap();
    let completed = svc
        .review
        .complete_review(
            review.id,
            CompleteReviewRequest {
                decision: ReviewDecision::ApproveAll,
                revoked_roles: None,
                review_notes: Some("all grants justified".to_string()),
            },
            reviewer,
        )
        .await
        .unwrap();

    assert_eq!(completed.status, ReviewStatus::Approved);
    assert!(completed.completed_at.is_some());

    let roles = svc.permission.get_user_roles(user_id, false).await.unwrap();
    assert_eq!(roles.len(), 2);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_revoke_some_revokes_exactly_named_roles() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let (user_id, _assigner, role_ids) = user_with_roles(&pool, &svc, 3).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let review = svc.review.create_review(review_request(user_id), reviewer).await.unwrap();
    let completed = svc
        .review
        .complete_review(
            review.id,
            CompleteReviewRequest {
                decision: ReviewDecision::RevokeSome,
                revoked_roles: Some(vec![role_ids[0]]),
                review_notes: None,
            },
            reviewer,
        )
        .await
        .unwrap();

    assert_eq!(completed.status, ReviewStatus::Revoked);
    assert_eq!(completed.decision, Some(ReviewDecision::RevokeSome));

    // 只有点名的角色被撤销，其余保持有效
    let remaining = svc.permission.get_user_roles(user_id, false).await.unwrap();
    let remaining_ids: Vec<Uuid> = remaining.iter().map(|r| r.role_id).collect();
    assert!(!remaining_ids.contains(&role_ids[0]));
    assert!(remaining_ids.contains(&role_ids[1]));
    assert!(remaining_ids.contains(&role_ids[2]));

    // 被撤销的分配记录了审查人
    let revoked_by: Option<Uuid> = sqlx::query_scalar(
        "SELECT revoked_by FROM user_role_assignments WHERE user_id = $1 AND role_id = $2",
    )
    .bind(user_id)
    .bind(role_ids[0])
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(revoked_by, Some(reviewer));
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_revoke_all_clears_every_reviewed_role() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let (user_id, _assigner, role_ids) = user_with_roles(&pool, &svc, 2).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let review = svc.review.create_review(review_request(user_id), reviewer).await.unwrap();
    svc.review
        .complete_review(
            review.id,
            CompleteReviewRequest {
                decision: ReviewDecision::RevokeAll,
                revoked_roles: Some(role_ids),
                review_notes: Some("offboarding".to_string()),
            },
            reviewer,
        )
        .await
        .unwrap();

    let roles = svc.permission.get_user_roles(user_id, false).await.unwrap();
    assert!(roles.is_empty());
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_revoke_decision_requires_revoked_roles() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let (user_id, _assigner, _role_ids) = user_with_roles(&pool, &svc, 1).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let review = svc.review.create_review(review_request(user_id), reviewer).await.unwrap();

    for decision in [ReviewDecision::RevokeSome, ReviewDecision::RevokeAll] {
        let result = svc
            .review
            .complete_review(
                review.id,
                CompleteReviewRequest { decision, revoked_roles: None, review_notes: None },
                reviewer,
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    // 校验失败不应完成审查
    let refreshed = svc.review.get_review(review.id).await.unwrap();
    assert_eq!(refreshed.status, ReviewStatus::Pending);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_revoked_roles_must_be_subset_of_snapshot() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let (user_id, _assigner, _role_ids) = user_with_roles(&pool, &svc, 1).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let review = svc.review.create_review(review_request(user_id), reviewer).await.unwrap();
    let result = svc
        .review
        .complete_review(
            review.id,
            CompleteReviewRequest {
                decision: ReviewDecision::RevokeSome,
                revoked_roles: Some(vec![Uuid::new_v4()]),
                review_notes: None,
            },
            reviewer,
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_review_completes_exactly_once() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let (user_id, _assigner, _role_ids) = user_with_roles(&pool, &svc, 1).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let review = svc.review.create_review(review_request(user_id), reviewer).await.unwrap();
    svc.review
        .complete_review(
            review.id,
            CompleteReviewRequest {
                decision: ReviewDecision::ApproveAll,
                revoked_roles: None,
                review_notes: None,
            },
            reviewer,
        )
        .await
        .unwrap();

    let again = svc
        .review
        .complete_review(
            review.id,
            CompleteReviewRequest {
                decision: ReviewDecision::ApproveAll,
                revoked_roles: None,
                review_notes: None,
            },
            reviewer,
        )
        .await;

    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_review_requires_effective_roles() {
    let config = create_test_config();
    let pool = common::setup_test_db(&config).await;
    let svc = build_services(&pool);

    let user_id = create_test_admin(&pool, &unique_name("bare-user")).await;
    let reviewer = create_test_admin(&pool, &unique_name("reviewer")).await;

    let no_roles = svc.review.create_review(review_request(user_id), reviewer).await;
    assert!(matches!(no_roles, Err(AppError::Validation(_))));

    let unknown = svc.review.create_review(review_request(Uuid::new_v4()), reviewer).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}
