/// HTTP-level integration tests for the Trellis API
///
/// Require a running PostgreSQL database; see `common`.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use common::TestContext;
use serde_json::json;
use trellis_shared::services::analysis::{
    ProjectAnalysis, ProjectSnapshot, Sentiment, Summarizer, SummarizerError,
};

#[tokio::test]
async fn test_health_check() {
    let Some(ctx) = TestContext::new().await else { return };

    let (status, body) = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_register_and_login() {
    let Some(ctx) = TestContext::new().await else { return };

    let user = ctx.register("ada").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": user.email.to_uppercase(), "password": common::TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 300);
    assert!(body["user"]["password_hash"].is_null());

    let (status, me) = ctx.get("/v1/users/me", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user.id.to_string());
    assert_eq!(me["email"], user.email);
}

#[tokio::test]
async fn test_register_rejections() {
    let Some(ctx) = TestContext::new().await else { return };

    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": common::TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "email");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "email": "weak@example.com", "password": "onlyletters" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "password");

    let user = ctx.register("dup").await;
    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "email": user.email, "password": common::TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": user.email, "password": "wrong-password-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let Some(ctx) = TestContext::new().await else { return };

    let (status, _) = ctx.send(Method::GET, "/v1/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(Method::GET, "/v1/projects", Some("Bearer not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(Method::GET, "/v1/projects", Some("Basic dXNlcjpwYXNz"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invite_scenario_over_http() {
    let Some(ctx) = TestContext::new().await else { return };

    let alice = ctx.register("alice").await;
    let bob = ctx.register("bob").await;
    let carol = ctx.register("carol").await;

    let project_id = ctx.create_project(&alice, "Apollo").await;
    let members_uri = format!("/v1/projects/{}/members", project_id);

    let (status, _) = ctx
        .post(&members_uri, &alice, json!({ "email": bob.email, "role": "member" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .post(&members_uri, &bob, json!({ "email": carol.email }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = ctx
        .post(&members_uri, &alice, json!({ "email": carol.email }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ctx
        .post(&members_uri, &alice, json!({ "email": carol.email }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, inbox) = ctx.get("/v1/notifications", &carol).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["title"], "Added to project");

    let (_, members) = ctx.get(&members_uri, &bob).await;
    assert_eq!(members.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_member_removal_over_http() {
    let Some(ctx) = TestContext::new().await else { return };

    let alice = ctx.register("alice").await;
    let bob = ctx.register("bob").await;
    let project_id = ctx.create_project(&alice, "Removal").await;
    let members_uri = format!("/v1/projects/{}/members", project_id);

    let (_, membership) = ctx.post(&members_uri, &alice, json!({ "email": bob.email })).await;
    let bob_membership = membership["id"].as_str().unwrap().to_string();

    let (_, members) = ctx.get(&members_uri, &alice).await;
    let alice_membership = members
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["user_id"] == alice.id.to_string())
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = ctx
        .send(
            Method::DELETE,
            &format!("{}/{}", members_uri, alice_membership),
            Some(&alice.bearer()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("{}/{}", members_uri, bob_membership),
            Some(&alice.bearer()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&format!("/v1/projects/{}", project_id), &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, count) = ctx.get("/v1/notifications/unread-count", &bob).await;
    assert_eq!(count["unread"], 1);
}

#[tokio::test]
async fn test_task_lifecycle_over_http() {
    let Some(ctx) = TestContext::new().await else { return };

    let alice = ctx.register("alice").await;
    let bob = ctx.register("bob").await;
    let project_id = ctx.create_project(&alice, "Lifecycle").await;

    ctx.post(
        &format!("/v1/projects/{}/members", project_id),
        &alice,
        json!({ "email": bob.email }),
    )
    .await;

    let (status, body) = ctx
        .post(
            &format!("/v1/projects/{}/tasks", project_id),
            &alice,
            json!({ "title": "", "story_points": -1 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);

    let (status, body) = ctx
        .post(
            &format!("/v1/projects/{}/tasks", project_id),
            &alice,
            json!({ "title": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "title");

    let (status, task) = ctx
        .post(
            &format!("/v1/projects/{}/tasks", project_id),
            &alice,
            json!({ "title": "Write launch checklist", "priority": "high", "assignee_id": bob.id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    assert_eq!(task["status"], "pending");
    assert!(task["completed_at"].is_null());
    let task_uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());

    let (_, count) = ctx.get("/v1/notifications/unread-count", &bob).await;
    assert_eq!(count["unread"], 2);

    let (status, done) = ctx
        .send(Method::PATCH, &task_uri, Some(&bob.bearer()), Some(json!({ "status": "done" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(done["completed_at"].is_string());

    let (_, reopened) = ctx
        .send(
            Method::PATCH,
            &task_uri,
            Some(&bob.bearer()),
            Some(json!({ "status": "in-progress", "assignee_id": null })),
        )
        .await;
    assert_eq!(reopened["status"], "in-progress");
    assert!(reopened["completed_at"].is_null());
    assert!(reopened["assignee_id"].is_null());

    let (status, body) = ctx
        .send(Method::PATCH, &task_uri, Some(&bob.bearer()), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (_, assigned) = ctx.get("/v1/tasks/assigned", &bob).await;
    assert!(assigned.as_array().unwrap().is_empty());

    let (status, _) = ctx
        .send(Method::DELETE, &task_uri, Some(&alice.bearer()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = ctx.get(&task_uri, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_notification_endpoints() {
    let Some(ctx) = TestContext::new().await else { return };

    let alice = ctx.register("alice").await;
    let bob = ctx.register("bob").await;

    for name in ["One", "Two"] {
        let project_id = ctx.create_project(&alice, name).await;
        ctx.post(
            &format!("/v1/projects/{}/members", project_id),
            &alice,
            json!({ "email": bob.email }),
        )
        .await;
    }

    let (_, inbox) = ctx.get("/v1/notifications?limit=1", &bob).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    let newest = inbox[0]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/v1/notifications/{}/read", newest),
            Some(&alice.bearer()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, count) = ctx.get("/v1/notifications/unread-count", &bob).await;
    assert_eq!(count["unread"], 2);

    ctx.send(
        Method::POST,
        &format!("/v1/notifications/{}/read", newest),
        Some(&bob.bearer()),
        None,
    )
    .await;
    let (_, count) = ctx.get("/v1/notifications/unread-count", &bob).await;
    assert_eq!(count["unread"], 1);

    let (status, body) = ctx
        .send(Method::POST, "/v1/notifications/read-all", Some(&bob.bearer()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);
}

#[tokio::test]
async fn test_project_update_and_delete() {
    let Some(ctx) = TestContext::new().await else { return };

    let alice = ctx.register("alice").await;
    let bob = ctx.register("bob").await;
    let project_id = ctx.create_project(&alice, "Editable").await;
    let project_uri = format!("/v1/projects/{}", project_id);

    ctx.post(&format!("{}/members", project_uri), &alice, json!({ "email": bob.email }))
        .await;

    let (status, _) = ctx
        .send(Method::PUT, &project_uri, Some(&bob.bearer()), Some(json!({ "name": "Mine" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, project) = ctx
        .send(
            Method::PUT,
            &project_uri,
            Some(&alice.bearer()),
            Some(json!({ "name": "Edited", "description": "Now with scope" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["name"], "Edited");
    assert_eq!(project["description"], "Now with scope");

    let (status, _) = ctx
        .send(Method::DELETE, &project_uri, Some(&bob.bearer()), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(Method::DELETE, &project_uri, Some(&alice.bearer()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&project_uri, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

struct SteadySummarizer;

#[async_trait]
impl Summarizer for SteadySummarizer {
    fn name(&self) -> &str {
        "steady"
    }

    async fn summarize(
        &self,
        snapshot: &ProjectSnapshot,
    ) -> Result<ProjectAnalysis, SummarizerError> {
        Ok(ProjectAnalysis {
            summary: format!("{} is steady", snapshot.project_name),
            recommendations: vec!["Keep shipping".to_string()],
            risk_score: 20,
            performance_score: 80,
            sentiment: Sentiment::Neutral,
        })
    }
}

#[tokio::test]
async fn test_analysis_endpoint() {
    let Some(ctx) = TestContext::with_summarizer(Some(Arc::new(SteadySummarizer))).await else {
        return;
    };

    let alice = ctx.register("alice").await;
    let project_id = ctx.create_project(&alice, "Analyzed").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/v1/projects/{}/analyze", project_id),
            Some(&alice.bearer()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["summary"], "Analyzed is steady");
    assert_eq!(body["sentiment"], "neutral");
}

#[tokio::test]
async fn test_analysis_unavailable_without_summarizer() {
    let Some(ctx) = TestContext::new().await else { return };

    let alice = ctx.register("alice").await;
    let project_id = ctx.create_project(&alice, "Unanalyzed").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/v1/projects/{}/analyze", project_id),
            Some(&alice.bearer()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");
}
