mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};

use common::{bearer, seed_task, seed_team, TestContext};
use project_management::models::TaskStatus;

#[actix_web::test]
async fn members_comment_and_read_comments() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    seed_task(&ctx.store, "t1", "p1", Some("dev"), TaskStatus::Todo, None).await;
    let app = test::init_service(ctx.app()).await;

    for (user, content) in [("dev", "On it"), ("lead", "Thanks")] {
        let req = test::TestRequest::post()
            .uri("/api/comments")
            .insert_header(bearer(user))
            .set_json(json!({ "taskId": "t1", "content": content }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["comment"]["user"]["id"], user);
    }

    for uri in ["/api/comments/t1", "/api/comments?taskId=t1"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer("dev"))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let contents: Vec<&str> = body["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["On it", "Thanks"], "{}", uri);
    }
}

#[actix_web::test]
async fn outsiders_and_empty_comments_are_rejected() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    seed_task(&ctx.store, "t1", "p1", None, TaskStatus::Todo, None).await;
    let app = test::init_service(ctx.app()).await;

    let cases = [
        ("guest", json!({ "taskId": "t1", "content": "Hi" }), StatusCode::FORBIDDEN),
        ("dev", json!({ "taskId": "t1", "content": "   " }), StatusCode::BAD_REQUEST),
        ("dev", json!({ "taskId": "ghost", "content": "Hi" }), StatusCode::NOT_FOUND),
    ];
    for (user, payload, expected) in cases {
        let req = test::TestRequest::post()
            .uri("/api/comments")
            .insert_header(bearer(user))
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected);
    }

    let req = test::TestRequest::get().uri("/api/comments/t1").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn malformed_query_answers_json_error() {
    let ctx = TestContext::new();
    seed_team(&ctx.store).await;
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::get()
        .uri("/api/comments")
        .insert_header(bearer("dev"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("taskId"));
}
