mod common;

use axum::http::{Method, StatusCode};
use common::{call, test_state, token_for};
use rainbow_qa::routes;
use serde_json::json;

#[tokio::test]
async fn test_health_and_auth_required() {
    let state = test_state().await;
    let app = routes::app(state);

    let (status, body) = call(&app, Method::POST, "/api/news", None, Some(json!({"content": "hi"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");

    let (status, _) = call(&app, Method::GET, "/api/notifications", Some("bad-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_news_post_reply_like_flow() {
    let state = test_state().await;
    let (_, alice) = token_for(&state, "u-alice", "alice");
    let (_, bob) = token_for(&state, "u-bob", "bob");
    let app = routes::app(state);

    let (status, body) = call(&app, Method::POST, "/api/news", Some(&alice), Some(json!({"content": "root post"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let root_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, Method::POST, "/api/news", Some(&alice), Some(json!({"content": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/news/{}/reply", root_id),
        Some(&bob),
        Some(json!({"content": "nice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["parent_id"], root_id.as_str());

    let (_, body) = call(&app, Method::POST, &format!("/api/news/{}/like", root_id), Some(&bob), None).await;
    assert_eq!(body["data"], json!({"liked": true, "likes": 1}));

    let (_, body) = call(&app, Method::GET, &format!("/api/news/{}/interactions", root_id), None, None).await;
    assert_eq!(body["data"], json!({"likes": 1, "comments": 1}));

    let (_, body) = call(&app, Method::GET, &format!("/api/news/{}/likers", root_id), None, None).await;
    assert_eq!(body["data"], json!(["bob"]));

    let (_, body) = call(&app, Method::GET, "/api/news", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/news/{}", root_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(&app, Method::DELETE, &format!("/api/news/{}", root_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 2);
}

#[tokio::test]
async fn test_question_vote_and_accept_flow() {
    let state = test_state().await;
    let (_, asker) = token_for(&state, "u-asker", "asker");
    let (_, helper) = token_for(&state, "u-helper", "helper");
    let app = routes::app(state);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/qa/questions",
        Some(&asker),
        Some(json!({"title": "Why is Send needed?", "content": "Spawned tasks", "tags": ["rust", "tokio"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let question_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["slug"], "why-is-send-needed");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/qa/questions",
        Some(&helper),
        Some(json!({"title": "Why is Send needed?", "content": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(
        &app,
        Method::POST,
        &format!("/api/qa/questions/{}/answers", question_id),
        Some(&helper),
        Some(json!({"content": "Because the task may move between threads"})),
    )
    .await;
    let answer_id = body["data"]["id"].as_str().unwrap().to_string();

    // 赞同、撤销、反对
    let vote_uri = format!("/api/qa/answers/{}/vote", answer_id);
    let (_, body) = call(&app, Method::POST, &vote_uri, Some(&asker), Some(json!({"value": "U"}))).await;
    assert_eq!(body["data"]["votes"], 1);
    assert_eq!(body["data"]["upvoters"], json!(["u-asker"]));
    let (_, body) = call(&app, Method::POST, &vote_uri, Some(&asker), Some(json!({"value": "U"}))).await;
    assert_eq!(body["data"]["votes"], 0);
    let (_, body) = call(&app, Method::POST, &vote_uri, Some(&asker), Some(json!({"value": "D"}))).await;
    assert_eq!(body["data"]["votes"], -1);

    let (status, _) = call(&app, Method::POST, &vote_uri, Some(&asker), Some(json!({"value": "X"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, Method::POST, "/api/qa/answers/missing/vote", Some(&asker), Some(json!({"value": "U"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let accept_uri = format!("/api/qa/answers/{}/accept", answer_id);
    let (status, _) = call(&app, Method::POST, &accept_uri, Some(&helper), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(&app, Method::POST, &accept_uri, Some(&asker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_answer"], true);

    let (_, body) = call(&app, Method::GET, &format!("/api/qa/questions/{}", question_id), None, None).await;
    assert_eq!(body["data"]["question"]["has_answer"], true);
    assert_eq!(body["data"]["answers"][0]["id"], answer_id.as_str());
    assert_eq!(body["data"]["answers"][0]["votes"], -1);

    let (_, body) = call(&app, Method::GET, "/api/qa/questions?filter=answered", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = call(&app, Method::GET, "/api/qa/questions?filter=unanswered", None, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = call(&app, Method::GET, "/api/qa/tags", None, None).await;
    assert_eq!(body["data"][0]["count"], 1);
}

#[tokio::test]
async fn test_notification_and_message_endpoints() {
    let state = test_state().await;
    let (_, alice) = token_for(&state, "u-alice", "alice");
    let (_, bob) = token_for(&state, "u-bob", "bob");
    let app = routes::app(state);

    // 先让 bob 出现在用户镜像里
    let (status, _) = call(&app, Method::GET, "/api/notifications/count", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..2 {
        let (status, _) = call(&app, Method::POST, "/api/notifications/mark-all-read", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, Method::GET, "/api/notifications/count", Some(&alice), None).await;
        assert_eq!(body["data"]["unread"], 0);
    }

    // 评论别人的文章：默认判定下不产生通知
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/notifications/events/article-commented",
        Some(&alice),
        Some(json!({"article_id": "art-1", "owner_id": "u-bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::Value::Null);

    let (status, _) = call(&app, Method::POST, "/api/notifications/missing/read", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, Method::POST, "/api/messages", Some(&alice), Some(json!({"to": "bob", "message": "   "}))).await;
    assert_eq!(body["data"], serde_json::Value::Null);

    let (status, _) = call(&app, Method::POST, "/api/messages", Some(&alice), Some(json!({"to": "nobody", "message": "hi"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::POST, "/api/messages", Some(&alice), Some(json!({"to": "bob", "message": "hi bob"}))).await;
    assert_eq!(status, StatusCode::OK);
    let message_id = body["data"]["message"]["id"].as_str().unwrap().to_string();

    let (_, body) = call(&app, Method::GET, "/api/messages/with/alice", Some(&bob), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app, Method::GET, "/api/messages/recent", Some(&bob), None).await;
    assert_eq!(body["data"]["active"], "alice");

    let (_, body) = call(&app, Method::GET, &format!("/api/messages/{}", message_id), Some(&bob), None).await;
    assert!(body["data"]["message"].as_str().unwrap().contains("hi bob"));
}
