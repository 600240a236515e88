use crate::{
    error::Result,
    models::{
        qa::{CreateAnswerRequest, CreateQuestionRequest, QuestionListQuery},
        vote::{VoteRequest, VoteTarget},
    },
    services::VoteTally,
    state::AppState,
    utils::middleware::AuthUser,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/questions", get(list_questions).post(create_question))
        .route("/questions/slug/:slug", get(get_question_by_slug))
        .route("/questions/:id", get(get_question))
        .route("/questions/:id/answers", get(list_answers).post(create_answer))
        .route("/questions/:id/vote", post(vote_question))
        .route("/answers/:id/vote", post(vote_answer))
        .route("/answers/:id/accept", post(accept_answer))
        .route("/tags", get(list_tags))
}

async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuestionListQuery>,
) -> Result<Json<Value>> {
    let questions = state.question_service.list_questions(query.filter, query.page);

    Ok(Json(json!({
        "success": true,
        "data": questions
    })))
}

async fn create_question(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateQuestionRequest>,
) -> Result<Json<Value>> {
    request.validate()?;
    let question = state.question_service.create_question(&user, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": question
    })))
}

async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let detail = state.question_service.question_detail(&id)?;

    Ok(Json(json!({
        "success": true,
        "data": detail
    })))
}

async fn get_question_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    let question = state.question_service.get_question_by_slug(&slug)?;
    let detail = state.question_service.question_detail(&question.id)?;

    Ok(Json(json!({
        "success": true,
        "data": detail
    })))
}

async fn list_answers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let answers = state.question_service.answers_of(&id)?;

    Ok(Json(json!({
        "success": true,
        "data": answers
    })))
}

async fn create_answer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<CreateAnswerRequest>,
) -> Result<Json<Value>> {
    let answer = state.question_service.create_answer(&id, &user, &request.content)?;

    Ok(Json(json!({
        "success": true,
        "data": answer
    })))
}

async fn vote_question(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<Value>> {
    let outcome = state
        .vote_ledger
        .cast_vote(&user.id, &VoteTarget::Question(id), request.as_bool()?)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": outcome
    })))
}

async fn vote_answer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<Value>> {
    let target = VoteTarget::Answer(id);
    let outcome = state
        .vote_ledger
        .cast_vote(&user.id, &target, request.as_bool()?)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "change": outcome.change,
            "votes": outcome.votes,
            "upvoters": state.vote_ledger.upvoters(&target),
            "downvoters": state.vote_ledger.downvoters(&target)
        }
    })))
}

async fn accept_answer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let answer = state.question_service.accept_answer(&id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": answer
    })))
}

async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let tags = state.question_service.counted_tags();

    Ok(Json(json!({
        "success": true,
        "data": tags
    })))
}
