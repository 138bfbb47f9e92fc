use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::AppResult,
    state::AppState,
    users::dto::{CredentialsRequest, DeleteUserRequest, MessageResponse, UpdateUserRequest, UserView},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(sign_up))
        .route("/users/signin", post(sign_in))
        .route("/users/query", get(query_all_users))
        .route("/users/update/:id", post(update_user))
        .route("/users/delete/:id", post(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<UserView>> {
    let Json(req) = payload?;
    let user = state.users.sign_up(&req.account, &req.password).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<UserView>> {
    let Json(req) = payload?;
    let user = state.users.sign_in(&req.account, &req.password).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn query_all_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserView>>> {
    let users = state.users.list_all_users().await?;
    info!(count = users.len(), "users queried");
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<UserView>> {
    let Json(req) = payload?;
    info!(
        nickname_set = req.nickname.is_set(),
        password_set = req.password.is_set(),
        "update user"
    );
    let user = state.users.update_user(&id, req.nickname, req.password).await?;
    Ok(Json(user.into()))
}

/// The path id names the operator; the body's `account` names the user that
/// gets deleted.
#[instrument(skip(state, payload))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(req) = payload?;
    state.users.delete_user(&id, &req.account).await?;
    Ok(Json(MessageResponse {
        message: "user deleted",
    }))
}
