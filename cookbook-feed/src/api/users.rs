//! User endpoints: signup, login and username lookup

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cookbook_common::db::User;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::feed::FieldIssue;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields present and non-blank, else field issues
    fn require(self) -> ApiResult<(String, String)> {
        let mut issues = Vec::new();
        let username = self.username.filter(|u| !u.trim().is_empty());
        let password = self.password.filter(|p| !p.is_empty());
        if username.is_none() {
            issues.push(FieldIssue::new("username", "username is required"));
        }
        if password.is_none() {
            issues.push(FieldIssue::new("password", "password is required"));
        }
        match (username, password) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(ApiError::Validation(issues)),
        }
    }
}

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub username: String,
}

/// POST /api/v1/user/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let (username, password) = credentials.require()?;
    let user = state.users.signup(&username, &password).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/v1/user/login
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<UserResponse>> {
    let (username, password) = credentials.require()?;
    let user = state.users.login(&username, &password).await?;
    Ok(Json(user.into()))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UsernameResponse>> {
    let username = state.users.display_name(&id).await?;
    Ok(Json(UsernameResponse { username }))
}
