use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{patch::Patch, users::repo_types::User};

/// Request body for signup and signin.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub nickname: Patch<String>,
    #[serde(default)]
    pub password: Patch<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub account: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            account: u.account,
            nickname: u.nickname,
            is_admin: u.is_admin,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
