use super::*;
use cg_core::Unique;
use cg_listings::Difficulty;
use serde::Deserialize;
use serde::Serialize;
use std::time::UNIX_EPOCH;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub security_question: String,
    pub security_answer: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub username: String,
    pub display_name: String,
    pub security_answer: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    pub username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub security_question: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub security_question: Option<String>,
    pub security_answer: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub created_at: u64,
    pub games_played: i64,
    pub favorite_difficulty: Option<Difficulty>,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            username: user.username().to_string(),
            display_name: user.display_name().to_string(),
            created_at: user
                .created_at()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            games_played: user.games_played(),
            favorite_difficulty: user.favorite_difficulty(),
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Profile,
}
