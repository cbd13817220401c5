use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Team,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Team => "team",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

/// An access token as listed by the API. The secret is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Result of creating an access token. `secret` is only ever returned here.
#[derive(Clone)]
pub struct CreatedToken {
    pub secret: String,
    pub token: Token,
}

impl fmt::Debug for CreatedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedToken")
            .field("secret", &"<redacted>")
            .field("token", &self.token)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub plan: Plan,
    #[serde(default)]
    pub limits: HashMap<String, i64>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub(crate) struct CredentialsRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateTokenRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdatePlanRequest {
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
pub(crate) struct MachinePingRequest<'a> {
    pub hostname: &'a str,
    pub os: &'a str,
    pub arch: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct TokenCreateResponse {
    pub token: String,
    pub data: Token,
}

impl From<TokenCreateResponse> for CreatedToken {
    fn from(res: TokenCreateResponse) -> Self {
        Self {
            secret: res.token,
            token: res.data,
        }
    }
}
