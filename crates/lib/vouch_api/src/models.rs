//! Request and response bodies.
//!
//! Field names are camelCase on the wire, except the client credentials
//! used by the OAuth2 code exchange, which follow OAuth2 naming.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vouch_core::models::auth::{Role, User};
use vouch_core::models::client::{Client, ClientStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
    #[serde(default, alias = "client_id")]
    pub client_id: Option<String>,
    #[serde(default, alias = "redirect_uri")]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectResponse {
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Which sessions a logout ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutScope {
    #[default]
    Single,
    All,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default, rename = "type")]
    pub scope: LogoutScope,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub device_label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct IntrospectRequest {
    pub token: String,
}

/// Query of `POST /api/callback`.
#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    #[serde(default)]
    pub code: Option<String>,
}

/// Body of `POST /api/callback`. Missing fields read as empty and fail
/// client authentication.
#[derive(Debug, Default, Deserialize)]
pub struct ClientCredentials {
    #[serde(default, alias = "clientId")]
    pub client_id: String,
    #[serde(default, alias = "clientSecret")]
    pub client_secret: String,
}

/// Query of `GET /auth/linkedin`.
#[derive(Debug, Default, Deserialize)]
pub struct FederatedStartQuery {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Query of `GET /auth/linkedin/callback`.
#[derive(Debug, Deserialize)]
pub struct FederatedCallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub status_reason: Option<String>,
    pub linkedin_id: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            status_reason: user.status_reason,
            linkedin_id: user.linkedin_id,
            profile_picture: user.profile_picture,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub is_active: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(alias = "redirect_uri")]
    pub redirect_uri: String,
    #[serde(default, alias = "allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// Returned once at client creation; the secret is never shown again.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedClientResponse {
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub client_id: String,
    pub name: String,
    pub redirect_uri: String,
    pub allowed_origins: Vec<String>,
    pub status: String,
    pub created_at: String,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            client_id: client.client_id,
            name: client.name,
            redirect_uri: client.redirect_uri,
            allowed_origins: client.allowed_origins,
            status: client.status.to_string(),
            created_at: client.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientListResponse {
    pub clients: Vec<ClientResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SetClientStatusRequest {
    pub status: String,
}

impl SetClientStatusRequest {
    pub fn parse(&self) -> Result<ClientStatus, vouch_core::auth::AuthError> {
        self.status.parse()
    }
}
