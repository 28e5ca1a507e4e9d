//! Route paths.

pub const POST_AUTH_AUTHENTICATE: &str = "/auth/authenticate";
pub const POST_AUTH_REGISTER: &str = "/auth/register";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const GET_AUTH_ME: &str = "/auth/me";
pub const POST_AUTH_PASSWORD: &str = "/auth/password";
pub const POST_AUTH_INTROSPECT: &str = "/auth/introspect";
pub const GET_AUTH_JWKS: &str = "/auth/jwks";
pub const GET_AUTH_LINKEDIN: &str = "/auth/linkedin";
pub const GET_AUTH_LINKEDIN_CALLBACK: &str = "/auth/linkedin/callback";
pub const POST_API_CALLBACK: &str = "/api/callback";
pub const GET_USERS: &str = "/users";
pub const PATCH_USERS_ID_ROLE: &str = "/users/{id}/role";
pub const PATCH_USERS_ID_STATUS: &str = "/users/{id}/status";
pub const CLIENTS: &str = "/clients";
pub const PATCH_CLIENTS_ID_STATUS: &str = "/clients/{client_id}/status";
