//! PostgreSQL store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgConnectOptions;
use uuid::Uuid;

use super::{
    AuthCodeRepo, BlacklistRepo, ClientRepo, RefreshTokenRepo, StoreError, StoreResult, UserRepo,
};
use crate::models::auth::{BlacklistedToken, NewUser, RefreshTokenRecord, Role, User};
use crate::models::client::{AuthorizationCode, Client, ClientStatus, NewClient};

macro_rules! user_query {
    ($tail:literal) => {
        concat!(
            "SELECT id, email, name, password_hash, role, is_active, status_reason, \
             token_version, linkedin_id, profile_picture, created_at, updated_at \
             FROM users ",
            $tail
        )
    };
}

macro_rules! user_returning {
    ($head:literal) => {
        concat!(
            $head,
            " RETURNING id, email, name, password_hash, role, is_active, status_reason, \
             token_version, linkedin_id, profile_picture, created_at, updated_at"
        )
    };
}

macro_rules! client_columns {
    () => {
        "id, client_id, name, client_secret_hash, redirect_uri, allowed_origins, status, created_at"
    };
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    password_hash: Option<String>,
    role: String,
    is_active: bool,
    status_reason: Option<String>,
    token_version: i64,
    linkedin_id: Option<String>,
    profile_picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(decode_error)?,
            is_active: row.is_active,
            status_reason: row.status_reason,
            token_version: row.token_version,
            linkedin_id: row.linkedin_id,
            profile_picture: row.profile_picture,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: Uuid,
    client_id: String,
    name: String,
    client_secret_hash: String,
    redirect_uri: String,
    allowed_origins: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ClientRow> for Client {
    type Error = StoreError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        Ok(Client {
            id: row.id,
            client_id: row.client_id,
            name: row.name,
            client_secret_hash: row.client_secret_hash,
            redirect_uri: row.redirect_uri,
            allowed_origins: row.allowed_origins,
            status: row.status.parse().map_err(decode_error)?,
            created_at: row.created_at,
        })
    }
}

fn decode_error(e: crate::auth::AuthError) -> StoreError {
    StoreError::Db(sqlx::Error::Decode(Box::new(e)))
}

/// Map unique violations to `StoreError::Conflict`.
fn conflict_or_db(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return StoreError::Conflict(format!("{what} already exists"));
    }
    StoreError::Db(e)
}

fn to_user(row: Option<UserRow>) -> StoreResult<Option<User>> {
    row.map(User::try_from).transpose()
}

/// Parse `database_url` and cap every statement on the resulting
/// connections at `statement_timeout`.
pub fn connect_options(
    database_url: &str,
    statement_timeout: Duration,
) -> StoreResult<PgConnectOptions> {
    let options = PgConnectOptions::from_str(database_url)?;
    Ok(options.options([(
        "statement_timeout",
        format!("{}ms", statement_timeout.as_millis()),
    )]))
}

/// Repositories over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepo for PgStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(user_returning!(
            "INSERT INTO users (id, email, name, password_hash, role, linkedin_id, profile_picture) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(Uuid::now_v7())
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(&new_user.linkedin_id)
        .bind(&new_user.profile_picture)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "user"))?;
        row.try_into()
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_query!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        to_user(row)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_query!("WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        to_user(row)
    }

    async fn find_user_by_linkedin_id(&self, linkedin_id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_query!("WHERE linkedin_id = $1"))
            .bind(linkedin_id)
            .fetch_optional(&self.pool)
            .await?;
        to_user(row)
    }

    async fn link_linkedin(
        &self,
        id: Uuid,
        linkedin_id: &str,
        profile_picture: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_returning!(
            "UPDATE users SET linkedin_id = $2, \
             profile_picture = COALESCE($3, profile_picture), updated_at = now() \
             WHERE id = $1"
        ))
        .bind(id)
        .bind(linkedin_id)
        .bind(profile_picture)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "LinkedIn link"))?;
        to_user(row)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(user_query!("ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_returning!(
            "UPDATE users SET role = $2, token_version = token_version + 1, \
             updated_at = now() WHERE id = $1"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        to_user(row)
    }

    async fn set_status(
        &self,
        id: Uuid,
        is_active: bool,
        status_reason: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_returning!(
            "UPDATE users SET \
             token_version = token_version + CASE WHEN is_active AND NOT $2 THEN 1 ELSE 0 END, \
             is_active = $2, status_reason = $3, updated_at = now() WHERE id = $1"
        ))
        .bind(id)
        .bind(is_active)
        .bind(status_reason)
        .fetch_optional(&self.pool)
        .await?;
        to_user(row)
    }

    async fn promote_admin(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_returning!(
            "UPDATE users SET role = 'admin', is_active = TRUE, status_reason = NULL, \
             token_version = token_version + 1, updated_at = now() WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        to_user(row)
    }

    async fn bump_token_version(&self, id: Uuid) -> StoreResult<Option<i64>> {
        let version = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET token_version = token_version + 1, updated_at = now() \
             WHERE id = $1 RETURNING token_version",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(version)
    }

    async fn active_admin_exists(&self) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin' AND is_active)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl RefreshTokenRepo for PgStore {
    async fn store_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, token_hash, user_id, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::now_v7())
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "refresh token"))?;
        Ok(())
    }

    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, bool, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT id, user_id, revoked, expires_at, created_at \
             FROM refresh_tokens \
             WHERE token_hash = $1 \
               AND NOT revoked \
               AND expires_at > now()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(
            |(id, user_id, revoked, expires_at, created_at)| RefreshTokenRecord {
                id,
                user_id,
                token_hash: token_hash.to_string(),
                revoked,
                expires_at,
                created_at,
            },
        ))
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1 AND NOT revoked")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1 AND NOT revoked")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BlacklistRepo for PgStore {
    async fn blacklist_token(&self, entry: BlacklistedToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO blacklisted_tokens (token_hash, user_id, expires_at, device_label) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (token_hash) DO NOTHING",
        )
        .bind(&entry.token_hash)
        .bind(entry.user_id)
        .bind(entry.expires_at)
        .bind(&entry.device_label)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_blacklisted(&self, token_hash: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM blacklisted_tokens WHERE token_hash = $1)",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn purge_expired_blacklist(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM blacklisted_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ClientRepo for PgStore {
    async fn create_client(&self, new_client: NewClient) -> StoreResult<Client> {
        let row = sqlx::query_as::<_, ClientRow>(concat!(
            "INSERT INTO clients (id, client_id, name, client_secret_hash, redirect_uri, allowed_origins) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            client_columns!()
        ))
        .bind(Uuid::now_v7())
        .bind(&new_client.client_id)
        .bind(&new_client.name)
        .bind(&new_client.client_secret_hash)
        .bind(&new_client.redirect_uri)
        .bind(&new_client.allowed_origins)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "client"))?;
        row.try_into()
    }

    async fn find_client(&self, client_id: &str) -> StoreResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(concat!(
            "SELECT ",
            client_columns!(),
            " FROM clients WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Client::try_from).transpose()
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, ClientRow>(concat!(
            "SELECT ",
            client_columns!(),
            " FROM clients ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Client::try_from).collect()
    }

    async fn set_client_status(
        &self,
        client_id: &str,
        status: ClientStatus,
    ) -> StoreResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(concat!(
            "UPDATE clients SET status = $2 WHERE client_id = $1 RETURNING ",
            client_columns!()
        ))
        .bind(client_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Client::try_from).transpose()
    }
}

#[async_trait]
impl AuthCodeRepo for PgStore {
    async fn store_auth_code(&self, code: &AuthorizationCode) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO authorization_codes (code, user_id, client_id, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&code.code)
        .bind(code.user_id)
        .bind(&code.client_id)
        .bind(code.expires_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "authorization code"))?;
        Ok(())
    }

    async fn find_auth_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>> {
        let row = sqlx::query_as::<_, (String, Uuid, String, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT code, user_id, client_id, expires_at, created_at \
             FROM authorization_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(
            |(code, user_id, client_id, expires_at, created_at)| AuthorizationCode {
                code,
                user_id,
                client_id,
                expires_at,
                created_at,
            },
        ))
    }

    async fn consume_auth_code(&self, code: &str, client_id: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM authorization_codes WHERE code = $1 AND client_id = $2")
                .bind(code)
                .bind(client_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired_auth_codes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM authorization_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_options_cap_statement_time() {
        let options =
            connect_options("postgres://vouch@localhost:5432/vouch", Duration::from_secs(5))
                .unwrap();
        assert_eq!(options.get_database(), Some("vouch"));
        assert!(
            options
                .get_options()
                .is_some_and(|o| o.contains("statement_timeout=5000ms"))
        );
    }

    #[test]
    fn connect_options_reject_bad_urls() {
        assert!(connect_options("not a url", Duration::from_secs(5)).is_err());
    }
}
