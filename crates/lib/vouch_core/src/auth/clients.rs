//! Third-party client registry.
//!
//! The client secret is generated here, returned once in plaintext, and
//! stored only as a SHA-256 digest compared in constant time.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use super::AuthError;
use super::tokens::{generate_alphanumeric, generate_token, hash_token, verify_token_hash};
use crate::models::client::{Client, ClientStatus, NewClient};
use crate::store::{ClientRepo, Store};

/// Length of generated public client identifiers.
const CLIENT_ID_LEN: usize = 24;

/// A client together with its one-time plaintext secret.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client: Client,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct ClientRegistry {
    store: Arc<dyn Store>,
}

impl ClientRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a client. The returned secret is never retrievable again.
    pub async fn register(
        &self,
        name: &str,
        redirect_uri: &str,
        allowed_origins: Vec<String>,
    ) -> Result<RegisteredClient, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("client name is required".into()));
        }
        validate_http_url(redirect_uri, "redirect_uri")?;
        for origin in &allowed_origins {
            validate_http_url(origin, "allowed origin")?;
        }

        let client_secret = generate_token();
        let client = self
            .store
            .create_client(NewClient {
                client_id: generate_alphanumeric(CLIENT_ID_LEN),
                name: name.to_string(),
                client_secret_hash: hash_token(&client_secret),
                redirect_uri: redirect_uri.to_string(),
                allowed_origins,
            })
            .await?;

        info!(client_id = %client.client_id, name = %client.name, "registered client");
        Ok(RegisteredClient {
            client,
            client_secret,
        })
    }

    pub async fn list(&self) -> Result<Vec<Client>, AuthError> {
        Ok(self.store.list_clients().await?)
    }

    pub async fn set_status(
        &self,
        client_id: &str,
        status: ClientStatus,
    ) -> Result<Client, AuthError> {
        let client = self
            .store
            .set_client_status(client_id, status)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("client '{client_id}'")))?;
        info!(client_id, status = %status, "client status changed");
        Ok(client)
    }

    /// Browser origins registered by active clients, serialized as
    /// `scheme://host[:port]`.
    pub async fn allowed_origins(&self) -> Result<HashSet<String>, AuthError> {
        let clients = self.store.list_clients().await?;
        Ok(clients
            .iter()
            .filter(|c| c.status == ClientStatus::Active)
            .flat_map(|c| c.allowed_origins.iter())
            .filter_map(|raw| origin_of(raw))
            .collect())
    }

    /// Look up an active client, failing with `InvalidClient` otherwise.
    pub async fn find_active(&self, client_id: &str) -> Result<Client, AuthError> {
        match self.store.find_client(client_id).await? {
            Some(client) if client.status == ClientStatus::Active => Ok(client),
            Some(_) => {
                warn!(client_id, "inactive client rejected");
                Err(AuthError::InvalidClient)
            }
            None => Err(AuthError::InvalidClient),
        }
    }

    /// Authenticate a client by id and secret.
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Client, AuthError> {
        let client = self.find_active(client_id).await?;
        if !verify_token_hash(client_secret, &client.client_secret_hash) {
            warn!(client_id, "client secret mismatch");
            return Err(AuthError::InvalidClient);
        }
        Ok(client)
    }
}

/// The serialized origin of `raw`, or `None` for opaque or unparsable URLs.
pub fn origin_of(raw: &str) -> Option<String> {
    let origin = Url::parse(raw).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

fn validate_http_url(raw: &str, what: &str) -> Result<Url, AuthError> {
    let url = Url::parse(raw)
        .map_err(|e| AuthError::Validation(format!("{what} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AuthError::Validation(format!(
            "{what} must use http or https"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;

    #[tokio::test]
    async fn secret_is_returned_once_and_stored_hashed() {
        let env = TestEnv::new();
        let registered = env
            .authority
            .clients
            .register("Acme", "https://acme.example/callback", vec![])
            .await
            .unwrap();

        assert_eq!(registered.client.client_id.len(), CLIENT_ID_LEN);
        assert_ne!(registered.client.client_secret_hash, registered.client_secret);
        assert_eq!(
            registered.client.client_secret_hash,
            hash_token(&registered.client_secret)
        );

        let listed = env.authority.clients.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].client_id, registered.client.client_id);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let env = TestEnv::new();
        let clients = &env.authority.clients;
        clients
            .register("Acme", "https://acme.example/cb", vec![])
            .await
            .unwrap();
        let err = clients
            .register("Acme", "https://other.example/cb", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn bad_redirect_uri_is_rejected() {
        let env = TestEnv::new();
        for uri in ["not a url", "ftp://acme.example/cb"] {
            let err = env
                .authority
                .clients
                .register("Acme", uri, vec![])
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn authenticate_checks_secret_and_status() {
        let env = TestEnv::new();
        let clients = &env.authority.clients;
        let registered = clients
            .register("Acme", "https://acme.example/cb", vec![])
            .await
            .unwrap();
        let id = registered.client.client_id.clone();

        assert!(clients.authenticate(&id, &registered.client_secret).await.is_ok());
        assert!(matches!(
            clients.authenticate(&id, "wrong").await,
            Err(AuthError::InvalidClient)
        ));
        assert!(matches!(
            clients.authenticate("nope", &registered.client_secret).await,
            Err(AuthError::InvalidClient)
        ));

        clients.set_status(&id, ClientStatus::Inactive).await.unwrap();
        assert!(matches!(
            clients.authenticate(&id, &registered.client_secret).await,
            Err(AuthError::InvalidClient)
        ));
    }

    #[tokio::test]
    async fn status_change_on_unknown_client_is_not_found() {
        let env = TestEnv::new();
        let err = env
            .authority
            .clients
            .set_status("missing", ClientStatus::Inactive)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn allowed_origins_come_from_active_clients() {
        let env = TestEnv::new();
        let clients = &env.authority.clients;
        clients
            .register(
                "Acme",
                "https://acme.example/cb",
                vec!["https://acme.example/".into(), "http://localhost:5173".into()],
            )
            .await
            .unwrap();
        let globex = clients
            .register("Globex", "https://globex.example/cb", vec!["https://globex.example".into()])
            .await
            .unwrap();
        clients
            .set_status(&globex.client.client_id, ClientStatus::Inactive)
            .await
            .unwrap();

        let origins = clients.allowed_origins().await.unwrap();
        assert_eq!(
            origins,
            HashSet::from(["https://acme.example".to_string(), "http://localhost:5173".to_string()])
        );
    }

    #[test]
    fn origin_drops_path_and_keeps_port() {
        assert_eq!(origin_of("https://a.example:8443/x?y").as_deref(), Some("https://a.example:8443"));
        assert_eq!(origin_of("not a url"), None);
    }
}
