//! The assembled token/session authority.

use std::sync::Arc;

use crate::auth::accounts::AccountService;
use crate::auth::authenticator::{FederatedAuthenticator, PasswordAuthenticator};
use crate::auth::authorization_code::AuthorizationCodeBroker;
use crate::auth::clients::ClientRegistry;
use crate::auth::issuer::TokenIssuer;
use crate::auth::keys::KeyProvider;
use crate::auth::revocation::RevocationRegistry;
use crate::auth::verifier::TokenVerifier;
use crate::config::AuthConfig;
use crate::notify::Notifier;
use crate::store::Store;

/// Every core service wired to one store and one signing key.
///
/// Cheap to clone; the HTTP layer keeps one in its state.
#[derive(Clone)]
pub struct Authority {
    pub store: Arc<dyn Store>,
    pub keys: Arc<KeyProvider>,
    pub issuer: TokenIssuer,
    pub verifier: TokenVerifier,
    pub revocation: RevocationRegistry,
    pub clients: ClientRegistry,
    pub codes: AuthorizationCodeBroker,
    pub passwords: PasswordAuthenticator,
    pub federated: FederatedAuthenticator,
    pub accounts: AccountService,
}

impl Authority {
    pub fn new(
        store: Arc<dyn Store>,
        keys: Arc<KeyProvider>,
        config: &AuthConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let issuer = TokenIssuer::new(Arc::clone(&keys), Arc::clone(&store), config);
        let verifier = TokenVerifier::new(Arc::clone(&keys), Arc::clone(&store), config);
        let revocation = RevocationRegistry::new(Arc::clone(&store));
        let clients = ClientRegistry::new(Arc::clone(&store));
        let codes =
            AuthorizationCodeBroker::new(Arc::clone(&store), clients.clone(), issuer.clone(), config);
        let accounts = AccountService::new(
            Arc::clone(&store),
            issuer.clone(),
            revocation.clone(),
            notifier,
        );

        Self {
            passwords: PasswordAuthenticator::new(Arc::clone(&store)),
            federated: FederatedAuthenticator::new(Arc::clone(&store)),
            store,
            keys,
            issuer,
            verifier,
            revocation,
            clients,
            codes,
            accounts,
        }
    }
}
