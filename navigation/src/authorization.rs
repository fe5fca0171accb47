use crate::config::AuthorizationConfig;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationToken {
    pub id: String,
    data: String,
}

impl AuthorizationToken {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        AuthorizationToken {
            id: id.into(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}

/// Secrets available to this process, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct VaultManager {
    tokens: HashMap<String, AuthorizationToken>,
}

impl VaultManager {
    pub fn new(tokens: Vec<AuthorizationToken>) -> Self {
        VaultManager {
            tokens: tokens.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&AuthorizationToken> {
        self.tokens.get(id)
    }
}

/// Resolves the credential used to push the menu upstream.
#[derive(Clone, Debug, Default)]
pub struct ApiAuthorization {
    vault: VaultManager,
    legacy_key: Option<String>,
}

impl ApiAuthorization {
    pub const VAULT_KEY: &'static str = "global_navigation";

    pub fn new(vault: VaultManager, legacy_key: Option<String>) -> Self {
        ApiAuthorization { vault, legacy_key }
    }

    pub fn from_config(config: &AuthorizationConfig) -> Self {
        let tokens = config
            .vault
            .iter()
            .map(|entry| AuthorizationToken::new(&entry.id, &entry.data))
            .collect();

        ApiAuthorization::new(VaultManager::new(tokens), config.api_key.clone())
    }

    /// Vault first, then the deprecated `api_key` setting. Not being
    /// configured is a normal answer, not an error.
    pub fn get_authorization(&self) -> Option<String> {
        if let Some(token) = self.vault.get(Self::VAULT_KEY)
            && !token.data().is_empty()
        {
            return Some(token.data().to_string());
        }

        // TODO: drop the api_key fallback once every site stores the key in the vault
        self.legacy_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(String::from)
    }
}
