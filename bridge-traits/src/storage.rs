//! Credential Storage Abstraction

use async_trait::async_trait;

use crate::error::{BridgeError, Result};

/// Secure credential storage trait
///
/// Abstracts platform-specific secure storage:
/// - iOS/macOS: Keychain
/// - Android: Keystore
/// - Windows: Credential Manager
/// - Linux: Secret Service
///
/// The session layer keeps the access and refresh tokens here so a relaunch
/// can skip the login screen.
///
/// # Security
///
/// Implementations must never log stored values.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn remember(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_string("accessToken", token).await
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }

    /// List all secret keys (without values)
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all secrets
    async fn clear_all(&self) -> Result<()>;

    /// Store a UTF-8 string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_secret(key, value.as_bytes()).await
    }

    /// Retrieve a UTF-8 string value
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get_secret(key).await? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                BridgeError::Storage(format!("Stored value for {} is not UTF-8: {}", key, e))
            }),
            None => Ok(None),
        }
    }
}
