//! User directory
//!
//! Thin collaborator over the user table: signup, login and id-to-name
//! lookup. The feed core only ever reads users.

use crate::store::RecipeStore;
use cookbook_common::credentials::{hash_password, verify_password, MIN_PASSWORD_LEN};
use cookbook_common::db::User;
use cookbook_common::{identity, Error, Result};
use std::sync::Arc;
use tracing::info;

const LOGIN_FAILED: &str = "Invalid username or password";

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn RecipeStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    /// Register a new user
    ///
    /// Fails with `InvalidInput` for short passwords and `Conflict` for a
    /// taken username.
    pub async fn signup(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("Username is required".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let user = self
            .store
            .insert_user(username, &hash_password(password))
            .await?;
        info!("User signed up: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Check credentials; unknown user and wrong password look the same
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .store
            .find_user_by_username(username.trim())
            .await?
            .filter(|user| verify_password(password, &user.password_hash))
            .ok_or_else(|| Error::InvalidInput(LOGIN_FAILED.to_string()))?;
        info!("User logged in: {}", user.username);
        Ok(user)
    }

    /// Username for `id`, or the id itself when nobody has it
    pub async fn display_name(&self, id: &str) -> Result<String> {
        let user = self.store.find_user_by_id(&identity::normalize(id)).await?;
        Ok(user.map(|user| user.username).unwrap_or_else(|| id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_store;

    #[tokio::test]
    async fn test_signup_then_login() {
        let store = memory_store().await;
        let users = UserDirectory::new(store.clone());

        let created = users.signup("sampleChef", "secret123").await.unwrap();
        assert_ne!(created.password_hash, "secret123");

        let logged_in = users.login("sampleChef", "secret123").await.unwrap();
        assert_eq!(logged_in.id, created.id);
    }

    #[tokio::test]
    async fn test_signup_rules() {
        let store = memory_store().await;
        let users = UserDirectory::new(store.clone());

        assert!(matches!(
            users.signup("chef", "12345").await,
            Err(Error::InvalidInput(_))
        ));
        users.signup("chef", "123456").await.unwrap();
        assert!(matches!(
            users.signup("chef", "abcdefg").await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = memory_store().await;
        let users = UserDirectory::new(store.clone());
        users.signup("chef", "secret123").await.unwrap();

        let wrong_password = users.login("chef", "nope").await.unwrap_err().to_string();
        let unknown_user = users.login("ghost", "secret123").await.unwrap_err().to_string();
        assert_eq!(wrong_password, unknown_user);
    }

    #[tokio::test]
    async fn test_display_name_echoes_unknown_id() {
        let store = memory_store().await;
        let users = UserDirectory::new(store.clone());
        let chef = users.signup("chef", "secret123").await.unwrap();

        assert_eq!(users.display_name(&chef.id).await.unwrap(), "chef");
        assert_eq!(users.display_name("nobody").await.unwrap(), "nobody");
    }
}
