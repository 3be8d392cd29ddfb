//! Startup seeding of users and tokens.
//!
//! Records come from the `[bootstrap]` configuration section and are saved
//! through the repositories, so they pass the same validation as records
//! sent over HTTP. Both entities upsert by username, which makes seeding
//! idempotent across restarts.

use tracing::info;
use wimo_auth::{AuthResult, Authenticator};
use wimo_core::{Token, User};

use crate::config::BootstrapConfig;

/// Counts of records written by [`seed`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapStats {
    pub users: usize,
    pub tokens: usize,
}

/// Saves every configured user and token.
///
/// # Errors
///
/// Returns the first repository error; records saved before it stay saved.
pub async fn seed(authenticator: &Authenticator, config: &BootstrapConfig) -> AuthResult<BootstrapStats> {
    let mut stats = BootstrapStats::default();

    for entry in &config.users {
        let user = User {
            fname: entry.fname.clone(),
            pname: entry.pname.clone(),
            age: entry.age,
            ..User::new(&entry.username, &entry.password, &entry.role_group)
        };
        authenticator.users().save(&user).await?;
        stats.users += 1;
    }

    for entry in &config.tokens {
        let token = Token::new(&entry.token, &entry.username);
        authenticator.tokens().save(&token).await?;
        stats.tokens += 1;
    }

    if stats != BootstrapStats::default() {
        info!(users = stats.users, tokens = stats.tokens, "Bootstrap records seeded");
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BootstrapToken, BootstrapUser};
    use wimo_db_memory::create_store;
    use wimo_storage::Persistence;

    fn config() -> BootstrapConfig {
        BootstrapConfig {
            users: vec![BootstrapUser {
                fname: "Ada".into(),
                pname: "Admin".into(),
                age: 36,
                username: "admin".into(),
                password: "1234".into(),
                role_group: "administrator".into(),
            }],
            tokens: vec![BootstrapToken {
                username: "admin".into(),
                token: "873f7688bbe4086ab27a1544122563".into(),
            }],
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let auth = Authenticator::new(Persistence::new(create_store()));

        let first = seed(&auth, &config()).await.unwrap();
        assert_eq!(first, BootstrapStats { users: 1, tokens: 1 });
        seed(&auth, &config()).await.unwrap();

        assert_eq!(auth.users().list().await.unwrap().len(), 1);
        assert_eq!(auth.tokens().list().await.unwrap().len(), 1);

        let admin = auth.users().get_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.fname, "Ada");
        assert_eq!(admin.age, 36);
        assert!(auth.verify("873f7688bbe4086ab27a1544122563").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_config_seeds_nothing() {
        let auth = Authenticator::new(Persistence::new(create_store()));
        let stats = seed(&auth, &BootstrapConfig::default()).await.unwrap();
        assert_eq!(stats, BootstrapStats::default());
    }
}
