use crate::config::UserConfig;
use crate::core_auth::helper::{is_bcrypt_hash, verify_password};
use log::{debug, error};
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Secret {
    Plain(String),
    Bcrypt(String),
}

/// The configured username → secret table. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: HashMap<String, Secret>,
}

impl Credentials {
    pub fn from_users(users: &[UserConfig]) -> Self {
        let users = users
            .iter()
            .map(|user| {
                let secret = if is_bcrypt_hash(&user.password) {
                    Secret::Bcrypt(user.password.clone())
                } else {
                    Secret::Plain(user.password.clone())
                };
                (user.username.clone(), secret)
            })
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Checks a username/password pair. Unknown users and wrong passwords
    /// are indistinguishable to the caller.
    pub async fn verify(&self, username: &str, password: &str) -> bool {
        match self.users.get(username) {
            Some(Secret::Plain(expected)) => expected == password,
            Some(Secret::Bcrypt(hashed)) => {
                let hashed = hashed.clone();
                let password = password.to_string();
                // bcrypt is deliberately slow, keep it off the reactor threads.
                match tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
                    .await
                {
                    Ok(valid) => valid,
                    Err(e) => {
                        error!("Password verification task failed: {}", e);
                        false
                    }
                }
            }
            None => {
                debug!("Login attempt for unknown user {:?}", username);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, password: &str) -> UserConfig {
        UserConfig {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_plain_credentials() {
        let credentials = Credentials::from_users(&[user("jt", "test")]);
        assert_eq!(credentials.len(), 1);
        assert!(credentials.verify("jt", "test").await);
        assert!(!credentials.verify("jt", "TEST").await);
        assert!(!credentials.verify("JT", "test").await);
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let credentials = Credentials::from_users(&[user("jt", "test")]);
        assert!(!credentials.verify("nobody", "test").await);
        assert!(!credentials.verify("", "").await);
    }

    #[tokio::test]
    async fn test_bcrypt_credentials() {
        let hashed = bcrypt::hash("hunter2", 4).unwrap();
        let credentials = Credentials::from_users(&[user("alice", &hashed)]);
        assert!(credentials.verify("alice", "hunter2").await);
        assert!(!credentials.verify("alice", &hashed).await);
    }
}
