use secrecy::{ExposeSecret, SecretString};
use std::{env, fmt};

#[derive(Clone)]
pub struct Credentials {
    // AWS_ACCESS_KEY_ID
    key: String,
    // AWS_SECRET_ACCESS_KEY
    secret: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(access: &str, secret: &SecretString) -> Self {
        Self {
            key: access.to_string(),
            secret: secret.clone(),
        }
    }

    /// Keys passed explicitly win, the environment fills the gaps.
    #[must_use]
    pub fn from_env_or(access: &str, secret: &str) -> Self {
        let key = if access.is_empty() {
            env::var("AWS_ACCESS_KEY_ID").unwrap_or_default()
        } else {
            access.to_string()
        };

        let secret = if secret.is_empty() {
            env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default()
        } else {
            secret.to_string()
        };

        Self {
            key,
            secret: SecretString::from(secret),
        }
    }

    /// Get a reference to the access key ID.
    #[must_use]
    pub fn aws_access_key_id(&self) -> &str {
        &self.key
    }

    /// Get a reference to the secret access key.
    #[must_use]
    pub fn aws_secret_access_key(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
