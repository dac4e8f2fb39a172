use std::env;

use super::error::{CouchDaoError, CouchResult};

const BASE_URL_ENV: &str = "COUCH_BASE_URL";
const DATABASE_ENV: &str = "COUCH_DB";
const USERNAME_ENV: &str = "COUCH_USERNAME";
const PASSWORD_ENV: &str = "COUCH_PASSWORD";
const DEFAULT_DATABASE: &str = "letter_rush_rooms";

/// Where the CouchDB room store lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CouchConfig {
    /// Anonymous access to `database` on `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
        }
    }

    /// Use basic auth for every request.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read `COUCH_BASE_URL`, then the optional database name and credentials.
    ///
    /// Credentials are only used when both the username and password are set.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = env::var(BASE_URL_ENV)
            .map_err(|_| CouchDaoError::MissingEnvVar { var: BASE_URL_ENV })?;
        let database = env::var(DATABASE_ENV)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let config = Self::new(base_url, database);
        Ok(
            match (env::var(USERNAME_ENV).ok(), env::var(PASSWORD_ENV).ok()) {
                (Some(username), Some(password)) => config.with_credentials(username, password),
                _ => config,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_optional() {
        let config = CouchConfig::new("http://localhost:5984", DEFAULT_DATABASE);
        assert!(config.username.is_none());

        let config = config.with_credentials("admin", "pw");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.database, "letter_rush_rooms");
    }
}
