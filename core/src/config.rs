//! Construction input for `Client`.

use secrecy::SecretString;

use crate::error::{Error, Result};

pub const SITE_VAR: &str = "CONFLUENCE_SITE";
pub const USER_VAR: &str = "CONFLUENCE_USER";
pub const TOKEN_VAR: &str = "CONFLUENCE_TOKEN";

/// Site identifier and credentials for one Confluence Cloud site.
///
/// `site` is the subdomain part of `{site}.atlassian.net`. The token is an
/// Atlassian API token and is redacted from `Debug` output.
#[derive(Debug)]
pub struct ClientConfig {
    pub site: String,
    pub user: String,
    pub token: SecretString,
}

impl ClientConfig {
    pub fn new(site: impl Into<String>, user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            user: user.into(),
            token: SecretString::from(token.into()),
        }
    }

    /// Read `CONFLUENCE_SITE`, `CONFLUENCE_USER` and `CONFLUENCE_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// Like `from_env`, resolving variables through `lookup`. Empty values
    /// count as missing.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.is_empty())
                .ok_or(Error::Config { var })
        };
        Ok(Self::new(require(SITE_VAR)?, require(USER_VAR)?, require(TOKEN_VAR)?))
    }
}
