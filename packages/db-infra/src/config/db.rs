use std::collections::HashMap;
use std::env::{self, VarError};
use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::DbInfraError;
use crate::infra::db::core::sanitize_db_url;

/// Collection holding the bootstrap marker document.
pub const MARKER_COLLECTION: &str = "my_init";
/// Database the engine requires as context before user management calls.
pub const ADMIN_DB: &str = "admin";
pub const DEFAULT_MONGO_URI: &str = "mongodb://127.0.0.1:27017";

// Userinfo characters left unescaped (RFC 3986 unreserved).
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Snapshot of the set variables among `names`. A value that is not valid
/// UTF-8 is an error rather than a silent fallback to the default.
fn read_env(names: &[&'static str]) -> Result<HashMap<&'static str, String>, DbInfraError> {
    let mut vars = HashMap::new();
    for &name in names {
        match env::var(name) {
            Ok(value) => {
                vars.insert(name, value);
            }
            Err(VarError::NotPresent) => {}
            Err(VarError::NotUnicode(_)) => {
                return Err(DbInfraError::config(format!(
                    "environment variable '{name}' is set but is not valid UTF-8"
                )));
            }
        }
    }
    Ok(vars)
}

/// Deployment profile selecting the fallback database name and credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Database `mongo`, fixed `mongo`/`mongo` credentials.
    Basic,
    /// Database `appdb`, credentials from `APP_USER`/`APP_PASS`.
    #[default]
    App,
}

impl Variant {
    pub fn default_db_name(self) -> &'static str {
        match self {
            Variant::Basic => "mongo",
            Variant::App => "appdb",
        }
    }

    fn default_credentials(self) -> (&'static str, &'static str) {
        match self {
            Variant::Basic => ("mongo", "mongo"),
            Variant::App => ("appuser", "apppass"),
        }
    }

    /// Whether `APP_USER`/`APP_PASS` override the defaults.
    fn reads_credential_env(self) -> bool {
        matches!(self, Variant::App)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Resolved inputs of one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub variant: Variant,
    pub db_name: String,
    pub credentials: AppCredentials,
}

impl BootstrapConfig {
    pub fn from_env(variant: Variant) -> Result<Self, DbInfraError> {
        let vars = read_env(&["MONGO_INITDB_DATABASE", "APP_USER", "APP_PASS"])?;
        Ok(Self::resolve(variant, |name| vars.get(name).cloned()))
    }

    /// Resolve against an arbitrary variable lookup. Values are taken verbatim,
    /// an empty string included; only an absent variable falls back.
    pub fn resolve<F>(variant: Variant, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_name = lookup("MONGO_INITDB_DATABASE")
            .unwrap_or_else(|| variant.default_db_name().to_string());

        let (default_user, default_password) = variant.default_credentials();
        let credentials = if variant.reads_credential_env() {
            AppCredentials {
                user: lookup("APP_USER").unwrap_or_else(|| default_user.to_string()),
                password: lookup("APP_PASS").unwrap_or_else(|| default_password.to_string()),
            }
        } else {
            AppCredentials {
                user: default_user.to_string(),
                password: default_password.to_string(),
            }
        };

        Self {
            variant,
            db_name,
            credentials,
        }
    }
}

/// Where and as whom the bootstrap connects.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    uri: String,
}

impl fmt::Debug for ConnectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSpec")
            .field("uri", &self.sanitized())
            .finish()
    }
}

impl ConnectionSpec {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn from_env() -> Result<Self, DbInfraError> {
        let vars = read_env(&[
            "MONGO_URI",
            "MONGO_HOST",
            "MONGO_PORT",
            "MONGO_INITDB_ROOT_USERNAME",
            "MONGO_INITDB_ROOT_PASSWORD",
        ])?;
        Self::resolve(|name| vars.get(name).cloned())
    }

    /// `MONGO_URI` wins outright. Otherwise the URI is assembled from
    /// `MONGO_HOST`/`MONGO_PORT` plus the root credentials when both are set.
    pub fn resolve<F>(lookup: F) -> Result<Self, DbInfraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("MONGO_URI") {
            if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
                return Err(DbInfraError::config(format!(
                    "MONGO_URI must start with 'mongodb://' or 'mongodb+srv://', got: '{}'",
                    sanitize_db_url(&uri)
                )));
            }
            return Ok(Self { uri });
        }

        let host = lookup("MONGO_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("MONGO_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                DbInfraError::config(format!("MONGO_PORT must be a valid port number, got: '{raw}'"))
            })?,
            None => 27017,
        };

        let root_user = lookup("MONGO_INITDB_ROOT_USERNAME");
        let root_password = lookup("MONGO_INITDB_ROOT_PASSWORD");

        let uri = match (root_user, root_password) {
            (Some(user), Some(password)) => format!(
                "mongodb://{}:{}@{host}:{port}/?authSource={ADMIN_DB}",
                utf8_percent_encode(&user, USERINFO),
                utf8_percent_encode(&password, USERINFO),
            ),
            _ => format!("mongodb://{host}:{port}"),
        };

        Ok(Self { uri })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// URI with the password masked, safe for logs.
    pub fn sanitized(&self) -> String {
        sanitize_db_url(&self.uri)
    }
}

impl Default for ConnectionSpec {
    fn default() -> Self {
        Self::from_uri(DEFAULT_MONGO_URI)
    }
}
