//! Handles settings for the service. Configuration is read from an optional
//! `settings.toml` and from `SPLITZZ__*` environment variables, e.g.
//! `SPLITZZ__DATABASE__URI` or `SPLITZZ__AUTH__SERVICE_TOKEN`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::money::DEFAULT_PRECISION;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// CORS origin allowed to call the API. Any origin when unset.
    pub allowed_origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub kind: DatabaseKind,
    pub uri: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    /// Grants full access when sent verbatim as the `Authorization` header.
    pub service_token: String,
    /// Key material for signed member sessions.
    pub session_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ledger {
    /// Fraction digits of the currency, 2 for cents.
    pub precision: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub auth: Auth,
    pub ledger: Ledger,
    pub log: Log,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.kind", "memory")?
            .set_default("database.name", "OpenSplit")?
            .set_default("ledger.precision", i64::from(DEFAULT_PRECISION))?
            .set_default("log.level", "info")?
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("SPLITZZ")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// MongoDB connection string, required when `database.kind` is `mongodb`.
    pub fn mongodb_uri(&self) -> Result<&str, ConfigError> {
        self.database
            .uri
            .as_deref()
            .ok_or_else(|| ConfigError::NotFound("database.uri".to_string()))
    }
}
