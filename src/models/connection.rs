//! Connection-related data models.
//!
//! This module defines types for database connection parameters and state.

use serde::{Deserialize, Serialize};
use url::Url;

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSQL => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }

    /// URL scheme used when assembling a connection string from parts.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Individual connection parameters, as entered by the user before connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub db_type: DatabaseType,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
    /// Database name, or file path for SQLite
    pub database: String,
}

impl ConnectionParams {
    /// Assemble a driver connection string, percent-encoding credentials.
    pub fn to_connection_string(&self) -> Result<String, ConnectionConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConnectionConfigError::MissingDatabase);
        }

        if self.db_type == DatabaseType::SQLite {
            return Ok(format!("sqlite:{}", self.database));
        }

        let base = format!("{}://{}", self.db_type.scheme(), self.host);
        let mut url =
            Url::parse(&base).map_err(|e| ConnectionConfigError::InvalidHost(e.to_string()))?;

        let port = self.port.or_else(|| self.db_type.default_port());
        url.set_port(port)
            .map_err(|_| ConnectionConfigError::InvalidHost(self.host.clone()))?;
        if !self.user.is_empty() {
            url.set_username(&self.user)
                .map_err(|_| ConnectionConfigError::InvalidHost(self.host.clone()))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| ConnectionConfigError::InvalidHost(self.host.clone()))?;
        }
        url.set_path(&format!("/{}", self.database));

        Ok(url.to_string())
    }
}

/// Configuration for a database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub connection_string: String,
    /// Seconds to wait for the connection to be established
    pub connect_timeout_secs: u64,
}

impl ConnectionConfig {
    /// Create a new connection configuration.
    pub fn new(
        connection_string: impl Into<String>,
        connect_timeout_secs: u64,
    ) -> Result<Self, ConnectionConfigError> {
        let connection_string = connection_string.into();

        let db_type = DatabaseType::from_connection_string(&connection_string)
            .ok_or_else(|| ConnectionConfigError::UnknownDatabaseType(mask(&connection_string)))?;

        Ok(Self {
            db_type,
            connection_string,
            connect_timeout_secs,
        })
    }

    /// Create a configuration from individual parameters.
    pub fn from_params(
        params: &ConnectionParams,
        connect_timeout_secs: u64,
    ) -> Result<Self, ConnectionConfigError> {
        Self::new(params.to_connection_string()?, connect_timeout_secs)
    }

    /// Get a display-safe version of the connection string (credentials masked).
    pub fn masked_connection_string(&self) -> String {
        mask(&self.connection_string)
    }
}

fn mask(connection_string: &str) -> String {
    // Replace the password in the authority section, if any
    let Some(scheme_end) = connection_string.find("://").map(|p| p + 3) else {
        return connection_string.to_string();
    };
    let rest = &connection_string[scheme_end..];
    if let Some(at_pos) = rest.find('@') {
        if let Some(colon_pos) = rest[..at_pos].find(':') {
            return format!(
                "{}{}****{}",
                &connection_string[..scheme_end],
                &rest[..colon_pos + 1],
                &rest[at_pos..]
            );
        }
    }
    connection_string.to_string()
}

/// Errors that can occur when creating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    /// No database name was supplied
    #[error("Database name cannot be empty")]
    MissingDatabase,

    /// Host could not be turned into a URL
    #[error("Invalid host: {0}")]
    InvalidHost(String),

    /// Could not determine database type from connection string
    #[error("Unknown database type in connection string: {0}")]
    UnknownDatabaseType(String),
}

/// Information about an active connection, returned after successful connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub database_type: DatabaseType,
    pub server_version: Option<String>,
}
