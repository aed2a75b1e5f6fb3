use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tutorhub_domain::ports::BoxFuture;
use tutorhub_domain::ports::db::{DbAdapter, DbError};
use url::Url;

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }
}

/// Opens an authenticated websocket session scoped to the configured
/// namespace and database.
pub async fn connect(config: &DbConfig) -> anyhow::Result<Surreal<Client>> {
    let address = parse_socket_address(&config.endpoint)?;
    let db = Surreal::<Client>::init();
    db.connect::<Ws>(address.as_str()).await?;
    db.signin(Root {
        username: &config.username,
        password: &config.password,
    })
    .await?;
    db.use_ns(&config.namespace).use_db(&config.database).await?;
    tracing::info!(
        endpoint = %config.endpoint,
        namespace = %config.namespace,
        database = %config.database,
        "connected to surrealdb"
    );
    Ok(db)
}

/// Reachability probe used by `/health`.
#[derive(Debug, Clone)]
pub struct SurrealAdapter {
    config: DbConfig,
}

impl SurrealAdapter {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }
}

impl DbAdapter for SurrealAdapter {
    fn name(&self) -> &'static str {
        "surrealdb"
    }

    fn health_check(&self) -> BoxFuture<'_, Result<(), DbError>> {
        let endpoint = self.config.endpoint.clone();

        Box::pin(async move {
            let address = parse_socket_address(&endpoint)?;
            let connect = timeout(Duration::from_secs(2), TcpStream::connect(&address))
                .await
                .map_err(|_| {
                    DbError::Unavailable("surreal endpoint connect timed out".to_string())
                })?;
            connect.map_err(|err| {
                DbError::Unavailable(format!("surreal endpoint connect failed: {err}"))
            })?;

            tracing::debug!(endpoint, "surreal health check succeeded");
            Ok(())
        })
    }
}

/// `host:port` for an endpoint given with or without a scheme.
pub fn parse_socket_address(endpoint: &str) -> Result<String, DbError> {
    let normalized = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("ws://{endpoint}")
    };
    let parsed = Url::parse(&normalized).map_err(|err| {
        DbError::Unavailable(format!("invalid surreal endpoint '{endpoint}': {err}"))
    })?;

    let host = parsed.host_str().ok_or_else(|| {
        DbError::Unavailable(format!("missing surreal host in endpoint '{endpoint}'"))
    })?;
    let port = match (parsed.port(), parsed.scheme()) {
        (Some(port), _) => port,
        (None, "wss" | "https") => 443,
        (None, _) => 8000,
    };
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_address_defaults_by_scheme() {
        assert_eq!(
            parse_socket_address("ws://127.0.0.1:8000").expect("address"),
            "127.0.0.1:8000"
        );
        assert_eq!(
            parse_socket_address("db.internal").expect("address"),
            "db.internal:8000"
        );
        assert_eq!(
            parse_socket_address("wss://db.example.com").expect("address"),
            "db.example.com:443"
        );
    }

    #[test]
    fn socket_address_rejects_garbage() {
        assert!(parse_socket_address("ws://").is_err());
    }
}
