//! Database connection management
//!
//! Builds the shared connection pool and provides schema-pinned access to
//! tenant namespaces.
//!
//! Pinning strategy: pin-on-use. Every repository operation acquires a
//! connection, issues `SET search_path` for its tenant as the first
//! statement, performs all its queries on that same connection, and releases
//! it. A connection coming out of the pool is never trusted to carry the
//! right namespace from a previous request. Queries against shared tables
//! must schema-qualify (`public.organizations`) so a residual pin cannot
//! mis-serve them.

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::tenant::TenantSchema;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

/// Create the shared connection pool from database settings
pub async fn init_pool(config: &DatabaseConfig) -> Result<Pool, AppError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = if config.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| AppError::Internal(format!("Failed to create TLS pool: {}", e)))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Internal(format!("Failed to create pool: {}", e)))?
    };

    // Verify connectivity before the server starts taking traffic
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    drop(client);

    info!("Database connection pool established (TLS: {})", config.require_tls);
    Ok(pool)
}

/// Schema-pinned access to the shared pool
#[derive(Clone)]
pub struct TenantDb {
    pool: Pool,
}

impl TenantDb {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Acquire a connection pinned to the given tenant schema.
    ///
    /// The returned client has `search_path` set to the tenant namespace;
    /// the caller performs its statements on it and drops it when done. The
    /// schema identifier was validated on construction, which is what makes
    /// the interpolation safe.
    pub async fn conn(&self, schema: &TenantSchema) -> Result<Object, AppError> {
        let client = self.pool.get().await?;
        client
            .batch_execute(&format!("SET search_path TO {}", schema.as_str()))
            .await?;
        Ok(client)
    }

    /// Acquire a connection for shared (`public` schema) tables.
    ///
    /// Callers must still schema-qualify table names.
    pub async fn shared_conn(&self) -> Result<Object, AppError> {
        let client = self.pool.get().await?;
        client.batch_execute("SET search_path TO public").await?;
        Ok(client)
    }
}
