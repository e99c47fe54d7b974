//! Application state management
//!
//! Shared state accessible across all handlers. Every repository goes
//! through [`TenantDb`] so schema pinning cannot be bypassed.

use crate::alerts::AlertRepo;
use crate::config::Settings;
use crate::dashboard::DashboardRepo;
use crate::db::TenantDb;
use crate::email::EmailRepo;
use crate::insights::InsightBroker;
use crate::tenant::OrganizationRepo;
use crate::workspace::{MemberRepo, WorkspaceAuthz, WorkspaceRepo};
use deadpool_postgres::Pool;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,

    /// Schema-pinned access to the shared pool
    pub db: TenantDb,

    /// Shared `public.organizations` repository
    pub organizations: OrganizationRepo,

    pub workspaces: WorkspaceRepo,
    pub members: MemberRepo,
    pub authz: WorkspaceAuthz,
    pub alerts: AlertRepo,
    pub dashboard: DashboardRepo,

    /// In-memory outbox (non-durable in this snapshot)
    pub emails: EmailRepo,

    /// Process-wide insight notification broker
    pub broker: Arc<InsightBroker>,
}

impl AppState {
    pub fn new(pool: Pool, settings: Settings) -> Self {
        let db = TenantDb::new(pool);
        let members = MemberRepo::new(db.clone());

        Self {
            settings,
            organizations: OrganizationRepo::new(db.clone()),
            workspaces: WorkspaceRepo::new(db.clone()),
            authz: WorkspaceAuthz::new(members.clone()),
            members,
            alerts: AlertRepo::new(db.clone()),
            dashboard: DashboardRepo::new(db.clone()),
            emails: EmailRepo::new(),
            broker: Arc::new(InsightBroker::new()),
            db,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;

/// State over a lazy pool that never connects; middleware tests exercise
/// paths that stop before any query.
#[cfg(test)]
pub fn test_state() -> SharedState {
    use crate::config::{
        AuthConfig, CorsConfig, DatabaseConfig, MigrationsConfig, OAuthConfig, ServerConfig,
    };
    use deadpool_postgres::{Config, Runtime};
    use tokio_postgres::NoTls;

    let settings = Settings {
        server: ServerConfig::default(),
        database: DatabaseConfig::default(),
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
        },
        oauth: OAuthConfig::default(),
        cors: CorsConfig::default(),
        migrations: MigrationsConfig::default(),
    };

    let mut cfg = Config::new();
    cfg.host = Some("localhost".to_string());
    cfg.user = Some("postgres".to_string());
    cfg.dbname = Some("pulzifi_test".to_string());
    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .expect("test pool");

    Arc::new(AppState::new(pool, settings))
}
