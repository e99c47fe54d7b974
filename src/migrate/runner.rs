//! Migration runner
//!
//! Applies versioned DDL to the shared `public` schema and to every tenant
//! schema. Each schema tracks its own single-row `schema_migrations
//! (version, dirty)` table, so schemas advance independently; there is no
//! cross-schema atomicity. A step records its target version with
//! `dirty=true` before the DDL runs and clears the flag after, so an
//! interrupted step is visible to the operator.

use crate::db::TenantDb;
use crate::migrate::{load_dir, Migration};
use crate::tenant::{OrganizationRepo, TenantSchema};
use anyhow::{bail, Context, Result};
use deadpool_postgres::Pool;
use std::path::Path;
use tracing::{error, info, warn};

/// Runner command, mirroring the CLI surface
#[derive(Debug, Clone, Copy)]
pub enum MigrateCommand {
    /// Apply pending migrations; `steps: None` applies all of them
    Up { steps: Option<usize> },
    /// Roll back applied migrations; `steps: None` rolls back one
    Down { steps: Option<usize> },
    /// Overwrite the recorded version and clear the dirty flag
    Force { version: i64 },
    /// Report the recorded version
    Version,
}

/// Which schemas a run targets
#[derive(Debug, Clone)]
pub enum MigrateScope {
    /// Public first, then every non-deleted tenant
    All,
    Public,
    /// One named tenant schema, or every non-deleted tenant when `None`
    Tenant(Option<String>),
}

/// Recorded migration state of one schema after a run
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    pub schema: String,
    pub version: i64,
    pub dirty: bool,
}

/// Select the pending migrations for an `up` run
pub fn plan_up(migrations: &[Migration], current: i64, steps: Option<usize>) -> Vec<&Migration> {
    let pending = migrations.iter().filter(|m| m.version > current);
    match steps {
        Some(n) => pending.take(n).collect(),
        None => pending.collect(),
    }
}

/// Select the applied migrations for a `down` run, newest first, each paired
/// with the version the schema lands on after rolling it back
pub fn plan_down(
    migrations: &[Migration],
    current: i64,
    steps: Option<usize>,
) -> Vec<(&Migration, i64)> {
    let applied: Vec<&Migration> = migrations.iter().filter(|m| m.version <= current).collect();

    let mut planned = Vec::new();
    for (idx, migration) in applied.iter().enumerate().rev() {
        let target = if idx == 0 { 0 } else { applied[idx - 1].version };
        planned.push((*migration, target));
    }

    planned.truncate(steps.unwrap_or(1));
    planned
}

pub struct Runner {
    pool: Pool,
    public_migrations: Vec<Migration>,
    tenant_migrations: Vec<Migration>,
}

impl Runner {
    /// Load migration sources from `<source_dir>/public` and
    /// `<source_dir>/tenant`.
    pub fn new(pool: Pool, source_dir: &Path) -> Result<Self> {
        let public_migrations = load_dir(&source_dir.join("public"))?;
        let tenant_migrations = load_dir(&source_dir.join("tenant"))?;

        info!(
            "Loaded {} public and {} tenant migrations from {}",
            public_migrations.len(),
            tenant_migrations.len(),
            source_dir.display()
        );

        Ok(Self {
            pool,
            public_migrations,
            tenant_migrations,
        })
    }

    /// Execute the command against the scope; returns the final recorded
    /// state of every touched schema.
    pub async fn run(
        &self,
        command: MigrateCommand,
        scope: &MigrateScope,
    ) -> Result<Vec<SchemaVersion>> {
        let mut reports = Vec::new();

        match scope {
            MigrateScope::Public => {
                reports.push(self.apply_public(command).await?);
            }
            MigrateScope::Tenant(target) => {
                self.apply_tenants(command, target.as_deref(), &mut reports)
                    .await?;
            }
            MigrateScope::All => {
                // Public failure is fatal: tenants depend on the shared
                // organizations table being in shape.
                reports.push(self.apply_public(command).await?);
                self.apply_tenants(command, None, &mut reports).await?;
            }
        }

        Ok(reports)
    }

    async fn apply_public(&self, command: MigrateCommand) -> Result<SchemaVersion> {
        self.apply_to_schema("public", &self.public_migrations, command)
            .await
            .context("public schema migration failed")
    }

    async fn apply_tenants(
        &self,
        command: MigrateCommand,
        target: Option<&str>,
        reports: &mut Vec<SchemaVersion>,
    ) -> Result<()> {
        let schemas = match target {
            Some(name) => vec![TenantSchema::new(name)?],
            None => {
                let orgs = OrganizationRepo::new(TenantDb::new(self.pool.clone()));
                orgs.active_schemas().await?
            }
        };

        // One broken tenant must not strand the rest of the fleet; record
        // the failure and keep going.
        let mut failed = Vec::new();
        for schema in &schemas {
            match self
                .apply_to_schema(schema.as_str(), &self.tenant_migrations, command)
                .await
            {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("Tenant {} migration failed: {:#}", schema, e);
                    failed.push(schema.as_str().to_string());
                }
            }
        }

        if !failed.is_empty() {
            bail!("migration failed for tenant schemas: {}", failed.join(", "));
        }

        Ok(())
    }

    async fn apply_to_schema(
        &self,
        schema: &str,
        migrations: &[Migration],
        command: MigrateCommand,
    ) -> Result<SchemaVersion> {
        let mut client = self.pool.get().await?;

        // Pin the whole run to the target schema; the version table and the
        // DDL both resolve inside it.
        client
            .batch_execute(&format!("SET search_path TO {}", schema))
            .await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                    version BIGINT NOT NULL,
                    dirty BOOLEAN NOT NULL DEFAULT FALSE
                )",
            )
            .await?;

        let (current, dirty) = read_state(&client).await?;

        if dirty && !matches!(command, MigrateCommand::Force { .. }) {
            // Never auto-force: a dirty row means a step died half-way and
            // silently pushing on could mask the damage.
            warn!(
                "Schema {} is dirty at version {}; skipping (use force after manual repair)",
                schema, current
            );
            return Ok(SchemaVersion {
                schema: schema.to_string(),
                version: current,
                dirty,
            });
        }

        match command {
            MigrateCommand::Version => {}
            MigrateCommand::Force {
                version: forced_version,
            } => {
                set_state(&client, forced_version, false).await?;
                info!("Schema {} forced to version {}", schema, forced_version);
            }
            MigrateCommand::Up { steps } => {
                for migration in plan_up(migrations, current, steps) {
                    info!(
                        "Schema {}: applying {} {}",
                        schema, migration.version, migration.name
                    );
                    set_state(&client, migration.version, true).await?;

                    let txn = client.transaction().await?;
                    txn.batch_execute(&migration.up_sql).await.with_context(|| {
                        format!(
                            "migration {} ({}) failed; schema {} left dirty",
                            migration.version, migration.name, schema
                        )
                    })?;
                    txn.commit().await?;

                    set_state(&client, migration.version, false).await?;
                }
            }
            MigrateCommand::Down { steps } => {
                for (migration, target) in plan_down(migrations, current, steps) {
                    let down_sql = migration.down_sql.as_deref().with_context(|| {
                        format!(
                            "migration {} ({}) has no down file",
                            migration.version, migration.name
                        )
                    })?;

                    info!(
                        "Schema {}: rolling back {} {}",
                        schema, migration.version, migration.name
                    );
                    set_state(&client, migration.version, true).await?;

                    let txn = client.transaction().await?;
                    txn.batch_execute(down_sql).await.with_context(|| {
                        format!(
                            "rollback {} ({}) failed; schema {} left dirty",
                            migration.version, migration.name, schema
                        )
                    })?;
                    txn.commit().await?;

                    set_state(&client, target, false).await?;
                }
            }
        }

        let (version, dirty) = read_state(&client).await?;

        Ok(SchemaVersion {
            schema: schema.to_string(),
            version,
            dirty,
        })
    }
}

async fn read_state(client: &tokio_postgres::Client) -> Result<(i64, bool)> {
    let row = client
        .query_opt("SELECT version, dirty FROM schema_migrations LIMIT 1", &[])
        .await?;

    Ok(row.map_or((0, false), |r| (r.get("version"), r.get("dirty"))))
}

async fn set_state(client: &tokio_postgres::Client, version: i64, dirty: bool) -> Result<()> {
    // Single-row table: replace rather than update so a missing row is not
    // a special case.
    client
        .execute("DELETE FROM schema_migrations", &[])
        .await?;
    client
        .execute(
            "INSERT INTO schema_migrations (version, dirty) VALUES ($1, $2)",
            &[&version, &dirty],
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn migration(version: i64, down: bool) -> Migration {
        Migration {
            version,
            name: format!("m{version}"),
            up_sql: format!("CREATE TABLE t{version} ()"),
            down_sql: down.then(|| format!("DROP TABLE t{version}")),
        }
    }

    fn versions(planned: &[&Migration]) -> Vec<i64> {
        planned.iter().map(|m| m.version).collect()
    }

    #[test]
    fn plan_up_applies_everything_pending_by_default() {
        let migrations = [migration(1, true), migration(2, true), migration(4, true)];
        assert_eq!(versions(&plan_up(&migrations, 0, None)), vec![1, 2, 4]);
        assert_eq!(versions(&plan_up(&migrations, 1, None)), vec![2, 4]);
        assert_eq!(versions(&plan_up(&migrations, 4, None)), Vec::<i64>::new());
    }

    #[test]
    fn plan_up_honors_steps() {
        let migrations = [migration(1, true), migration(2, true), migration(3, true)];
        assert_eq!(versions(&plan_up(&migrations, 0, Some(2))), vec![1, 2]);
        assert_eq!(versions(&plan_up(&migrations, 3, Some(2))), Vec::<i64>::new());
    }

    #[test]
    fn plan_down_defaults_to_one_step_newest_first() {
        let migrations = [migration(1, true), migration(2, true), migration(3, true)];
        let planned = plan_down(&migrations, 3, None);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].0.version, 3);
        assert_eq!(planned[0].1, 2);
    }

    #[test]
    fn plan_down_targets_previous_version() {
        let migrations = [migration(1, true), migration(3, true), migration(7, true)];
        let planned = plan_down(&migrations, 7, Some(3));
        let pairs: Vec<(i64, i64)> = planned.iter().map(|(m, t)| (m.version, *t)).collect();
        assert_eq!(pairs, vec![(7, 3), (3, 1), (1, 0)]);
    }

    #[test]
    fn plan_down_ignores_unapplied_versions() {
        let migrations = [migration(1, true), migration(2, true), migration(3, true)];
        let planned = plan_down(&migrations, 2, Some(5));
        let pairs: Vec<(i64, i64)> = planned.iter().map(|(m, t)| (m.version, *t)).collect();
        assert_eq!(pairs, vec![(2, 1), (1, 0)]);
    }

    #[test]
    fn public_and_tenant_plans_are_independent() {
        // Advancing one schema's version must not shift what the other has
        // pending: plans depend only on that schema's own recorded version.
        let public = [migration(1, true), migration(2, true)];
        let tenant = [migration(1, true), migration(2, true), migration(3, true)];

        let tenant_pending_before = versions(&plan_up(&tenant, 3, None));
        let _public_plan = plan_up(&public, 0, None);
        let tenant_pending_after = versions(&plan_up(&tenant, 3, None));

        assert_eq!(tenant_pending_before, tenant_pending_after);
        assert_eq!(versions(&plan_up(&public, 2, None)), Vec::<i64>::new());
    }
}
