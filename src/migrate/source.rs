//! Migration source loading
//!
//! Versioned SQL file pairs on disk: `NNNN_name.up.sql` and
//! `NNNN_name.down.sql`. The version is the leading integer; a down file is
//! optional, an up file is not.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One versioned migration, loaded from disk
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_sql: String,
    pub down_sql: Option<String>,
}

#[derive(Default)]
struct PartialMigration {
    name: Option<String>,
    up_sql: Option<String>,
    down_sql: Option<String>,
}

/// Parse `NNNN_name.up.sql` / `NNNN_name.down.sql` into
/// `(version, name, is_up)`; `None` for files that are not migrations.
fn parse_file_name(file_name: &str) -> Option<(i64, String, bool)> {
    let (stem, is_up) = if let Some(stem) = file_name.strip_suffix(".up.sql") {
        (stem, true)
    } else if let Some(stem) = file_name.strip_suffix(".down.sql") {
        (stem, false)
    } else {
        return None;
    };

    let (version, name) = stem.split_once('_')?;
    let version: i64 = version.parse().ok()?;
    if version <= 0 {
        return None;
    }

    Some((version, name.to_string(), is_up))
}

/// Load every migration under `dir`, sorted by version.
///
/// Missing directories yield an empty set so a deployment can carry only
/// public or only tenant migrations.
pub fn load_dir(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut partials: BTreeMap<i64, PartialMigration> = BTreeMap::new();

    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };

        let Some((version, name, is_up)) = parse_file_name(file_name) else {
            continue;
        };

        let sql = fs::read_to_string(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;

        let partial = partials.entry(version).or_default();
        if let Some(existing) = &partial.name {
            if existing != &name {
                bail!(
                    "conflicting migration names for version {} in {}: {:?} vs {:?}",
                    version,
                    dir.display(),
                    existing,
                    name
                );
            }
        } else {
            partial.name = Some(name);
        }

        let slot = if is_up {
            &mut partial.up_sql
        } else {
            &mut partial.down_sql
        };
        if slot.is_some() {
            bail!(
                "duplicate migration file for version {} in {}",
                version,
                dir.display()
            );
        }
        *slot = Some(sql);
    }

    partials
        .into_iter()
        .map(|(version, partial)| {
            let name = partial.name.expect("partial always has a name");
            let up_sql = partial.up_sql.with_context(|| {
                format!("migration {} ({}) has no .up.sql file", version, name)
            })?;
            Ok(Migration {
                version,
                name,
                up_sql,
                down_sql: partial.down_sql,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write(dir: &Path, name: &str, sql: &str) {
        fs::write(dir.join(name), sql).unwrap();
    }

    #[test]
    fn parses_up_and_down_file_names() {
        assert_eq!(
            parse_file_name("0001_create_workspaces.up.sql"),
            Some((1, "create_workspaces".to_string(), true))
        );
        assert_eq!(
            parse_file_name("0003_alerts.down.sql"),
            Some((3, "alerts".to_string(), false))
        );
        assert_eq!(parse_file_name("README.md"), None);
        assert_eq!(parse_file_name("0001.up.sql"), None);
        assert_eq!(parse_file_name("x_name.up.sql"), None);
        assert_eq!(parse_file_name("0000_zero.up.sql"), None);
    }

    #[test]
    fn loads_sorted_pairs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "0002_second.up.sql", "CREATE TABLE b ()");
        write(dir.path(), "0002_second.down.sql", "DROP TABLE b");
        write(dir.path(), "0001_first.up.sql", "CREATE TABLE a ()");
        write(dir.path(), "notes.txt", "ignored");

        let migrations = load_dir(dir.path()).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version, 1);
        assert_eq!(migrations[0].name, "first");
        assert!(migrations[0].down_sql.is_none());
        assert_eq!(migrations[1].version, 2);
        assert_eq!(migrations[1].down_sql.as_deref(), Some("DROP TABLE b"));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let migrations = load_dir(&dir.path().join("nope")).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn down_without_up_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "0001_orphan.down.sql", "DROP TABLE a");

        let err = load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no .up.sql"));
    }

    #[test]
    fn conflicting_names_for_one_version_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "0001_one.up.sql", "SELECT 1");
        write(dir.path(), "0001_other.down.sql", "SELECT 1");

        assert!(load_dir(dir.path()).is_err());
    }
}
