use chrono::{DateTime, Duration, Utc};
use registrar_core::{DependencyEdge, Error, Package, PackageVersion, RawJson, Result, VersionState};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};

use crate::traits::Store;

/// A relational `Store`, backed by `sqlx`'s `Any` driver so the same queries
/// run against Postgres in production and SQLite in tests. Schema per the
/// persistence layout in SPEC_FULL.md §6 (packages / packageversions /
/// packagedeps / plugins).
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Connects to `database_url` (e.g. `sqlite::memory:` or a `postgres://`
    /// DSN) and ensures the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await
            .map_err(|err| Error::store_conflict("<connect>", err.to_string()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                package_type TEXT NOT NULL,
                repository_url TEXT NOT NULL,
                vcs_type TEXT NOT NULL,
                managed INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                latest_version TEXT
            )",
            "CREATE TABLE IF NOT EXISTS packageversions (
                id INTEGER PRIMARY KEY,
                package_id INTEGER NOT NULL,
                package_name TEXT NOT NULL,
                version_raw TEXT NOT NULL,
                version_normalized TEXT NOT NULL,
                description TEXT,
                homepage TEXT,
                license TEXT NOT NULL,
                keywords TEXT NOT NULL,
                authors TEXT NOT NULL,
                support TEXT NOT NULL,
                funding TEXT NOT NULL,
                package_type TEXT,
                source_reference TEXT NOT NULL,
                dist TEXT NOT NULL,
                autoload TEXT NOT NULL,
                autoload_dev TEXT NOT NULL,
                extra TEXT NOT NULL,
                bin TEXT NOT NULL,
                include_path TEXT NOT NULL,
                target_dir TEXT,
                conflict TEXT NOT NULL,
                replace TEXT NOT NULL,
                provide TEXT NOT NULL,
                suggest TEXT,
                abandoned TEXT,
                time TEXT,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS packagedeps (
                id INTEGER PRIMARY KEY,
                package_version_id INTEGER NOT NULL,
                dependency_name TEXT NOT NULL,
                constraint_text TEXT NOT NULL,
                dev INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS plugins (
                id INTEGER PRIMARY KEY,
                package_name TEXT NOT NULL UNIQUE,
                latest_version TEXT
            )",
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|err| Error::store_conflict("<migrate>", err.to_string()))?;
        }
        Ok(())
    }

    fn row_to_package(row: &AnyRow) -> Result<Package> {
        Ok(Package {
            id: row.try_get("id").map_err(decode_err)?,
            name: row.try_get("name").map_err(decode_err)?,
            package_type: row.try_get("package_type").map_err(decode_err)?,
            repository_url: row.try_get("repository_url").map_err(decode_err)?,
            vcs_type: row.try_get("vcs_type").map_err(decode_err)?,
            managed: row.try_get::<i64, _>("managed").map_err(decode_err)? != 0,
            created_at: parse_time(row, "created_at")?,
            updated_at: parse_time(row, "updated_at")?,
            latest_version: row.try_get("latest_version").ok(),
        })
    }

    fn row_to_version(row: &AnyRow) -> Result<PackageVersion> {
        Ok(PackageVersion {
            id: row.try_get("id").map_err(decode_err)?,
            package_id: row.try_get("package_id").map_err(decode_err)?,
            package_name: row.try_get("package_name").map_err(decode_err)?,
            version_raw: row.try_get("version_raw").map_err(decode_err)?,
            version_normalized: row.try_get("version_normalized").map_err(decode_err)?,
            description: row.try_get("description").ok(),
            homepage: row.try_get("homepage").ok(),
            license: raw_json(row, "license")?,
            keywords: raw_json(row, "keywords")?,
            authors: raw_json(row, "authors")?,
            support: raw_json(row, "support")?,
            funding: raw_json(row, "funding")?,
            package_type: row.try_get("package_type").ok(),
            source_reference: row.try_get("source_reference").map_err(decode_err)?,
            dist: raw_json(row, "dist")?,
            autoload: raw_json(row, "autoload")?,
            autoload_dev: raw_json(row, "autoload_dev")?,
            extra: raw_json(row, "extra")?,
            bin: raw_json(row, "bin")?,
            include_path: raw_json(row, "include_path")?,
            target_dir: row.try_get("target_dir").ok(),
            conflict: raw_json(row, "conflict")?,
            replace: raw_json(row, "replace")?,
            provide: raw_json(row, "provide")?,
            suggest: row
                .try_get::<Option<String>, _>("suggest")
                .map_err(decode_err)?
                .map(|s| sonic_rs::from_str(&s))
                .transpose()
                .map_err(|err| Error::invalid_version("suggest", err.to_string()))?,
            abandoned: row
                .try_get::<Option<String>, _>("abandoned")
                .map_err(decode_err)?
                .map(|s| sonic_rs::from_str(&s).map(RawJson))
                .transpose()
                .map_err(|err| Error::invalid_version("abandoned", err.to_string()))?,
            time: row
                .try_get::<Option<String>, _>("time")
                .map_err(decode_err)?
                .map(|s| s.parse::<DateTime<Utc>>())
                .transpose()
                .map_err(|err| Error::invalid_version("time", err.to_string()))?,
            state: match row.try_get::<String, _>("state").map_err(decode_err)?.as_str() {
                "deleted" => VersionState::Deleted,
                _ => VersionState::Active,
            },
            updated_at: parse_time(row, "updated_at")?,
        })
    }
}

fn decode_err(err: sqlx::Error) -> Error {
    Error::store_conflict("<decode>", err.to_string())
}

fn parse_time(row: &AnyRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column).map_err(decode_err)?;
    raw.parse::<DateTime<Utc>>()
        .map_err(|err| Error::invalid_version(raw, err.to_string()))
}

fn raw_json(row: &AnyRow, column: &str) -> Result<RawJson> {
    let raw: String = row.try_get(column).map_err(decode_err)?;
    sonic_rs::from_str(&raw)
        .map(RawJson)
        .map_err(|err| Error::invalid_version(column, err.to_string()))
}

#[async_trait::async_trait]
impl Store for SqlStore {
    async fn package_exists(&self, name: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM packages WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(decode_err)?;
        let count: i64 = row.try_get("n").map_err(decode_err)?;
        Ok(count > 0)
    }

    async fn list_package_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM packages")
            .fetch_all(&self.pool)
            .await
            .map_err(decode_err)?;
        rows.iter().map(|row| row.try_get("name").map_err(decode_err)).collect()
    }

    async fn package_updated_within(&self, name: &str, within: Duration, now: DateTime<Utc>) -> Result<bool> {
        let package = self.get_package(name).await?;
        Ok(now - package.updated_at < within)
    }

    async fn get_package(&self, name: &str) -> Result<Package> {
        let row = sqlx::query("SELECT * FROM packages WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(decode_err)?
            .ok_or_else(|| Error::not_found(name))?;
        Self::row_to_package(&row)
    }

    async fn get_package_by_id(&self, id: i64) -> Result<Package> {
        let row = sqlx::query("SELECT * FROM packages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(decode_err)?
            .ok_or_else(|| Error::not_found(format!("#{id}")))?;
        Self::row_to_package(&row)
    }

    async fn save_package(&self, package: Package) -> Result<Package> {
        sqlx::query(
            "INSERT INTO packages (id, name, package_type, repository_url, vcs_type, managed, created_at, updated_at, latest_version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                package_type = excluded.package_type,
                repository_url = excluded.repository_url,
                vcs_type = excluded.vcs_type,
                managed = excluded.managed,
                updated_at = excluded.updated_at,
                latest_version = excluded.latest_version",
        )
        .bind(package.id)
        .bind(&package.name)
        .bind(&package.package_type)
        .bind(&package.repository_url)
        .bind(&package.vcs_type)
        .bind(i64::from(package.managed))
        .bind(package.created_at.to_rfc3339())
        .bind(package.updated_at.to_rfc3339())
        .bind(package.latest_version.clone())
        .execute(&self.pool)
        .await
        .map_err(decode_err)?;
        self.get_package(&package.name).await
    }

    async fn remove_package(&self, name: &str) -> Result<()> {
        let package = self.get_package(name).await?;
        sqlx::query("DELETE FROM packagedeps WHERE package_version_id IN (SELECT id FROM packageversions WHERE package_id = ?)")
            .bind(package.id)
            .execute(&self.pool)
            .await
            .map_err(decode_err)?;
        sqlx::query("DELETE FROM packageversions WHERE package_id = ?")
            .bind(package.id)
            .execute(&self.pool)
            .await
            .map_err(decode_err)?;
        sqlx::query("DELETE FROM plugins WHERE package_name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(decode_err)?;
        sqlx::query("DELETE FROM packages WHERE id = ?")
            .bind(package.id)
            .execute(&self.pool)
            .await
            .map_err(decode_err)?;
        Ok(())
    }

    async fn all_versions(&self, name: &str) -> Result<Vec<PackageVersion>> {
        let rows = sqlx::query("SELECT * FROM packageversions WHERE package_name = ?")
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(decode_err)?;
        rows.iter().map(Self::row_to_version).collect()
    }

    async fn get_release(&self, name: &str, version: &str) -> Result<PackageVersion> {
        let row = sqlx::query("SELECT * FROM packageversions WHERE package_name = ? AND version_raw = ?")
            .bind(name)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(decode_err)?
            .ok_or_else(|| Error::not_found(format!("{name}:{version}")))?;
        Self::row_to_version(&row)
    }

    async fn get_releases(&self, name: &str, versions: &[String]) -> Result<Vec<PackageVersion>> {
        let all = self.all_versions(name).await?;
        Ok(all.into_iter().filter(|v| versions.contains(&v.version_raw)).collect())
    }

    async fn get_dependency_edges(&self, name: &str, version_raw: &str) -> Result<Vec<DependencyEdge>> {
        let rows = sqlx::query(
            "SELECT packagedeps.* FROM packagedeps
             JOIN packageversions ON packageversions.id = packagedeps.package_version_id
             WHERE packageversions.package_name = ? AND packageversions.version_raw = ?",
        )
        .bind(name)
        .bind(version_raw)
        .fetch_all(&self.pool)
        .await
        .map_err(decode_err)?;
        rows.iter()
            .map(|row| {
                Ok(DependencyEdge {
                    id: row.try_get("id").map_err(decode_err)?,
                    package_version_id: row.try_get("package_version_id").map_err(decode_err)?,
                    dependency_name: row.try_get("dependency_name").map_err(decode_err)?,
                    constraint: row.try_get("constraint_text").map_err(decode_err)?,
                    dev: row.try_get::<i64, _>("dev").map_err(decode_err)? != 0,
                })
            })
            .collect()
    }

    async fn versions_exist(&self, name: &str, constraints: &[String]) -> Result<bool> {
        let all = self.all_versions(name).await.unwrap_or_default();
        let ops = registrar_semver::SemverOps::new();
        Ok(constraints.iter().all(|constraint| {
            all.iter().any(|v| ops.satisfies(&v.version_raw, constraint).unwrap_or(false))
        }))
    }

    async fn is_dependency_version_required(&self, dependency_name: &str, candidate_version: &str) -> Result<bool> {
        let rows = sqlx::query("SELECT constraint_text FROM packagedeps WHERE dependency_name = ?")
            .bind(dependency_name)
            .fetch_all(&self.pool)
            .await
            .map_err(decode_err)?;
        let ops = registrar_semver::SemverOps::new();
        for row in rows {
            let constraint: String = row.try_get("constraint_text").map_err(decode_err)?;
            if ops.satisfies(candidate_version, &constraint).unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn replace_versions(
        &self,
        name: &str,
        deleted: Vec<String>,
        new: Vec<(PackageVersion, Vec<DependencyEdge>)>,
        changed: Vec<(PackageVersion, Vec<DependencyEdge>)>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(decode_err)?;

        for version in &deleted {
            sqlx::query(
                "DELETE FROM packagedeps WHERE package_version_id IN
                 (SELECT id FROM packageversions WHERE package_name = ? AND version_raw = ?)",
            )
            .bind(name)
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(decode_err)?;
            sqlx::query("DELETE FROM packageversions WHERE package_name = ? AND version_raw = ?")
                .bind(name)
                .bind(version)
                .execute(&mut *tx)
                .await
                .map_err(decode_err)?;
        }

        for (version, edges) in new.into_iter().chain(changed) {
            upsert_version(&mut tx, &version).await?;
            sqlx::query(
                "DELETE FROM packagedeps WHERE package_version_id IN
                 (SELECT id FROM packageversions WHERE package_name = ? AND version_raw = ?)",
            )
            .bind(name)
            .bind(&version.version_raw)
            .execute(&mut *tx)
            .await
            .map_err(decode_err)?;
            for edge in edges {
                sqlx::query(
                    "INSERT INTO packagedeps (package_version_id, dependency_name, constraint_text, dev)
                     SELECT id, ?, ?, ? FROM packageversions WHERE package_name = ? AND version_raw = ?",
                )
                .bind(&edge.dependency_name)
                .bind(&edge.constraint)
                .bind(i64::from(edge.dev))
                .bind(name)
                .bind(&version.version_raw)
                .execute(&mut *tx)
                .await
                .map_err(decode_err)?;
            }
        }

        tx.commit().await.map_err(decode_err)
    }

    async fn set_latest(&self, name: &str, latest: Option<String>) -> Result<()> {
        sqlx::query("UPDATE packages SET latest_version = ? WHERE name = ?")
            .bind(latest.clone())
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(decode_err)?;
        sqlx::query("UPDATE plugins SET latest_version = ? WHERE package_name = ?")
            .bind(latest)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(decode_err)?;
        Ok(())
    }
}

async fn upsert_version(tx: &mut sqlx::Transaction<'_, sqlx::Any>, version: &PackageVersion) -> Result<()> {
    let suggest = version
        .suggest
        .as_ref()
        .map(sonic_rs::to_string)
        .transpose()
        .map_err(|err| Error::invalid_version("suggest", err.to_string()))?;
    let abandoned = version
        .abandoned
        .as_ref()
        .map(|a| sonic_rs::to_string(&a.0))
        .transpose()
        .map_err(|err| Error::invalid_version("abandoned", err.to_string()))?;

    sqlx::query(
        "INSERT INTO packageversions (
            package_id, package_name, version_raw, version_normalized, description, homepage,
            license, keywords, authors, support, funding, package_type, source_reference, dist, autoload,
            autoload_dev, extra, bin, include_path, target_dir, conflict, replace, provide,
            suggest, abandoned, time, state, updated_at
         ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
         ON CONFLICT DO NOTHING",
    )
    .bind(version.package_id)
    .bind(&version.package_name)
    .bind(&version.version_raw)
    .bind(&version.version_normalized)
    .bind(&version.description)
    .bind(&version.homepage)
    .bind(sonic_rs::to_string(&version.license.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.keywords.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.authors.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.support.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.funding.0).unwrap_or_default())
    .bind(&version.package_type)
    .bind(&version.source_reference)
    .bind(sonic_rs::to_string(&version.dist.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.autoload.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.autoload_dev.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.extra.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.bin.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.include_path.0).unwrap_or_default())
    .bind(&version.target_dir)
    .bind(sonic_rs::to_string(&version.conflict.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.replace.0).unwrap_or_default())
    .bind(sonic_rs::to_string(&version.provide.0).unwrap_or_default())
    .bind(suggest)
    .bind(abandoned)
    .bind(version.time.map(|t| t.to_rfc3339()))
    .bind(if version.state == VersionState::Deleted { "deleted" } else { "active" })
    .bind(version.updated_at.to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(decode_err)?;
    Ok(())
}
