use chrono::{DateTime, Duration, Utc};
use registrar_core::{DependencyEdge, Package, PackageVersion, Result};

/// Storage-agnostic persistence surface. `UpdateEngine` and
/// `ProviderEmitter` depend only on this trait, never on a concrete
/// backend, so tests run against `MemoryStore` while production runs
/// against `SqlStore`.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn package_exists(&self, name: &str) -> Result<bool>;

    /// All registered package names, for emitter sweeps that must cover
    /// the full provider tree rather than a single package.
    async fn list_package_names(&self) -> Result<Vec<String>>;

    /// Whether `name` was last reconciled within `within` of `now`.
    async fn package_updated_within(&self, name: &str, within: Duration, now: DateTime<Utc>) -> Result<bool>;

    async fn get_package(&self, name: &str) -> Result<Package>;

    async fn get_package_by_id(&self, id: i64) -> Result<Package>;

    async fn save_package(&self, package: Package) -> Result<Package>;

    async fn remove_package(&self, name: &str) -> Result<()>;

    /// All stored versions for `name`, in storage order (unsorted — callers
    /// apply `SemverOps::sort_ascending` themselves).
    async fn all_versions(&self, name: &str) -> Result<Vec<PackageVersion>>;

    async fn get_release(&self, name: &str, version: &str) -> Result<PackageVersion>;

    async fn get_releases(&self, name: &str, versions: &[String]) -> Result<Vec<PackageVersion>>;

    /// The dependency edges recorded against one stored version.
    async fn get_dependency_edges(&self, name: &str, version_raw: &str) -> Result<Vec<DependencyEdge>>;

    /// Whether every constraint in `constraints` is satisfied by at least
    /// one stored version of `name`.
    async fn versions_exist(&self, name: &str, constraints: &[String]) -> Result<bool>;

    /// Whether any stored dependency edge onto `dependency_name` has a
    /// constraint that `candidate_version` satisfies — used to decide
    /// whether a transitive library still needs tracking after its last
    /// referencing version is removed.
    async fn is_dependency_version_required(&self, dependency_name: &str, candidate_version: &str) -> Result<bool>;

    /// Atomically replaces `name`'s version set: removes `deleted`, inserts
    /// `new`, updates `changed`, and rewrites each touched version's
    /// dependency edges. All in one transactional group (spec-mandated
    /// atomicity boundary).
    async fn replace_versions(
        &self,
        name: &str,
        deleted: Vec<String>,
        new: Vec<(PackageVersion, Vec<DependencyEdge>)>,
        changed: Vec<(PackageVersion, Vec<DependencyEdge>)>,
    ) -> Result<()>;

    /// Sets `name`'s latest version and mirrors it onto the associated
    /// plugin record, if one exists.
    async fn set_latest(&self, name: &str, latest: Option<String>) -> Result<()>;
}
