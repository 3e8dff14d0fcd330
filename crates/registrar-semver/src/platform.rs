/// Whether `name` is one of Composer's platform/virtual package sentinels,
/// which never have a VCS of their own and must never be tracked or
/// cascaded into by `UpdateEngine`.
#[must_use]
pub fn is_platform_package(name: &str) -> bool {
    matches!(name, "php" | "composer-plugin-api" | "__root__")
        || name.starts_with("ext-")
        || name.starts_with("lib-")
        || name.starts_with("bower-asset/")
        || name.starts_with("npm-asset/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_platform_sentinels() {
        assert!(is_platform_package("php"));
        assert!(is_platform_package("ext-json"));
        assert!(is_platform_package("lib-curl"));
        assert!(is_platform_package("composer-plugin-api"));
        assert!(is_platform_package("bower-asset/jquery"));
        assert!(is_platform_package("npm-asset/left-pad"));
    }

    #[test]
    fn regular_package_is_not_platform() {
        assert!(!is_platform_package("acme/widgets"));
    }
}
