//! Feature grouper.
//!
//! Buckets source files into features by path keywords so that patterns
//! from related files end up in the same how-to-build guide. This is
//! best-effort topic clustering: two unrelated files that share a keyword
//! such as "file" land in the same group.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::models::FeatureGroup;

/// Feature assigned when no keyword matches and the file has no parent.
pub const GENERAL_FEATURE: &str = "general";

/// Ordered keyword → feature table.
#[derive(Debug, Clone)]
pub struct FeatureRules {
    rules: Vec<(String, String)>,
}

impl Default for FeatureRules {
    fn default() -> Self {
        Self::from_pairs(&[
            ("auth", "authentication"),
            ("login", "authentication"),
            ("user", "user_management"),
            ("api", "api_endpoints"),
            ("model", "data_models"),
            ("database", "database_integration"),
            ("db", "database_integration"),
            ("payment", "payment_processing"),
            ("email", "email_system"),
            ("notification", "notification_system"),
            ("upload", "file_handling"),
            ("file", "file_handling"),
            ("config", "configuration"),
            ("middleware", "middleware_patterns"),
            ("util", "utility_functions"),
            ("helper", "utility_functions"),
            ("test", "testing_patterns"),
            ("admin", "admin_interface"),
        ])
    }
}

impl FeatureRules {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            rules: pairs
                .iter()
                .map(|(k, f)| (k.to_lowercase(), f.to_string()))
                .collect(),
        }
    }

    /// Feature name for a (root-relative) path.
    ///
    /// Segments are checked in path order; within a segment the first
    /// matching keyword wins. Without a match the parent directory name is
    /// used, and without a parent, [`GENERAL_FEATURE`].
    pub fn identify(&self, path: &Path) -> String {
        let segments: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();

        for segment in &segments {
            let lower = segment.to_lowercase();
            if let Some((_, feature)) = self.rules.iter().find(|(k, _)| lower.contains(k.as_str())) {
                return feature.clone();
            }
        }

        if segments.len() >= 2 {
            segments[segments.len() - 2].clone()
        } else {
            GENERAL_FEATURE.to_string()
        }
    }

    /// Group paths as given.
    pub fn group(&self, paths: &[PathBuf]) -> BTreeMap<String, FeatureGroup> {
        self.group_with(paths, |p| p.to_path_buf())
    }

    /// Group paths by their position under `root`, so directories above the
    /// input root never influence the feature. Members keep their full path.
    pub fn group_relative(&self, root: &Path, paths: &[PathBuf]) -> BTreeMap<String, FeatureGroup> {
        self.group_with(paths, |p| {
            p.strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| p.to_path_buf())
        })
    }

    fn group_with(
        &self,
        paths: &[PathBuf],
        key_path: impl Fn(&Path) -> PathBuf,
    ) -> BTreeMap<String, FeatureGroup> {
        let mut groups: BTreeMap<String, FeatureGroup> = BTreeMap::new();
        for path in paths {
            let feature = self.identify(&key_path(path));
            groups
                .entry(feature.clone())
                .or_insert_with(|| FeatureGroup::new(feature))
                .members
                .insert(path.clone());
        }
        tracing::debug!("grouped {} files into {} features", paths.len(), groups.len());
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_in_any_segment() {
        let rules = FeatureRules::default();
        assert_eq!(rules.identify(Path::new("src/auth/session.py")), "authentication");
        assert_eq!(rules.identify(Path::new("app/Payments.rb")), "payment_processing");
    }

    #[test]
    fn earlier_segment_wins() {
        let rules = FeatureRules::default();
        // `api` comes before `user` in the path.
        assert_eq!(rules.identify(Path::new("api/users.go")), "api_endpoints");
    }

    #[test]
    fn table_order_breaks_ties_within_a_segment() {
        let rules = FeatureRules::default();
        // "user_auth" contains both `auth` and `user`; `auth` is listed first.
        assert_eq!(rules.identify(Path::new("user_auth.py")), "authentication");
    }

    #[test]
    fn falls_back_to_parent_then_general() {
        let rules = FeatureRules::default();
        assert_eq!(rules.identify(Path::new("src/scheduler/cron.py")), "scheduler");
        assert_eq!(rules.identify(Path::new("main.py")), GENERAL_FEATURE);
    }

    #[test]
    fn relative_grouping_ignores_root_segments() {
        let rules = FeatureRules::default();
        let root = Path::new("/home/user/project");
        let paths = vec![
            root.join("queue/worker.py"),
            root.join("queue/broker.py"),
            root.join("login/form.js"),
        ];
        let groups = rules.group_relative(root, &paths);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["queue"].members.len(), 2);
        assert!(groups["authentication"].members.contains(&root.join("login/form.js")));
        assert!(!groups.contains_key("user_management"));
    }

    #[test]
    fn each_file_lands_in_one_group() {
        let rules = FeatureRules::default();
        let paths: Vec<PathBuf> = ["a/db.py", "a/util.py", "b/c.py", "x.py"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let groups = rules.group(&paths);
        let total: usize = groups.values().map(|g| g.members.len()).sum();
        assert_eq!(total, paths.len());
    }
}
