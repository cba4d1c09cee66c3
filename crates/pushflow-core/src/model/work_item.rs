use serde::Serialize;
use std::fmt;

/// 監視ルート直下のディレクトリのデフォルト値
pub const DEFAULT_WATCHED_ROOT: &str = "templated_tests";

/// 変更が検出されたディレクトリ（ビルド単位）
///
/// `path` はリポジトリルートからの相対パス（例: `templated_tests/alpha`）。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WorkItem {
    pub path: String,
}

impl WorkItem {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: normalize_path(&path.into()),
        }
    }

    /// 監視ルートを取り除いた名前
    ///
    /// `templated_tests/foo` + `templated_tests` -> `foo`
    pub fn name(&self, watched_root: &str) -> &str {
        let root = normalize_path(watched_root);
        if root.is_empty() {
            return &self.path;
        }
        self.path
            .strip_prefix(root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.path)
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// パス表記を `a/b` 形式にそろえる（`./` 接頭辞と末尾の `/` を除去）
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = path.strip_prefix("./").unwrap_or(&path);
    let path = path.trim_end_matches('/');
    if path == "." {
        String::new()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_strips_watched_root() {
        let item = WorkItem::new("templated_tests/foo");
        assert_eq!(item.name("templated_tests"), "foo");
        assert_eq!(item.name("templated_tests/"), "foo");
    }

    #[test]
    fn test_name_with_repo_root() {
        let item = WorkItem::new("service");
        assert_eq!(item.name("."), "service");
        assert_eq!(item.name(""), "service");
    }

    #[test]
    fn test_name_outside_root_keeps_path() {
        let item = WorkItem::new("other/foo");
        assert_eq!(item.name("templated_tests"), "other/foo");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./templated_tests/"), "templated_tests");
        assert_eq!(normalize_path("."), "");
        assert_eq!(normalize_path("a\\b"), "a/b");
    }
}
