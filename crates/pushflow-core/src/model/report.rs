use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// 失敗した工程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Auth,
    Build,
    Push,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Auth => "auth",
            FailureStage::Build => "build",
            FailureStage::Push => "push",
        };
        f.write_str(s)
    }
}

/// ワークアイテム1件の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome {
    /// 全タグのプッシュに成功
    Pushed { image: String, tags: Vec<String> },
    /// ドライラン（計画のみ）
    Planned { image: String, tags: Vec<String> },
    /// 失敗。`pushed_tags` は失敗前にプッシュ済みのタグ（ロールバックしない）
    Failed {
        stage: FailureStage,
        message: String,
        pushed_tags: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub path: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failed { .. })
    }
}

/// 1回の実行全体のレポート
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub revision: String,
    pub default_branch: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn new(
        revision: impl Into<String>,
        default_branch: bool,
        started_at: DateTime<Utc>,
        mut items: Vec<ItemReport>,
    ) -> Self {
        items.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            revision: revision.into(),
            default_branch,
            started_at,
            finished_at: Utc::now(),
            items,
        }
    }

    /// 1件でも失敗があれば false（変更なしの場合は true）
    pub fn is_success(&self) -> bool {
        !self.items.iter().any(ItemReport::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|item| item.is_failure())
    }

    pub fn successes(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|item| !item.is_failure())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pushed(path: &str) -> ItemReport {
        ItemReport {
            path: path.to_string(),
            outcome: ItemOutcome::Pushed {
                image: format!("ns/{}", path),
                tags: vec!["abc123".to_string()],
            },
        }
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = RunReport::new("abc123", false, Utc::now(), vec![]);
        assert!(report.is_success());
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_single_failure_fails_run() {
        let failed = ItemReport {
            path: "templated_tests/gamma".to_string(),
            outcome: ItemOutcome::Failed {
                stage: FailureStage::Build,
                message: "exit 1".to_string(),
                pushed_tags: vec![],
            },
        };
        let report = RunReport::new(
            "abc123",
            true,
            Utc::now(),
            vec![failed, pushed("templated_tests/beta"), pushed("templated_tests/alpha")],
        );

        assert!(!report.is_success());
        let failures: Vec<_> = report.failures().map(|i| i.path.as_str()).collect();
        assert_eq!(failures, vec!["templated_tests/gamma"]);
        let ok: Vec<_> = report.successes().map(|i| i.path.as_str()).collect();
        assert_eq!(ok, vec!["templated_tests/alpha", "templated_tests/beta"]);
    }

    #[test]
    fn test_report_json_shape() {
        let report = RunReport::new("abc123", false, Utc::now(), vec![pushed("a")]);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["revision"], "abc123");
        assert_eq!(value["items"][0]["path"], "a");
        assert_eq!(value["items"][0]["status"], "pushed");
    }
}
