//! 変更検出の除外リスト

use crate::error::{DetectError, Result};
use crate::model::normalize_path;
use glob::{MatchOptions, Pattern};

/// 除外エントリ
///
/// 次のいずれかに一致したファイルは変更として扱いません:
/// - パスの完全一致（`templated_tests/README.md`）
/// - ディレクトリ接頭辞（`templated_tests/docs` は `templated_tests/docs/a.md` に一致）
/// - globパターン（`templated_tests/*.md`）。`*` は `/` をまたがない。またぐ場合は `**` を使う
#[derive(Debug, Clone)]
struct IgnoreEntry {
    raw: String,
    pattern: Option<Pattern>,
}

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    entries: Vec<IgnoreEntry>,
}

impl IgnoreList {
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for entry in entries {
            let raw = normalize_path(entry.as_ref());
            if raw.is_empty() {
                continue;
            }

            let pattern = if raw.contains(['*', '?', '[']) {
                Some(
                    Pattern::new(&raw).map_err(|e| DetectError::InvalidPattern {
                        pattern: raw.clone(),
                        message: e.to_string(),
                    })?,
                )
            } else {
                None
            };

            list.entries.push(IgnoreEntry { raw, pattern });
        }
        Ok(list)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| match &entry.pattern {
            Some(pattern) => pattern.matches_with(path, GLOB_OPTIONS),
            None => {
                path == entry.raw
                    || path
                        .strip_prefix(entry.raw.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        })
    }
}
