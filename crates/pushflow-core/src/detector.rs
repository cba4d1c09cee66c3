//! 変更セット検出
//!
//! リビジョン間の差分から、監視ルート直下で変更のあったディレクトリを求めます。

use crate::error::Result;
use crate::ignore::IgnoreList;
use crate::model::{WorkItem, normalize_path};
use crate::vcs::{GitRepo, Revisions, tree_has_dir};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

pub struct ChangeDetector {
    repo: GitRepo,
    watched_root: String,
    ignore: IgnoreList,
}

impl ChangeDetector {
    pub fn open(repo_path: &Path, watched_root: &str, ignore: IgnoreList) -> Result<Self> {
        Ok(Self {
            repo: GitRepo::discover(repo_path)?,
            watched_root: normalize_path(watched_root),
            ignore,
        })
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    pub fn watched_root(&self) -> &str {
        &self.watched_root
    }

    /// 変更のあったディレクトリをワークアイテムとして返す
    ///
    /// 変更がない場合は空の Vec を返します（エラーではありません）。
    #[tracing::instrument(skip(self), fields(watched_root = %self.watched_root))]
    pub fn detect(&self, revisions: &Revisions) -> Result<Vec<WorkItem>> {
        let head_commit = self.repo.resolve_commit(&revisions.head)?;
        let head_tree = head_commit.tree()?;

        let files = match &revisions.base {
            Some(base) => {
                let base_tree = self.repo.resolve_commit(base)?.tree()?;
                self.repo.changed_files(&base_tree, &head_tree)?
            }
            None => {
                info!("No base revision, treating every file under the watched root as changed");
                self.repo.all_files(&head_tree, &self.watched_root)?
            }
        };
        debug!(count = files.len(), "Changed files");

        let items = collect_work_items(&files, &self.watched_root, &self.ignore, |dir| {
            tree_has_dir(&head_tree, dir)
        });
        info!(count = items.len(), "Detected work items");
        Ok(items)
    }
}

/// 変更ファイル一覧からワークアイテムを求める
///
/// 1. 監視ルート配下のファイルに絞る
/// 2. 除外リストに一致するファイルを落とす
/// 3. 監視ルート直下のディレクトリに写像する（ルート直下のファイルは対象外）
/// 4. head ツリーに存在しないディレクトリ（丸ごと削除されたもの）を落とす
/// 5. 重複を除く（結果はパス順）
pub fn collect_work_items<S, F>(
    files: &[S],
    watched_root: &str,
    ignore: &IgnoreList,
    dir_exists: F,
) -> Vec<WorkItem>
where
    S: AsRef<str>,
    F: Fn(&str) -> bool,
{
    let root = normalize_path(watched_root);
    let mut dirs = BTreeSet::new();

    for file in files {
        let file = normalize_path(file.as_ref());
        if ignore.is_ignored(&file) {
            debug!(file = %file, "Ignored");
            continue;
        }
        if let Some(dir) = top_level_dir(&file, &root) {
            dirs.insert(dir);
        }
    }

    dirs.into_iter()
        .filter(|dir| {
            let exists = dir_exists(dir);
            if !exists {
                debug!(dir = %dir, "Directory no longer exists, skipping");
            }
            exists
        })
        .map(WorkItem::new)
        .collect()
}

/// `templated_tests/alpha/src/main.py` -> `templated_tests/alpha`
fn top_level_dir(file: &str, root: &str) -> Option<String> {
    let rest = if root.is_empty() {
        file
    } else {
        file.strip_prefix(root)?.strip_prefix('/')?
    };
    let (first, _) = rest.split_once('/')?;
    if first.is_empty() {
        return None;
    }
    if root.is_empty() {
        Some(first.to_string())
    } else {
        Some(format!("{}/{}", root, first))
    }
}
