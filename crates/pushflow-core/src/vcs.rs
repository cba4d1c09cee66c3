//! Gitリポジトリへの問い合わせ
//!
//! リビジョン解決、ツリー間の差分、ブランチ名の取得を行います。

use crate::error::{DetectError, Result};
use git2::{Commit, DiffOptions, ObjectType, Repository, Tree, TreeWalkMode, TreeWalkResult};
use std::path::Path;
use tracing::debug;

/// 比較するリビジョンの組
///
/// `base` がない場合（ブランチの初回プッシュなど）はheadツリーの全ファイルを変更とみなします。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revisions {
    pub base: Option<String>,
    pub head: String,
}

impl Revisions {
    pub fn new(base: Option<String>, head: impl Into<String>) -> Self {
        // CIホストは新規ブランチの before に 0000... を渡してくる
        let base = base.filter(|b| {
            let b = b.trim();
            !b.is_empty() && !b.chars().all(|c| c == '0')
        });
        Self {
            base,
            head: head.into(),
        }
    }

    pub fn head_only(head: impl Into<String>) -> Self {
        Self::new(None, head)
    }
}

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// `path` またはその親ディレクトリからリポジトリを探して開く
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| DetectError::RepositoryOpen {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        Ok(Self { repo })
    }

    /// 作業ツリーのルート（bareリポジトリの場合は .git ディレクトリ）
    pub fn root(&self) -> &Path {
        self.repo.workdir().unwrap_or_else(|| self.repo.path())
    }

    pub fn resolve_commit(&self, revision: &str) -> Result<Commit<'_>> {
        self.repo
            .revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| DetectError::VcsResolution {
                revision: revision.to_string(),
                message: e.message().to_string(),
            })
    }

    /// コミットの短縮ハッシュ
    pub fn short_hash(&self, revision: &str) -> Result<String> {
        let commit = self.resolve_commit(revision)?;
        let short = commit.as_object().short_id()?;
        match short.as_str() {
            Some(s) => Ok(s.to_string()),
            None => Ok(commit.id().to_string()[..7].to_string()),
        }
    }

    /// HEAD が指しているブランチ名（detached HEAD の場合は None）
    pub fn current_branch(&self) -> Option<String> {
        let head = self.repo.head().ok()?;
        if head.is_branch() {
            head.shorthand().map(str::to_string)
        } else {
            None
        }
    }

    /// 2つのツリー間で変更されたファイル
    ///
    /// リネーム・削除も検出できるよう、変更前後の両方のパスを返します。
    pub fn changed_files(&self, base: &Tree<'_>, head: &Tree<'_>) -> Result<Vec<String>> {
        let mut opts = DiffOptions::new();
        let diff = self
            .repo
            .diff_tree_to_tree(Some(base), Some(head), Some(&mut opts))?;

        let mut files = Vec::new();
        for delta in diff.deltas() {
            debug!(status = ?delta.status(), "diff delta");
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path() {
                    let path = path.to_string_lossy().to_string();
                    if !files.contains(&path) {
                        files.push(path);
                    }
                }
            }
        }
        Ok(files)
    }

    /// ツリー内の全ファイル（`under` 配下のみ）
    pub fn all_files(&self, tree: &Tree<'_>, under: &str) -> Result<Vec<String>> {
        let prefix = if under.is_empty() {
            String::new()
        } else {
            format!("{}/", under)
        };

        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if !prefix.is_empty() && !root.starts_with(&prefix) && !prefix.starts_with(root) {
                return TreeWalkResult::Skip;
            }
            if entry.kind() == Some(ObjectType::Blob)
                && let Some(name) = entry.name()
            {
                let path = format!("{}{}", root, name);
                if path.starts_with(&prefix) {
                    files.push(path);
                }
            }
            TreeWalkResult::Ok
        })?;
        Ok(files)
    }
}

/// ツリー内にディレクトリが存在するか
pub fn tree_has_dir(tree: &Tree<'_>, dir: &str) -> bool {
    tree.get_path(Path::new(dir))
        .map(|entry| entry.kind() == Some(ObjectType::Tree))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_base_is_treated_as_absent() {
        let revs = Revisions::new(
            Some("0000000000000000000000000000000000000000".to_string()),
            "HEAD",
        );
        assert_eq!(revs.base, None);
    }

    #[test]
    fn test_empty_base_is_treated_as_absent() {
        assert_eq!(Revisions::new(Some("  ".to_string()), "HEAD").base, None);
    }

    #[test]
    fn test_base_is_kept() {
        let revs = Revisions::new(Some("HEAD~1".to_string()), "HEAD");
        assert_eq!(revs.base.as_deref(), Some("HEAD~1"));
    }

    #[test]
    fn test_discover_outside_repo_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitRepo::discover(&dir.path().join("missing"));
        assert!(matches!(result, Err(DetectError::RepositoryOpen { .. })));
    }
}
