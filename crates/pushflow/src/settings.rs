//! CLI 引数・設定ファイル・デフォルト値の合成
//!
//! 優先順位は CLI（環境変数を含む） > pushflow.yaml > 組み込みデフォルト。

use crate::PublishArgs;
use pushflow_config::ProjectConfig;
use pushflow_core::{IgnoreList, LATEST_TAG, RunContext, vcs::GitRepo};
use std::path::{Path, PathBuf};

/// 同時処理数のデフォルト（0 は上限なし）
pub const DEFAULT_CONCURRENCY: usize = 0;

/// 対象リポジトリと、そこから読み込んだ設定
pub struct Workspace {
    pub repo: GitRepo,
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub config_path: Option<PathBuf>,
}

impl Workspace {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let repo = GitRepo::discover(path)?;
        let root = repo.root().to_path_buf();
        let (config, config_path) = pushflow_config::load_config(&root)?;

        if let Some(config_path) = &config_path {
            tracing::debug!("Using config {}", config_path.display());
        }

        Ok(Self {
            repo,
            root,
            config,
            config_path,
        })
    }

    pub fn watched_root(&self, cli: Option<&str>) -> String {
        cli.unwrap_or(self.config.watched_root())
            .trim_matches('/')
            .to_string()
    }

    /// 設定ファイルと CLI の除外パターンを合わせる
    pub fn ignore_list(&self, cli: &[String]) -> anyhow::Result<IgnoreList> {
        let entries = self.config.ignore.iter().chain(cli.iter());
        Ok(IgnoreList::new(entries)?)
    }

    pub fn concurrency(&self, cli: Option<usize>) -> usize {
        cli.or(self.config.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }

    /// ビルド・プッシュに使う実行コンテキストを組み立てる
    pub fn run_context(
        &self,
        publish: &PublishArgs,
        watched_root: &str,
        head: &str,
    ) -> anyhow::Result<RunContext> {
        let hash = match &publish.sha {
            Some(sha) => revision_tag(sha)?,
            None => self.repo.short_hash(head)?,
        };

        let branch = publish
            .ref_name
            .as_deref()
            .map(branch_from_ref)
            .or_else(|| self.repo.current_branch());
        let on_default_branch = resolve_default_branch(
            publish.default_branch,
            branch.as_deref(),
            self.config.default_branch(),
        );
        tracing::debug!(
            branch = ?branch,
            default_branch = on_default_branch,
            "Resolved branch"
        );

        let mut ctx = RunContext::new(hash, on_default_branch)
            .with_watched_root(watched_root)
            .with_platform(publish.platform.clone().or_else(|| self.config.platform.clone()))
            .with_no_cache(publish.no_cache)
            .with_dry_run(publish.dry_run);

        if let Some(namespace) = publish
            .namespace
            .as_deref()
            .or(self.config.registry.namespace.as_deref())
        {
            ctx = ctx.with_namespace(namespace);
        }

        Ok(ctx)
    }
}

/// リビジョン由来のタグとして使える値か確認する
///
/// `latest` はデフォルトブランチ専用のため、リビジョンタグには使えない。
pub fn revision_tag(sha: &str) -> anyhow::Result<String> {
    let sha = sha.trim();
    if sha.is_empty() {
        return Err(anyhow::anyhow!("--sha が空です"));
    }
    if sha == LATEST_TAG {
        return Err(anyhow::anyhow!(
            "--sha に '{}' は指定できません（デフォルトブランチ専用のタグです）",
            LATEST_TAG
        ));
    }
    Ok(sha.to_string())
}

/// `refs/heads/main` → `main`
pub fn branch_from_ref(reference: &str) -> String {
    reference
        .strip_prefix("refs/heads/")
        .unwrap_or(reference)
        .to_string()
}

/// 明示指定があればそれを、なければブランチ名とデフォルトブランチの一致で判定
pub fn resolve_default_branch(
    explicit: Option<bool>,
    branch: Option<&str>,
    default_branch: &str,
) -> bool {
    explicit.unwrap_or_else(|| branch == Some(default_branch))
}
