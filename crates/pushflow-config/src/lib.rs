pub mod error;

pub use error::*;

use pushflow_core::DEFAULT_WATCHED_ROOT;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// デフォルトブランチ名のデフォルト値
pub const DEFAULT_BRANCH: &str = "main";

/// 設定ファイルの候補（優先順）
pub const CONFIG_CANDIDATES: [&str; 3] = ["pushflow.local.yaml", "pushflow.yaml", ".pushflow.yaml"];

/// プロジェクト設定（pushflow.yaml）
///
/// ```yaml
/// watched_root: templated_tests
/// ignore:
///   - templated_tests/README.md
/// registry:
///   namespace: ghcr.io/my-org
/// default_branch: main
/// concurrency: 4
/// platform: linux/amd64
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub watched_root: Option<String>,
    pub ignore: Vec<String>,
    pub registry: RegistryConfig,
    pub default_branch: Option<String>,
    pub concurrency: Option<usize>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub namespace: Option<String>,
}

impl ProjectConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        // 空ファイルは全てデフォルト
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn watched_root(&self) -> &str {
        self.watched_root.as_deref().unwrap_or(DEFAULT_WATCHED_ROOT)
    }

    pub fn default_branch(&self) -> &str {
        self.default_branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }
}

/// プロジェクトの設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 PUSHFLOW_CONFIG_PATH (直接パス指定。存在しなければエラー)
/// 2. リポジトリルート: pushflow.local.yaml, pushflow.yaml, .pushflow.yaml
/// 3. ./.pushflow/ ディレクトリ内: 同様の順序
///
/// 見つからない場合は `Ok(None)`（設定ファイルは任意）
pub fn find_config_file(repo_root: &Path) -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("PUSHFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ExplicitPathNotFound(path));
    }

    // 2. リポジトリルートで検索
    for filename in &CONFIG_CANDIDATES {
        let path = repo_root.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. ./.pushflow/ ディレクトリで検索
    let config_dir = repo_root.join(".pushflow");
    if config_dir.is_dir() {
        for filename in &CONFIG_CANDIDATES {
            let path = config_dir.join(filename);
            if path.exists() {
                return Ok(Some(path));
            }
        }
    }

    Ok(None)
}

/// 設定ファイルを読み込む（見つからなければデフォルト）
pub fn load_config(repo_root: &Path) -> Result<(ProjectConfig, Option<PathBuf>)> {
    let Some(path) = find_config_file(repo_root)? else {
        tracing::debug!("No pushflow config file found under {}", repo_root.display());
        return Ok((ProjectConfig::default(), None));
    };

    tracing::debug!("Loading config: {}", path.display());
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = ProjectConfig::parse(&content, &path)?;
    Ok((config, Some(path)))
}
