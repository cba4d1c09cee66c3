use pushflow_core::FailureStage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("Registry authentication failed for {registry}: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("Push failed for tag '{tag}': {message}")]
    PushFailed { tag: String, message: String },

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// このエラーが属する工程
    pub fn stage(&self) -> FailureStage {
        match self {
            BuildError::AuthFailed { .. } => FailureStage::Auth,
            BuildError::PushFailed { .. } | BuildError::InvalidTag { .. } => FailureStage::Push,
            _ => FailureStage::Build,
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DockerfileNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     解決方法:\n\
                     1. 変更されたディレクトリ直下に Dockerfile を置いてください\n\
                     2. ビルド対象外のディレクトリは ignore に追加してください",
                    path.display()
                )
            }
            BuildError::BuildFailed(msg) => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     Dockerfileの内容を確認してください。",
                    msg
                )
            }
            BuildError::AuthFailed { registry, message } => {
                format!(
                    "レジストリ認証に失敗しました ({}): {}\n\
                     \n\
                     PUSHFLOW_REGISTRY_USERNAME / PUSHFLOW_REGISTRY_SECRET を確認してください。",
                    registry, message
                )
            }
            BuildError::PushFailed { tag, message } => {
                format!(
                    "タグ '{}' のプッシュに失敗しました: {}\n\
                     \n\
                     それ以前にプッシュ済みのタグは残ります。",
                    tag, message
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
