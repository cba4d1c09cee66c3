use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("リビジョンを解決できません: {revision}\n理由: {message}")]
    VcsResolution { revision: String, message: String },

    #[error("Gitリポジトリを開けません: {path}\n理由: {message}")]
    RepositoryOpen { path: PathBuf, message: String },

    #[error("無効な除外パターン '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Gitエラー: {0}")]
    Git(#[from] git2::Error),
}

pub type Result<T> = std::result::Result<T, DetectError>;
