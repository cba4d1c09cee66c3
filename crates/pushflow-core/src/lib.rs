//! pushflow のコア機能
//!
//! 変更検出（どのディレクトリがビルド対象か）と、
//! ビルド・プッシュで共有するデータモデルを提供します。

pub mod detector;
pub mod error;
pub mod ignore;
pub mod model;
pub mod vcs;

pub use detector::{ChangeDetector, collect_work_items};
pub use error::{DetectError, Result};
pub use ignore::IgnoreList;
pub use model::*;
pub use vcs::Revisions;
