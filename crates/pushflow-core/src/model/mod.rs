//! モデル定義
//!
//! 1回の実行の中だけで生きるデータモデルです。永続化はしません。

mod context;
mod image;
mod report;
mod work_item;

// Re-exports
pub use context::*;
pub use image::*;
pub use report::*;
pub use work_item::*;
