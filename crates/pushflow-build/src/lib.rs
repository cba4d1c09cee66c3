//! pushflow のイメージビルド・プッシュ機能
//!
//! ビルドコンテキストの作成、イメージのビルド、レジストリ認証、
//! 複数タグのプッシュ、そしてワークアイテムごとのパイプラインを提供します。

pub mod auth;
pub mod builder;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod pusher;

pub use auth::{AuthSession, RegistryAuth, RegistryCredentials};
pub use builder::{ImageBuild, ImageBuilder};
pub use context::ContextBuilder;
pub use error::{BuildError, BuildResult};
pub use pipeline::{ItemPipeline, name_collisions, plan_items};
pub use progress::BuildProgress;
pub use pusher::{ImagePublish, ImagePusher, validate_tag};
