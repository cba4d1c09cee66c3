//! ワークアイテムごとのビルド・プッシュパイプライン
//!
//! 1件ごとに「認証 → ビルド → 全タグのプッシュ」を直線的に実行します。
//! アイテム間で可変状態は共有しないため、任意の並行度で実行できます。

use crate::auth::RegistryAuth;
use crate::builder::ImageBuild;
use crate::error::BuildError;
use crate::progress::BuildProgress;
use crate::pusher::{ImagePublish, validate_tag};
use futures_util::stream::{self, StreamExt};
use indicatif::MultiProgress;
use pushflow_core::{
    FailureStage, ImageReference, ItemOutcome, ItemReport, LATEST_TAG, RunContext, WorkItem,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{error, info, warn};

pub struct ItemPipeline<B, P> {
    repo_root: PathBuf,
    ctx: RunContext,
    builder: B,
    pusher: P,
    auth: RegistryAuth,
    progress: Option<MultiProgress>,
}

impl<B, P> ItemPipeline<B, P>
where
    B: ImageBuild,
    P: ImagePublish,
{
    pub fn new(repo_root: PathBuf, ctx: RunContext, builder: B, pusher: P, auth: RegistryAuth) -> Self {
        Self {
            repo_root,
            ctx,
            builder,
            pusher,
            auth,
            progress: None,
        }
    }

    /// アイテムごとのスピナーを表示する
    pub fn with_progress(mut self, multi: MultiProgress) -> Self {
        self.progress = Some(multi);
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// 全アイテムを処理して結果を集める
    ///
    /// `concurrency` が 0 の場合は上限なし。1件の失敗は他のアイテムに影響しません。
    pub async fn run_all(&self, items: &[WorkItem], concurrency: usize) -> Vec<ItemReport> {
        let limit = if concurrency == 0 {
            items.len().max(1)
        } else {
            concurrency
        };
        info!(items = items.len(), concurrency = limit, "Processing work items");

        // 同じイメージ名に写像されるアイテムは互いのタグを上書きするため、どちらもビルドしない
        let collisions = name_collisions(items, &self.ctx);
        let (colliding, unique): (Vec<&WorkItem>, Vec<&WorkItem>) = items
            .iter()
            .partition(|item| collisions.contains(&item.path));

        let mut reports: Vec<ItemReport> = colliding
            .into_iter()
            .map(|item| collision_report(item, &self.ctx))
            .collect();
        let processed: Vec<ItemReport> = stream::iter(unique)
            .map(|item| self.process(item))
            .buffer_unordered(limit)
            .collect()
            .await;
        reports.extend(processed);
        reports
    }

    /// 1件のワークアイテムをビルドしてプッシュする
    #[tracing::instrument(skip(self), fields(path = %item.path))]
    pub async fn process(&self, item: &WorkItem) -> ItemReport {
        let reference = ImageReference::for_item(item, &self.ctx);
        let progress = self
            .progress
            .as_ref()
            .map(|multi| BuildProgress::new(multi, &reference.name));

        let outcome = self.publish(item, &reference, progress.as_ref()).await;

        if let Some(progress) = &progress {
            match &outcome {
                ItemOutcome::Pushed { image, .. } => progress.finish_success(image),
                ItemOutcome::Planned { image, .. } => progress.finish_planned(image),
                ItemOutcome::Failed { stage, .. } => progress.finish_error(&stage.to_string()),
            }
        }

        ItemReport {
            path: item.path.clone(),
            outcome,
        }
    }

    async fn publish(
        &self,
        item: &WorkItem,
        reference: &ImageReference,
        progress: Option<&BuildProgress>,
    ) -> ItemOutcome {
        let repository = reference.repository();
        let set_message = |msg: &str| {
            if let Some(progress) = progress {
                progress.set_message(msg);
            }
        };

        if self.ctx.dry_run {
            info!(image = %repository, tags = ?reference.tags, "Dry run, skipping build and push");
            return ItemOutcome::Planned {
                image: repository,
                tags: reference.tags.clone(),
            };
        }

        // 無効なタグではビルドを始めない
        if let Some(err) = reference.tags.iter().find_map(|tag| validate_tag(tag).err()) {
            return failed(FailureStage::Push, &err, Vec::new());
        }
        if self.ctx.revision_short_hash == LATEST_TAG {
            let err = BuildError::InvalidTag {
                tag: format!("'{}' is reserved for the default branch", LATEST_TAG),
            };
            return failed(FailureStage::Push, &err, Vec::new());
        }

        set_message("authenticating...");
        let session = match self.auth.login(&repository) {
            Ok(session) => session,
            Err(err) => return failed(FailureStage::Auth, &err, Vec::new()),
        };

        set_message("building...");
        let context_dir = self.repo_root.join(&item.path);
        if let Err(err) = self.builder.build(&context_dir, reference, &self.ctx).await {
            return failed(err.stage(), &err, Vec::new());
        }

        // 途中で失敗してもプッシュ済みのタグは取り消さない
        let mut pushed = Vec::new();
        for tag in &reference.tags {
            set_message(&format!("pushing {}...", tag));
            match self.pusher.push(&repository, tag, &session).await {
                Ok(_) => pushed.push(tag.clone()),
                Err(err) => {
                    let stage = match err.stage() {
                        FailureStage::Auth => FailureStage::Auth,
                        _ => FailureStage::Push,
                    };
                    return failed(stage, &err, pushed);
                }
            }
        }
        drop(session);

        ItemOutcome::Pushed {
            image: repository,
            tags: pushed,
        }
    }
}

/// ドライランの計画を立てる（Docker には一切触れない）
pub fn plan_items(items: &[WorkItem], ctx: &RunContext) -> Vec<ItemReport> {
    let collisions = name_collisions(items, ctx);
    items
        .iter()
        .map(|item| {
            if collisions.contains(&item.path) {
                return collision_report(item, ctx);
            }
            let reference = ImageReference::for_item(item, ctx);
            let image = reference.repository();
            info!(image = %image, tags = ?reference.tags, "Dry run, skipping build and push");
            ItemReport {
                path: item.path.clone(),
                outcome: ItemOutcome::Planned {
                    image,
                    tags: reference.tags,
                },
            }
        })
        .collect()
}

/// 小文字化した結果、同じリポジトリ名になるアイテムのパス
pub fn name_collisions(items: &[WorkItem], ctx: &RunContext) -> BTreeSet<String> {
    let mut by_repository: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for item in items {
        by_repository
            .entry(ImageReference::for_item(item, ctx).repository())
            .or_default()
            .push(&item.path);
    }

    by_repository
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .flat_map(|(repository, paths)| {
            warn!(image = %repository, paths = ?paths, "Work items map to the same image");
            paths.into_iter().map(str::to_string)
        })
        .collect()
}

fn collision_report(item: &WorkItem, ctx: &RunContext) -> ItemReport {
    let repository = ImageReference::for_item(item, ctx).repository();
    let err = BuildError::InvalidConfig(format!(
        "image name '{}' is shared with another directory",
        repository
    ));
    ItemReport {
        path: item.path.clone(),
        outcome: failed(FailureStage::Build, &err, Vec::new()),
    }
}

fn failed(stage: FailureStage, err: &BuildError, pushed_tags: Vec<String>) -> ItemOutcome {
    error!(stage = %stage, pushed = ?pushed_tags, "{}", err.user_message());
    ItemOutcome::Failed {
        stage,
        message: err.to_string(),
        pushed_tags,
    }
}
