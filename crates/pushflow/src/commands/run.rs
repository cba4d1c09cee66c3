//! pushflow run コマンドハンドラ

use crate::settings::Workspace;
use crate::{PublishArgs, RevisionArgs, docker, utils};
use colored::Colorize;
use indicatif::MultiProgress;
use pushflow_build::{ImageBuilder, ImagePusher, ItemPipeline, RegistryAuth, plan_items};
use pushflow_core::{RunContext, RunReport, WorkItem, compute_tags};
use std::path::Path;

pub async fn handle(
    workspace: &Workspace,
    watched_root: Option<&str>,
    ignore: &[String],
    revisions: &RevisionArgs,
    publish: &PublishArgs,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let watched_root = workspace.watched_root(watched_root);
    // 検出失敗（リビジョン解決エラーなど）はビルド開始前に中断
    let items = super::detect::detect_items(workspace, &watched_root, ignore, revisions)?;
    let ctx = workspace.run_context(publish, &watched_root, &revisions.head)?;

    print_header(workspace, &ctx, &items);
    let report = execute(workspace, ctx, &items, publish).await?;
    finish(&report, report_path)
}

/// ワークアイテムをビルド・プッシュしてレポートを返す
pub async fn execute(
    workspace: &Workspace,
    ctx: RunContext,
    items: &[WorkItem],
    publish: &PublishArgs,
) -> anyhow::Result<RunReport> {
    let started_at = chrono::Utc::now();
    let revision = ctx.revision_short_hash.clone();
    let default_branch = ctx.default_branch;

    if items.is_empty() {
        return Ok(RunReport::new(revision, default_branch, started_at, Vec::new()));
    }

    let credentials = publish.credentials()?;
    if ctx.dry_run {
        let reports = plan_items(items, &ctx);
        return Ok(RunReport::new(revision, default_branch, started_at, reports));
    }

    let docker = docker::init_docker_with_error_handling().await?;

    let auth = RegistryAuth::new().with_credentials(credentials);
    let pipeline = ItemPipeline::new(
        workspace.root.clone(),
        ctx,
        ImageBuilder::new(docker.clone()),
        ImagePusher::new(docker),
        auth,
    )
    .with_progress(MultiProgress::new());

    let concurrency = workspace.concurrency(publish.concurrency);
    let reports = tokio::select! {
        reports = pipeline.run_all(items, concurrency) => reports,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            eprintln!("{}", "⚠ 中断されました".yellow());
            return Err(anyhow::anyhow!("ユーザーにより中断されました"));
        }
    };

    Ok(RunReport::new(revision, default_branch, started_at, reports))
}

pub fn print_header(workspace: &Workspace, ctx: &RunContext, items: &[WorkItem]) {
    if let Some(config_path) = &workspace.config_path {
        println!("📄 {}", config_path.display().to_string().dimmed());
    }

    let tags = compute_tags(&ctx.revision_short_hash, ctx.default_branch);
    println!(
        "{} {} 件  {} {}",
        "ワークアイテム:".bold(),
        items.len(),
        "タグ:".bold(),
        tags.join(", ").cyan()
    );
    if ctx.dry_run {
        println!("{}", "ドライラン: ビルド・プッシュは行いません".yellow());
    }
}

/// サマリー表示・レポート出力と終了判定
pub fn finish(report: &RunReport, report_path: Option<&Path>) -> anyhow::Result<()> {
    utils::print_report(report);

    if let Some(path) = report_path {
        utils::write_report(path, report)?;
    }

    if !report.is_success() {
        return Err(anyhow::anyhow!(
            "{} 件のアイテムが失敗しました",
            report.failures().count()
        ));
    }
    Ok(())
}
