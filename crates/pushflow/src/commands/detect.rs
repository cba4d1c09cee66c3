//! pushflow detect コマンドハンドラ

use crate::RevisionArgs;
use crate::settings::Workspace;
use crate::utils;
use colored::Colorize;
use pushflow_core::{ChangeDetector, Revisions, WorkItem};
use std::path::Path;

/// 変更されたワークアイテムを求める（run からも使う）
pub fn detect_items(
    workspace: &Workspace,
    watched_root: &str,
    ignore: &[String],
    revisions: &RevisionArgs,
) -> anyhow::Result<Vec<WorkItem>> {
    let ignore = workspace.ignore_list(ignore)?;
    let detector = ChangeDetector::open(&workspace.root, watched_root, ignore)?;
    let revisions = Revisions::new(revisions.base.clone(), revisions.head.clone());
    Ok(detector.detect(&revisions)?)
}

pub fn handle(
    workspace: &Workspace,
    watched_root: Option<&str>,
    ignore: &[String],
    revisions: &RevisionArgs,
    json: bool,
    output_file: Option<&Path>,
) -> anyhow::Result<()> {
    let watched_root = workspace.watched_root(watched_root);
    let items = detect_items(workspace, &watched_root, ignore, revisions)?;

    if let Some(output_file) = output_file {
        utils::append_outputs(output_file, &items)?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string(&utils::matrix_json(&items, &watched_root))?
        );
        return Ok(());
    }

    if items.is_empty() {
        println!("{}", "変更されたワークアイテムはありません".dimmed());
        return Ok(());
    }

    println!("{}", "変更されたワークアイテム:".bold());
    for item in &items {
        println!("  • {}", item.path.cyan());
    }
    Ok(())
}
