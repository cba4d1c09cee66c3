//! pushflow build コマンドハンドラ
//!
//! 変更検出を行わず、指定された1ディレクトリだけをビルド・プッシュします。

use crate::PublishArgs;
use crate::settings::Workspace;
use pushflow_core::WorkItem;

pub async fn handle(
    workspace: &Workspace,
    watched_root: Option<&str>,
    path: &str,
    head: &str,
    publish: &PublishArgs,
) -> anyhow::Result<()> {
    let watched_root = workspace.watched_root(watched_root);
    let item = WorkItem::new(path);
    if item.path.is_empty() {
        return Err(anyhow::anyhow!("ビルド対象のディレクトリを指定してください"));
    }
    if !workspace.root.join(&item.path).is_dir() {
        return Err(anyhow::anyhow!(
            "ビルド対象のディレクトリが見つかりません: {}",
            item.path
        ));
    }

    let ctx = workspace.run_context(publish, &watched_root, head)?;
    let items = [item];

    super::run::print_header(workspace, &ctx, &items);
    let report = super::run::execute(workspace, ctx, &items, publish).await?;
    super::run::finish(&report, None)
}
