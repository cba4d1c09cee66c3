use super::context::RunContext;
use super::work_item::WorkItem;
use serde::Serialize;

pub const LATEST_TAG: &str = "latest";

/// プッシュ先のイメージ参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub registry_namespace: String,
    pub name: String,
    /// 常に空でない。先頭はリビジョン由来のタグ
    pub tags: Vec<String>,
}

impl ImageReference {
    /// ワークアイテムと実行コンテキストからイメージ参照を導出
    pub fn for_item(item: &WorkItem, ctx: &RunContext) -> Self {
        Self {
            registry_namespace: ctx.registry_namespace.trim_end_matches('/').to_string(),
            name: item.name(&ctx.watched_root).to_lowercase(),
            tags: compute_tags(&ctx.revision_short_hash, ctx.default_branch),
        }
    }

    /// タグなしのリポジトリ名（例: `ghcr.io/org/foo`）
    pub fn repository(&self) -> String {
        if self.registry_namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.registry_namespace, self.name)
        }
    }

    /// 先頭タグ付きの完全なイメージ名
    pub fn primary(&self) -> String {
        format!("{}:{}", self.repository(), self.tags[0])
    }

    /// 全タグ分の完全なイメージ名
    pub fn full_names(&self) -> Vec<String> {
        let repository = self.repository();
        self.tags
            .iter()
            .map(|tag| format!("{}:{}", repository, tag))
            .collect()
    }
}

/// タグを計算
///
/// リビジョン由来のタグは常に含み、デフォルトブランチの場合のみ `latest` を追加します。
pub fn compute_tags(revision_short_hash: &str, default_branch: bool) -> Vec<String> {
    let mut tags = vec![revision_short_hash.to_string()];
    if default_branch && revision_short_hash != LATEST_TAG {
        tags.push(LATEST_TAG.to_string());
    }
    tags
}
