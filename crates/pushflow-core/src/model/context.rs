use super::work_item::DEFAULT_WATCHED_ROOT;

/// 実行コンテキスト
///
/// CIホストが暗黙に持っている「現在のブランチ」「コミット」などを明示的に表します。
/// ビルダーとプッシャーの両方に不変な値として渡されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// 監視ルート（例: `templated_tests`）
    pub watched_root: String,
    /// レジストリ名前空間（例: `ghcr.io/org`）。空ならイメージ名のみ
    pub registry_namespace: String,
    /// トリガーとなったコミットの短縮ハッシュ
    pub revision_short_hash: String,
    /// デフォルトブランチ上の実行かどうか（`latest` タグの有無）
    pub default_branch: bool,
    /// ターゲットプラットフォーム（例: `linux/amd64`）
    pub platform: Option<String>,
    pub no_cache: bool,
    /// ビルド・プッシュを行わず、計画だけを表示する
    pub dry_run: bool,
}

impl RunContext {
    pub fn new(revision_short_hash: impl Into<String>, default_branch: bool) -> Self {
        Self {
            watched_root: DEFAULT_WATCHED_ROOT.to_string(),
            registry_namespace: String::new(),
            revision_short_hash: revision_short_hash.into(),
            default_branch,
            platform: None,
            no_cache: false,
            dry_run: false,
        }
    }

    pub fn with_watched_root(mut self, watched_root: impl Into<String>) -> Self {
        self.watched_root = watched_root.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.registry_namespace = namespace.into();
        self
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
