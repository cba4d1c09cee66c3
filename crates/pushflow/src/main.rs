mod commands;
mod docker;
mod settings;
mod utils;

use clap::{Args, Parser, Subcommand};
use pushflow_build::RegistryCredentials;
use settings::Workspace;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pushflow")]
#[command(about = "変更されたディレクトリだけを、ビルドしてレジストリへ。", long_about = None)]
struct Cli {
    /// デバッグログを出力
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 変更されたディレクトリ（ワークアイテム）を検出
    Detect {
        #[command(flatten)]
        repo: RepoArgs,
        #[command(flatten)]
        revisions: RevisionArgs,
        /// 検出から除外するパスまたはglobパターン（複数指定可）
        #[arg(long = "ignore", value_name = "PATTERN")]
        ignore: Vec<String>,
        /// マトリクス形式のJSONで出力
        #[arg(long)]
        json: bool,
        /// key=value 形式の出力ファイルに追記（例: "$GITHUB_OUTPUT"）
        #[arg(long, env = "PUSHFLOW_OUTPUT_FILE", value_name = "FILE")]
        output_file: Option<PathBuf>,
    },
    /// 1つのディレクトリをビルドしてプッシュ
    Build {
        /// ビルド対象のディレクトリ（リポジトリルートからの相対パス）
        path: String,
        #[command(flatten)]
        repo: RepoArgs,
        /// タグを導出するリビジョン
        #[arg(long, env = "PUSHFLOW_HEAD", default_value = "HEAD")]
        head: String,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// 変更を検出し、全ワークアイテムをビルドしてプッシュ
    Run {
        #[command(flatten)]
        repo: RepoArgs,
        #[command(flatten)]
        revisions: RevisionArgs,
        /// 検出から除外するパスまたはglobパターン（複数指定可）
        #[arg(long = "ignore", value_name = "PATTERN")]
        ignore: Vec<String>,
        #[command(flatten)]
        publish: PublishArgs,
        /// 実行結果をJSONで書き出す
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

#[derive(Args, Debug)]
pub(crate) struct RepoArgs {
    /// リポジトリのパス（親ディレクトリも探索）
    #[arg(long, env = "PUSHFLOW_REPO", default_value = ".")]
    pub repo: PathBuf,
    /// 監視ルート。直下のディレクトリがそれぞれビルド単位になる
    #[arg(long, env = "PUSHFLOW_WATCHED_ROOT")]
    pub watched_root: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct RevisionArgs {
    /// 比較元リビジョン（省略時は head ツリー全体を変更とみなす）
    #[arg(long, env = "PUSHFLOW_BASE")]
    pub base: Option<String>,
    /// 比較先リビジョン
    #[arg(long, env = "PUSHFLOW_HEAD", default_value = "HEAD")]
    pub head: String,
}

#[derive(Args, Debug)]
pub(crate) struct PublishArgs {
    /// レジストリ名前空間（例: ghcr.io/my-org）
    #[arg(long, env = "PUSHFLOW_REGISTRY_NAMESPACE")]
    pub namespace: Option<String>,
    /// リビジョン由来のタグ（省略時は head の短縮ハッシュ）
    #[arg(long, env = "PUSHFLOW_SHA")]
    pub sha: Option<String>,
    /// デフォルトブランチ上の実行として latest タグも付ける
    #[arg(
        long,
        env = "PUSHFLOW_DEFAULT_BRANCH_FLAG",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub default_branch: Option<bool>,
    /// トリガーとなったブランチ名（--default-branch 未指定時の判定に使用）
    #[arg(long, env = "GITHUB_REF_NAME")]
    pub ref_name: Option<String>,
    /// レジストリのユーザー名
    #[arg(long, env = "PUSHFLOW_REGISTRY_USERNAME")]
    pub registry_username: Option<String>,
    /// レジストリのシークレット（環境変数での指定を推奨）
    #[arg(long, env = "PUSHFLOW_REGISTRY_SECRET", hide_env_values = true)]
    pub registry_secret: Option<String>,
    /// ターゲットプラットフォーム（例: linux/amd64）
    #[arg(long, env = "PUSHFLOW_PLATFORM")]
    pub platform: Option<String>,
    /// キャッシュを使用しない
    #[arg(long)]
    pub no_cache: bool,
    /// ビルド・プッシュせずに計画だけ表示
    #[arg(long)]
    pub dry_run: bool,
    /// 同時に処理するアイテム数（0 は上限なし）
    #[arg(short = 'j', long, env = "PUSHFLOW_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

impl PublishArgs {
    /// ユーザー名とシークレットの両方があれば明示的な認証情報として扱う
    pub fn credentials(&self) -> anyhow::Result<Option<RegistryCredentials>> {
        match (&self.registry_username, &self.registry_secret) {
            (Some(user), Some(secret)) => Ok(Some(RegistryCredentials::new(user, secret))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(anyhow::anyhow!(
                "PUSHFLOW_REGISTRY_SECRET が設定されていません（ユーザー名のみ指定されています）"
            )),
            (None, Some(_)) => Err(anyhow::anyhow!(
                "PUSHFLOW_REGISTRY_USERNAME が設定されていません（シークレットのみ指定されています）"
            )),
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout は検出結果（JSON）用に空けておく
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Version => {
            println!("pushflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Detect {
            repo,
            revisions,
            ignore,
            json,
            output_file,
        } => {
            let workspace = Workspace::load(&repo.repo)?;
            commands::detect::handle(
                &workspace,
                repo.watched_root.as_deref(),
                &ignore,
                &revisions,
                json,
                output_file.as_deref(),
            )?;
        }
        Commands::Build {
            path,
            repo,
            head,
            publish,
        } => {
            let workspace = Workspace::load(&repo.repo)?;
            commands::build::handle(
                &workspace,
                repo.watched_root.as_deref(),
                &path,
                &head,
                &publish,
            )
            .await?;
        }
        Commands::Run {
            repo,
            revisions,
            ignore,
            publish,
            report,
        } => {
            let workspace = Workspace::load(&repo.repo)?;
            commands::run::handle(
                &workspace,
                repo.watched_root.as_deref(),
                &ignore,
                &revisions,
                &publish,
                report.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}
