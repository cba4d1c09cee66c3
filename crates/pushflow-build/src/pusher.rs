//! イメージプッシュ処理
//!
//! ビルドしたイメージをコンテナレジストリにプッシュします。

use crate::auth::AuthSession;
use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use bollard::models::PushImageInfo;
use futures_util::StreamExt;

/// イメージプッシュのトレイト
#[allow(async_fn_in_trait)]
pub trait ImagePublish {
    /// `repository:tag` をプッシュし、プッシュした完全なイメージ名を返す
    async fn push(&self, repository: &str, tag: &str, session: &AuthSession)
    -> BuildResult<String>;
}

/// Docker Engine API を使ったプッシャー
pub struct ImagePusher {
    docker: Docker,
}

impl ImagePusher {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// プッシュ進捗をログに出す
    fn handle_progress(&self, image: &str, info: &PushImageInfo, last_status: &mut String) {
        if let Some(status) = &info.status {
            match status.as_str() {
                // 準備中は表示をスキップ（ノイズ軽減）
                "Preparing" | "Waiting" | "Pushing" => {}
                "Pushed" | "Layer already exists" => {
                    tracing::debug!(image = %image, "{}", status);
                }
                _ => {
                    if status != last_status {
                        tracing::debug!(image = %image, "{}", status);
                        *last_status = status.clone();
                    }
                }
            }
        }
    }
}

impl ImagePublish for ImagePusher {
    async fn push(
        &self,
        repository: &str,
        tag: &str,
        session: &AuthSession,
    ) -> BuildResult<String> {
        let full_image = format!("{}:{}", repository, tag);

        validate_tag(tag)?;

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        tracing::info!("Pushing {}", full_image);

        #[allow(deprecated)]
        let mut stream = self
            .docker
            .push_image(repository, Some(options), session.credentials());

        let mut last_status = String::new();
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else {
                        self.handle_progress(&full_image, &info, &mut last_status);
                    }
                }
                Err(e) => {
                    return Err(classify_push_error(session, tag, e.to_string()));
                }
            }
        }

        if let Some(err) = error_message {
            return Err(classify_push_error(session, tag, err));
        }

        tracing::info!("Pushed {}", full_image);
        Ok(full_image)
    }
}

/// レジストリからの拒否は認証エラー、それ以外はプッシュエラーとして扱う
fn classify_push_error(session: &AuthSession, tag: &str, message: String) -> BuildError {
    let lower = message.to_lowercase();
    if lower.contains("unauthorized")
        || lower.contains("denied")
        || lower.contains("authentication required")
    {
        BuildError::AuthFailed {
            registry: session.registry().to_string(),
            message,
        }
    } else {
        BuildError::PushFailed {
            tag: tag.to_string(),
            message,
        }
    }
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(BuildError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}
