use crate::context::{ContextBuilder, DOCKERFILE};
use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use futures_util::stream::StreamExt;
use pushflow_core::{ImageReference, RunContext};
use std::path::Path;

/// イメージビルドのトレイト
///
/// ビルドレシピは解釈せず、成功か失敗だけを返すブラックボックスとして扱います。
#[allow(async_fn_in_trait)]
pub trait ImageBuild {
    /// `context_dir` をビルドし、`reference` の全タグをローカルに付与する
    async fn build(
        &self,
        context_dir: &Path,
        reference: &ImageReference,
        ctx: &RunContext,
    ) -> BuildResult<()>;
}

/// Docker Engine API を使ったビルダー
pub struct ImageBuilder {
    docker: Docker,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをビルド
    pub async fn build_image(
        &self,
        context_data: Vec<u8>,
        tag: &str,
        platform: Option<&str>,
        no_cache: bool,
    ) -> BuildResult<()> {
        tracing::info!("Building image: {}", tag);

        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions::<String> {
            dockerfile: DOCKERFILE.to_string(),
            t: tag.to_string(),
            platform: platform.unwrap_or("").to_string(),
            nocache: no_cache,
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            pull: true,    // ベースイメージを常にpull
            ..Default::default()
        };

        tracing::debug!("Build options: {:?}", options);

        // ビルドストリームの開始
        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(output) => {
                    self.handle_build_output(tag, output)?;
                }
                Err(e) => {
                    return Err(BuildError::DockerConnection(e));
                }
            }
        }

        tracing::info!("Successfully built: {}", tag);
        Ok(())
    }

    /// ビルド済みイメージに追加のタグを付与
    pub async fn tag_image(&self, source: &str, repository: &str, tag: &str) -> BuildResult<()> {
        tracing::debug!("Tagging {} as {}:{}", source, repository, tag);

        #[allow(deprecated)]
        let options = bollard::image::TagImageOptions::<String> {
            repo: repository.to_string(),
            tag: tag.to_string(),
        };

        self.docker.tag_image(source, Some(options)).await?;
        Ok(())
    }

    /// ビルド出力の処理
    ///
    /// 複数アイテムを並行ビルドするため、標準出力には書かずにログへ流します。
    fn handle_build_output(&self, tag: &str, output: bollard::models::BuildInfo) -> BuildResult<()> {
        if let Some(stream) = output.stream {
            let line = stream.trim_end();
            if !line.is_empty() {
                tracing::debug!(image = %tag, "{}", line);
            }
        }

        if let Some(error) = output.error {
            return Err(BuildError::BuildFailed(error));
        }

        if let Some(error_detail) = output.error_detail {
            let error_msg = error_detail
                .message
                .unwrap_or_else(|| "Unknown build error".to_string());
            return Err(BuildError::BuildFailed(error_msg));
        }

        if let Some(status) = output.status {
            tracing::debug!(image = %tag, status = %status);
        }

        Ok(())
    }

    /// イメージの存在確認
    #[cfg(test)]
    async fn image_exists(&self, image_tag: &str) -> BuildResult<bool> {
        match self.docker.inspect_image(image_tag).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(BuildError::DockerConnection(e)),
        }
    }
}

impl ImageBuild for ImageBuilder {
    async fn build(
        &self,
        context_dir: &Path,
        reference: &ImageReference,
        ctx: &RunContext,
    ) -> BuildResult<()> {
        let dir = context_dir.to_path_buf();
        let context_data = tokio::task::spawn_blocking(move || ContextBuilder::create_context(&dir))
            .await
            .map_err(|e| BuildError::BuildFailed(format!("context task failed: {}", e)))??;

        let primary = reference.primary();
        self.build_image(context_data, &primary, ctx.platform.as_deref(), ctx.no_cache)
            .await?;

        let repository = reference.repository();
        for tag in reference.tags.iter().skip(1) {
            self.tag_image(&primary, &repository, tag).await?;
        }
        Ok(())
    }
}
