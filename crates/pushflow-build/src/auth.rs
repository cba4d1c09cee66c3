//! レジストリ認証処理
//!
//! 明示的に渡された認証情報（環境変数由来）を優先し、
//! なければ Docker config.json から認証情報を取得して Bollard の DockerCredentials に変換します。

use crate::error::{BuildError, BuildResult};
use base64::Engine;
use bollard::auth::DockerCredentials;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Docker config.json の構造
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfig {
    /// 認証情報 (レジストリ -> AuthEntry)
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    /// credential helper 名 (例: "osxkeychain", "desktop")
    #[serde(default)]
    creds_store: Option<String>,
}

/// 認証エントリ
#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64エンコードされた "username:password"
    auth: Option<String>,
}

/// credential helper からのレスポンス
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialResponse {
    username: String,
    secret: String,
}

/// ユーザー名とシークレットの組
///
/// シークレットの中身はログにもデバッグ出力にも出しません。
#[derive(Clone)]
pub struct RegistryCredentials {
    username: String,
    secret: String,
}

impl RegistryCredentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn to_docker(&self, registry: &str) -> DockerCredentials {
        DockerCredentials {
            username: Some(self.username.clone()),
            password: Some(self.secret.clone()),
            serveraddress: Some(registry.to_string()),
            ..Default::default()
        }
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

/// 認証済みセッション
///
/// プッシュが終わるまで保持し、成功・失敗に関わらずスコープを抜けた時点で破棄されます。
pub struct AuthSession {
    registry: String,
    credentials: Option<DockerCredentials>,
}

impl AuthSession {
    pub fn anonymous(registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            credentials: None,
        }
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn is_anonymous(&self) -> bool {
        self.credentials.is_none()
    }

    pub fn credentials(&self) -> Option<DockerCredentials> {
        self.credentials.clone()
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("registry", &self.registry)
            .field("anonymous", &self.is_anonymous())
            .finish()
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        tracing::debug!(registry = %self.registry, "Registry session released");
    }
}

/// レジストリ認証を管理
#[derive(Debug)]
pub struct RegistryAuth {
    config_path: PathBuf,
    explicit: Option<RegistryCredentials>,
}

impl Default for RegistryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryAuth {
    /// 新しい RegistryAuth を作成
    ///
    /// デフォルトで ~/.docker/config.json を使用
    pub fn new() -> Self {
        let config_path = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json");

        Self {
            config_path,
            explicit: None,
        }
    }

    /// 指定したパスの config.json を使用
    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self {
            config_path,
            explicit: None,
        }
    }

    /// 明示的な認証情報を設定（config.json より優先）
    pub fn with_credentials(mut self, credentials: Option<RegistryCredentials>) -> Self {
        self.explicit = credentials;
        self
    }

    /// イメージのレジストリに対する認証済みセッションを取得
    ///
    /// 認証情報が見つからない場合は匿名セッションを返します（プッシュ時にレジストリが拒否します）。
    pub fn login(&self, image: &str) -> BuildResult<AuthSession> {
        let registry = self.extract_registry(image);

        if let Some(explicit) = &self.explicit {
            if explicit.username.is_empty() || explicit.secret.is_empty() {
                return Err(BuildError::AuthFailed {
                    registry,
                    message: "username and secret must both be set".to_string(),
                });
            }
            tracing::debug!(registry = %registry, user = %explicit.username, "Using explicit credentials");
            return Ok(AuthSession {
                credentials: Some(explicit.to_docker(&registry)),
                registry,
            });
        }

        match self.get_credentials(&registry)? {
            Some(credentials) => Ok(AuthSession {
                registry,
                credentials: Some(credentials),
            }),
            None => {
                tracing::warn!(registry = %registry, "No credentials found, pushing anonymously");
                Ok(AuthSession::anonymous(registry))
            }
        }
    }

    /// config.json からレジストリの認証情報を取得
    ///
    /// # Returns
    /// * `Ok(Some(credentials))` - 認証情報が見つかった場合
    /// * `Ok(None)` - 認証情報が不要または見つからない場合
    /// * `Err(e)` - 認証情報の取得に失敗した場合
    pub fn get_credentials(&self, registry: &str) -> BuildResult<Option<DockerCredentials>> {
        // config.json が存在しない場合は認証なしで続行
        if !self.config_path.exists() {
            tracing::debug!("Docker config.json not found at {:?}", self.config_path);
            return Ok(None);
        }

        let config = self.load_docker_config()?;

        // 1. auths セクションを確認
        if let Some(auth_entry) = config.auths.get(registry)
            && let Some(auth_b64) = &auth_entry.auth
            && let Some(creds) = self.decode_auth(auth_b64, registry)?
        {
            tracing::debug!("Found credentials in auths for {}", registry);
            return Ok(Some(creds));
        }

        // 2. credential helper を確認
        if let Some(helper) = &config.creds_store {
            tracing::debug!("Trying credential helper: {}", helper);
            if let Ok(Some(creds)) = self.get_from_helper(helper, registry) {
                return Ok(Some(creds));
            }
        }

        tracing::debug!("No credentials found for {}", registry);
        Ok(None)
    }

    /// イメージ名からレジストリを抽出
    ///
    /// # Examples
    /// - `ghcr.io/org/app:tag` -> `ghcr.io`
    /// - `myuser/app:tag` -> `docker.io`
    /// - `localhost:5000/app` -> `localhost:5000`
    pub fn extract_registry(&self, image: &str) -> String {
        if let Some((first, _)) = image.split_once('/') {
            // `.` か `:` を含む先頭要素はレジストリ（例: ghcr.io, localhost:5000）
            if first.contains('.') || first.contains(':') || first == "localhost" {
                return first.to_string();
            }
        }

        // デフォルトは Docker Hub
        "docker.io".to_string()
    }

    /// Docker config.json を読み込み
    fn load_docker_config(&self) -> BuildResult<DockerConfig> {
        let content =
            std::fs::read_to_string(&self.config_path).map_err(|e| BuildError::AuthFailed {
                registry: self.config_path.display().to_string(),
                message: format!("Failed to read config.json: {}", e),
            })?;

        serde_json::from_str(&content).map_err(|e| BuildError::AuthFailed {
            registry: self.config_path.display().to_string(),
            message: format!("Failed to parse config.json: {}", e),
        })
    }

    /// Base64エンコードされた認証情報をデコード
    fn decode_auth(
        &self,
        auth_b64: &str,
        registry: &str,
    ) -> BuildResult<Option<DockerCredentials>> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(auth_b64)
            .map_err(|e| BuildError::AuthFailed {
                registry: registry.to_string(),
                message: format!("Failed to decode auth: {}", e),
            })?;

        let auth_str = String::from_utf8(decoded).map_err(|e| BuildError::AuthFailed {
            registry: registry.to_string(),
            message: format!("Invalid UTF-8 in auth: {}", e),
        })?;

        Ok(auth_str
            .split_once(':')
            .map(|(username, password)| RegistryCredentials::new(username, password).to_docker(registry)))
    }

    /// credential helper から認証情報を取得
    fn get_from_helper(
        &self,
        helper: &str,
        registry: &str,
    ) -> BuildResult<Option<DockerCredentials>> {
        let helper_cmd = format!("docker-credential-{}", helper);

        let mut child = Command::new(&helper_cmd)
            .arg("get")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::AuthFailed {
                registry: registry.to_string(),
                message: format!("Failed to run {}: {}", helper_cmd, e),
            })?;

        // レジストリ名を stdin に渡す
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(registry.as_bytes()).ok();
        }

        let output = child
            .wait_with_output()
            .map_err(|e| BuildError::AuthFailed {
                registry: registry.to_string(),
                message: format!("Credential helper failed: {}", e),
            })?;

        if !output.status.success() {
            tracing::debug!(
                "Credential helper returned error for {}: {}",
                registry,
                String::from_utf8_lossy(&output.stderr)
            );
            return Ok(None);
        }

        let response: CredentialResponse =
            serde_json::from_slice(&output.stdout).map_err(|e| BuildError::AuthFailed {
                registry: registry.to_string(),
                message: format!("Failed to parse credential helper response: {}", e),
            })?;

        Ok(Some(
            RegistryCredentials::new(response.username, response.secret).to_docker(registry),
        ))
    }
}
