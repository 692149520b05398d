use crate::domain::model::{AuthMode, DestinationConfig, LogContext, UploadPayload};
use crate::domain::ports::{LogSink, MediaUploader};
use crate::utils::error::{Result, TransferError};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const CATEGORY_PLACEHOLDER: &str = "{categoryId}";
const API_KEY_HEADER: &str = "x-api-key";

/// 由 endpoint 模板組出相對路徑，不做任何 I/O。
///
/// 去掉開頭的 `/`；有分類 ID 時替換 `{categoryId}`，沒有佔位符則附加 `/<id>`。
pub fn build_api_url(endpoint: &str, category_id: Option<&str>) -> String {
    let endpoint = endpoint.trim_start_matches('/');

    match category_id.filter(|id| !id.is_empty()) {
        Some(id) if endpoint.contains(CATEGORY_PLACEHOLDER) => {
            endpoint.replace(CATEGORY_PLACEHOLDER, id)
        }
        Some(id) => format!("{}/{}", endpoint.trim_end_matches('/'), id),
        None => endpoint.to_string(),
    }
}

/// 依驗證模式產生預設 header
fn auth_headers(config: &DestinationConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let (name, value) = match config.auth_mode {
        AuthMode::Bearer => (AUTHORIZATION, format!("Bearer {}", config.token)),
        AuthMode::OAuth => (AUTHORIZATION, format!("OAuth {}", config.token)),
        AuthMode::Jwt => (AUTHORIZATION, format!("JWT {}", config.token)),
        AuthMode::ApiKey => (HeaderName::from_static(API_KEY_HEADER), config.token.clone()),
        AuthMode::None => {
            let credentials = format!(
                "{}:{}",
                config.username.as_deref().unwrap_or_default(),
                config.password.as_deref().unwrap_or_default()
            );
            (AUTHORIZATION, format!("Basic {}", STANDARD.encode(credentials)))
        }
    };

    let mut value = HeaderValue::from_str(&value).map_err(|e| {
        TransferError::configuration(format!("Invalid {} credential: {}", config.auth_mode, e))
    })?;
    value.set_sensitive(true);
    headers.insert(name, value);

    Ok(headers)
}

/// 目的地 API 客戶端，持有一組已驗證的 HTTP 設定
pub struct DestinationClient {
    config: DestinationConfig,
    http: Client,
    base_url: Url,
    upload_method: Method,
    log: Arc<dyn LogSink>,
}

impl DestinationClient {
    pub fn new(config: DestinationConfig, log: Arc<dyn LogSink>) -> Result<Self> {
        let (http, base_url, upload_method) = Self::build(&config)?;
        Ok(Self {
            config,
            http,
            base_url,
            upload_method,
            log,
        })
    }

    /// 驗證後重建 HTTP 客戶端；舊的客戶端在替換時釋放
    pub fn configure(&mut self, config: DestinationConfig) -> Result<()> {
        let (http, base_url, upload_method) = Self::build(&config)?;
        self.http = http;
        self.base_url = base_url;
        self.upload_method = upload_method;
        self.config = config;

        self.log.log_info(
            &format!(
                "Destination configured: {} ({} auth)",
                self.base_url, self.config.auth_mode
            ),
            LogContext::new(),
        );
        Ok(())
    }

    fn build(config: &DestinationConfig) -> Result<(Client, Url, Method)> {
        config
            .validate()
            .map_err(|e| TransferError::configuration(e.to_string()))?;

        // 確保以 `/` 結尾，相對路徑才會接在 base 後面而不是取代最後一段
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            TransferError::configuration(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;

        let upload_method = Method::from_bytes(config.upload_method.to_ascii_uppercase().as_bytes())
            .map_err(|e| TransferError::configuration(format!("Invalid upload method: {}", e)))?;

        let mut builder = Client::builder().default_headers(auth_headers(config)?);
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let http = builder
            .build()
            .map_err(|e| TransferError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok((http, base_url, upload_method))
    }

    pub fn config(&self) -> &DestinationConfig {
        &self.config
    }

    pub fn build_api_url(&self, category_id: Option<&str>) -> String {
        build_api_url(&self.config.endpoint, category_id)
    }

    /// base URL 加上 `build_api_url` 的完整網址
    pub fn resolve_url(&self, category_id: Option<&str>) -> Result<Url> {
        let relative = self.build_api_url(category_id);
        self.base_url.join(&relative).map_err(|e| {
            TransferError::configuration(format!("Invalid endpoint '{}': {}", relative, e))
        })
    }

    /// 尚未實作真正的 token 更新：token 模式下以現有 token 重建客戶端
    pub async fn refresh_token(&mut self) -> Result<bool> {
        if self.config.auth_mode == AuthMode::None {
            return Ok(false);
        }

        let (http, _, _) = Self::build(&self.config)?;
        self.http = http;
        self.log.log_warning(
            &format!(
                "Token refresh is not supported for {} auth; reusing configured token",
                self.config.auth_mode
            ),
            LogContext::new(),
        );
        Ok(true)
    }
}

#[async_trait]
impl MediaUploader for DestinationClient {
    async fn test_connection(&self) -> Result<bool> {
        match self.http.get(self.base_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                self.log.log_success(
                    &format!("Connected to destination {}", self.base_url),
                    LogContext::new(),
                );
                Ok(true)
            }
            Ok(response) => {
                self.log.log_warning(
                    &format!(
                        "Destination connection test returned HTTP {}",
                        response.status()
                    ),
                    LogContext::new(),
                );
                Ok(false)
            }
            Err(e) => {
                self.log.log_error(
                    "Destination connection test failed",
                    LogContext::new().details(e.to_string()),
                );
                Err(TransferError::destination(
                    format!("Cannot connect to {}", self.base_url),
                    e,
                ))
            }
        }
    }

    async fn upload_media(
        &self,
        category_id: &str,
        file_name: &str,
        base64_content: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let url = self.resolve_url(Some(category_id))?;
        let payload = UploadPayload {
            filename: file_name.to_string(),
            content: base64_content.to_string(),
            description: description.to_string(),
        };
        let context = LogContext::new().category(category_id).file(file_name);

        // 已送出的請求一律等它完成，取消只擋下新的請求
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        tracing::debug!("📤 {} {} ({} chars)", self.upload_method, url, base64_content.len());
        let result = self
            .http
            .request(self.upload_method.clone(), url.clone())
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                self.log.log_success("Media uploaded", context);
                Ok(true)
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                self.log.log_error(
                    &format!("Upload failed with HTTP {}", status),
                    context.details(body),
                );
                Ok(false)
            }
            Err(e) => {
                self.log
                    .log_error("Upload request failed", context.details(e.to_string()));
                Err(TransferError::destination(
                    format!("Upload of '{}' to {} failed", file_name, url),
                    e,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NullLogSink;

    #[test]
    fn test_build_api_url_appends_category() {
        assert_eq!(build_api_url("media", Some("1001")), "media/1001");
        assert_eq!(build_api_url("/media/", Some("1001")), "media/1001");
    }

    #[test]
    fn test_build_api_url_placeholder() {
        assert_eq!(
            build_api_url("media/{categoryId}/upload", Some("1001")),
            "media/1001/upload"
        );
        assert_eq!(
            build_api_url("/categories/{categoryId}", Some("7")),
            "categories/7"
        );
    }

    #[test]
    fn test_build_api_url_without_category() {
        assert_eq!(build_api_url("media", None), "media");
        assert_eq!(build_api_url("/media", Some("")), "media");
    }

    #[test]
    fn test_build_api_url_is_stable() {
        let client = DestinationClient::new(
            DestinationConfig::new("https://api.example.com", "media").with_token(AuthMode::Bearer, "t"),
            Arc::new(NullLogSink),
        )
        .unwrap();
        assert_eq!(client.build_api_url(Some("1001")), client.build_api_url(Some("1001")));
    }

    #[test]
    fn test_resolve_url_keeps_base_path() {
        let client = DestinationClient::new(
            DestinationConfig::new("https://api.example.com/v1", "media/{categoryId}")
                .with_token(AuthMode::ApiKey, "k"),
            Arc::new(NullLogSink),
        )
        .unwrap();
        assert_eq!(
            client.resolve_url(Some("42")).unwrap().as_str(),
            "https://api.example.com/v1/media/42"
        );
    }

    #[test]
    fn test_auth_header_shapes() {
        let base = DestinationConfig::new("https://api.example.com", "media");

        let cases = [
            (AuthMode::Bearer, "authorization", "Bearer tok"),
            (AuthMode::OAuth, "authorization", "OAuth tok"),
            (AuthMode::Jwt, "authorization", "JWT tok"),
            (AuthMode::ApiKey, "x-api-key", "tok"),
        ];
        for (mode, header, expected) in cases {
            let headers = auth_headers(&base.clone().with_token(mode, "tok")).unwrap();
            assert_eq!(headers.get(header).unwrap(), expected);
            assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        }

        let headers = auth_headers(&base.with_basic_auth("user", "pass")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_invalid_config_is_configuration_error() {
        let err = DestinationClient::new(
            DestinationConfig::new("not a url", "media").with_token(AuthMode::Bearer, "t"),
            Arc::new(NullLogSink),
        )
        .err()
        .unwrap();
        assert!(matches!(err, TransferError::Configuration { .. }));

        let err = DestinationClient::new(
            DestinationConfig::new("https://api.example.com", "media")
                .with_token(AuthMode::Bearer, "bad\ntoken"),
            Arc::new(NullLogSink),
        )
        .err()
        .unwrap();
        assert!(matches!(err, TransferError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_refresh_token() {
        let mut basic = DestinationClient::new(
            DestinationConfig::new("https://api.example.com", "media").with_basic_auth("u", "p"),
            Arc::new(NullLogSink),
        )
        .unwrap();
        assert!(!basic.refresh_token().await.unwrap());

        let mut bearer = DestinationClient::new(
            DestinationConfig::new("https://api.example.com", "media").with_token(AuthMode::Bearer, "t"),
            Arc::new(NullLogSink),
        )
        .unwrap();
        assert!(bearer.refresh_token().await.unwrap());
    }
}
