/// Crossref 存缴客户端
///
/// 唯一与网络打交道的组件：发送一份文档，返回分类后的结果
use crate::clients::response::{classify_response, transport_failure, DepositOutcome};
use crate::config::{Config, Credentials};
use crate::error::ConfigError;
use crate::utils::truncate_text;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 存缴操作名
const DEPOSIT_OPERATION: &str = "doMDUpload";

/// Crossref 存缴客户端
pub struct DepositClient {
    http: reqwest::Client,
    sandbox: bool,
    deposit_url: String,
    deposit_test_url: String,
}

impl DepositClient {
    /// 创建新的存缴客户端
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            sandbox: config.sandbox,
            deposit_url: config.deposit_url.clone(),
            deposit_test_url: config.deposit_test_url.clone(),
        })
    }

    /// 存缴一份已写入磁盘的文档
    ///
    /// # 参数
    /// - `document_path`: XML 文件路径
    /// - `credentials`: Crossref 账号
    /// - `test_mode`: 是否使用测试环境
    ///
    /// # 返回
    /// 分类后的结果，任何失败都体现在返回值里，不会返回 Err
    pub async fn deposit(
        &self,
        document_path: &Path,
        credentials: Credentials<'_>,
        test_mode: bool,
    ) -> DepositOutcome {
        if self.sandbox {
            warn!("🧪 沙盒模式，不与 Crossref 交互: {}", document_path.display());
            return DepositOutcome::Skipped;
        }

        let bytes = match tokio::fs::read(document_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return transport_failure(format!(
                    "无法读取导出文件 {}: {}",
                    document_path.display(),
                    e
                ))
            }
        };

        let file_name = document_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "crossref.xml".to_string());

        let part = match Part::bytes(bytes).file_name(file_name).mime_str("text/xml") {
            Ok(part) => part,
            Err(e) => return transport_failure(e),
        };

        let form = Form::new()
            .text("usr", credentials.username.to_string())
            .text("pwd", credentials.password.to_string())
            .text("operation", DEPOSIT_OPERATION)
            .part("mdFile", part);

        let endpoint = self.endpoint(test_mode);
        info!("📤 正在存缴到 {}", endpoint);

        let response = match self.http.post(endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("⚠️ 存缴请求失败: {}", e);
                return transport_failure(e);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("⚠️ 读取存缴响应失败: {}", e);
                return transport_failure(format!("{} ({})", e, status));
            }
        };

        debug!("存缴响应 {}: {}", status, truncate_text(&body, 500));

        classify_response(status.as_u16(), status.canonical_reason(), &body)
    }

    fn endpoint(&self, test_mode: bool) -> &str {
        if test_mode {
            &self.deposit_test_url
        } else {
            &self.deposit_url
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::response::OutcomeStatus;

    fn credentials() -> Credentials<'static> {
        Credentials {
            username: "user",
            password: "secret",
        }
    }

    #[tokio::test]
    async fn test_sandbox_skips_without_io() {
        let config = Config {
            sandbox: true,
            deposit_url: "http://127.0.0.1:9/never".to_string(),
            ..Config::default()
        };
        let client = DepositClient::new(&config).unwrap();

        // 文件不存在也没关系：沙盒模式下什么都不读、不发
        let outcome = client
            .deposit(Path::new("/no/such/file.xml"), credentials(), false)
            .await;

        assert_eq!(outcome, DepositOutcome::Skipped);
        assert_eq!(outcome.status(), OutcomeStatus::Skipped);
        assert_eq!(outcome.diagnostic(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_failure_not_a_panic() {
        let client = DepositClient::new(&Config::default()).unwrap();

        let outcome = client
            .deposit(Path::new("/no/such/file.xml"), credentials(), true)
            .await;

        assert_eq!(outcome.status(), OutcomeStatus::Error);
        assert!(outcome.diagnostic().unwrap().contains("/no/such/file.xml"));
    }

    #[test]
    fn test_endpoint_selection() {
        let config = Config {
            deposit_url: "https://prod.example/deposit".to_string(),
            deposit_test_url: "https://test.example/deposit".to_string(),
            ..Config::default()
        };
        let client = DepositClient::new(&config).unwrap();

        assert_eq!(client.endpoint(true), "https://test.example/deposit");
        assert_eq!(client.endpoint(false), "https://prod.example/deposit");
    }
}
