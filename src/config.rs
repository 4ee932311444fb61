use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 生产环境存缴地址
pub const CROSSREF_API_URL: &str = "https://api.crossref.org/v2/deposits";
/// 测试环境存缴地址
pub const CROSSREF_API_URL_TEST: &str = "https://test.crossref.org/servlet/deposit";

/// 导出模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportMode {
    /// 直接存缴到 Crossref
    Deposit,
    /// 只生成 XML 文件（多个时打包）
    Download,
}

impl ExportMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deposit" => Some(Self::Deposit),
            "download" => Some(Self::Download),
            _ => None,
        }
    }
}

/// 下载模式的打包格式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zip" => Some(Self::Zip),
            "tar" | "tar.gz" | "tgz" => Some(Self::TarGz),
            _ => None,
        }
    }
}

/// 程序配置（进程级）
#[derive(Clone, Debug)]
pub struct Config {
    /// 沙盒模式：不与 Crossref 发生任何交互
    pub sandbox: bool,
    /// 导出模式
    pub export_mode: ExportMode,
    /// 导出文件目录（临时文件也放在这里）
    pub export_dir: PathBuf,
    /// 打包格式
    pub archive_format: ArchiveFormat,
    /// tar 可执行文件路径（仅 TarGz 格式使用）
    pub tar_binary: Option<PathBuf>,
    /// 生产环境存缴地址
    pub deposit_url: String,
    /// 测试环境存缴地址
    pub deposit_test_url: String,
    /// HTTP 超时（秒）
    pub http_timeout_secs: u64,
    /// 投稿 TOML 文件存放目录
    pub submission_folder: String,
    /// 出版社配置文件
    pub press_file: String,
    /// DOI 记录文件
    pub registry_file: String,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sandbox: false,
            export_mode: ExportMode::Deposit,
            export_dir: PathBuf::from("export"),
            archive_format: ArchiveFormat::Zip,
            tar_binary: None,
            deposit_url: CROSSREF_API_URL.to_string(),
            deposit_test_url: CROSSREF_API_URL_TEST.to_string(),
            http_timeout_secs: 60,
            submission_folder: "submissions".to_string(),
            press_file: "press.toml".to_string(),
            registry_file: "dois.json".to_string(),
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            sandbox: std::env::var("CROSSREF_SANDBOX").ok().and_then(|v| v.parse().ok()).unwrap_or(default.sandbox),
            export_mode: std::env::var("EXPORT_MODE").ok().and_then(|v| ExportMode::parse(&v)).unwrap_or(default.export_mode),
            export_dir: std::env::var("EXPORT_DIR").map(PathBuf::from).unwrap_or(default.export_dir),
            archive_format: std::env::var("ARCHIVE_FORMAT").ok().and_then(|v| ArchiveFormat::parse(&v)).unwrap_or(default.archive_format),
            tar_binary: std::env::var("TAR_BINARY").ok().filter(|v| !v.is_empty()).map(PathBuf::from).or(default.tar_binary),
            deposit_url: std::env::var("CROSSREF_DEPOSIT_URL").unwrap_or(default.deposit_url),
            deposit_test_url: std::env::var("CROSSREF_DEPOSIT_TEST_URL").unwrap_or(default.deposit_test_url),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.http_timeout_secs),
            submission_folder: std::env::var("SUBMISSION_FOLDER").unwrap_or(default.submission_folder),
            press_file: std::env::var("PRESS_FILE").unwrap_or(default.press_file),
            registry_file: std::env::var("REGISTRY_FILE").unwrap_or(default.registry_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }
}

/// 出版社（上下文）配置
///
/// 对应一个出版社的存缴人信息、账号与出版社名称
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PressContext {
    pub id: i64,
    /// 资源链接的站点前缀，例如 `https://press.example.org/index.php/press`
    pub base_url: String,
    /// 出版社名称（按 locale）
    #[serde(default)]
    pub publisher_names: BTreeMap<String, String>,
    #[serde(default)]
    pub depositor_name: Option<String>,
    #[serde(default)]
    pub depositor_email: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub test_mode: bool,
}

impl PressContext {
    /// 从 TOML 文件加载，账号密码可由环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取出版社配置: {}", path.display()))?;
        let mut press: PressContext = toml::from_str(&content)
            .with_context(|| format!("无法解析出版社配置: {}", path.display()))?;

        if let Ok(username) = std::env::var("CROSSREF_USERNAME") {
            press.username = username;
        }
        if let Ok(password) = std::env::var("CROSSREF_PASSWORD") {
            press.password = password;
        }
        Ok(press)
    }

    /// 指定 locale 的出版社名称
    pub fn publisher_name(&self, locale: &str) -> Option<&str> {
        self.publisher_names
            .get(locale)
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
    }

    /// 存缴凭证
    pub fn credentials(&self) -> Credentials<'_> {
        Credentials {
            username: &self.username,
            password: &self.password,
        }
    }
}

/// 存缴账号
#[derive(Clone, Copy, Debug)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}
