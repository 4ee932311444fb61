use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 打包错误
    #[error("打包错误: {0}")]
    Archive(#[from] ArchiveError),
    /// XML 序列化错误
    #[error("XML 错误: {0}")]
    Xml(#[from] quick_xml::Error),
    /// 下载模式下存在校验错误，整批放弃
    #[error("{count} 个校验错误，已放弃导出，第一个: {first}")]
    Validation { count: usize, first: ValidationError },
    /// 同一批次里出现重复的投稿 ID，导出文件名会互相覆盖
    #[error("投稿 ID 重复: {0}")]
    DuplicateSubmission(i64),
}

/// 元数据缺少必填字段
///
/// 非致命错误：文档照常生成，只是对应的节点被省略
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("投稿 {object_id} 缺少必填元素: {field_name}")]
pub struct ValidationError {
    /// 投稿 ID
    pub object_id: i64,
    /// 缺失字段名，例如 "Publisher Name"
    pub field_name: String,
}

impl ValidationError {
    pub fn new(object_id: i64, field_name: impl Into<String>) -> Self {
        Self {
            object_id,
            field_name: field_name.into(),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 打包工具不可用
    #[error("打包工具不可用 ({tool}): {reason}")]
    ArchiverUnavailable { tool: String, reason: String },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端初始化失败: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 删除文件失败
    #[error("删除文件失败 ({}): {source}", .path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({}): {source}", .path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// DOI 记录存储错误
#[derive(Debug, Error)]
pub enum RegistryError {
    /// 记录不存在
    #[error("DOI 记录不存在: {0}")]
    NotFound(u64),
    /// 读写存储文件失败
    #[error("DOI 记录文件读写失败 ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 存储文件格式错误
    #[error("DOI 记录文件格式错误: {0}")]
    Format(#[from] serde_json::Error),
    /// 存储后端拒绝写入
    #[error("DOI 记录写入被拒绝: {0}")]
    Rejected(String),
}

/// 存缴状态写入错误
#[derive(Debug, Error)]
pub enum StatusError {
    /// 读取投稿的 DOI 列表失败
    #[error("无法读取投稿 {submission_id} 的 DOI: {source}")]
    Lookup {
        submission_id: i64,
        #[source]
        source: RegistryError,
    },
    /// 部分 DOI 已写入、部分失败
    #[error(
        "投稿 {submission_id} 的 DOI 状态只写入了一部分 (已写入 {applied:?}, 失败 {failed_doi}, 回滚{}): {source}",
        rollback_label(.rollback_ok)
    )]
    PartialUpdate {
        submission_id: i64,
        applied: Vec<String>,
        failed_doi: String,
        rollback_ok: bool,
        #[source]
        source: RegistryError,
    },
}

/// 打包错误
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 文件读写失败
    #[error("打包文件读写失败: {0}")]
    Io(#[from] std::io::Error),
    /// zip 写入失败
    #[error("zip 写入失败: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// tar 命令执行失败
    #[error("tar 命令执行失败: {0}")]
    TarFailed(String),
    /// 待打包文件不在导出目录中
    #[error("文件不在导出目录中: {}", .0.display())]
    OutsideExportDir(PathBuf),
}

fn rollback_label(ok: &bool) -> &'static str {
    if *ok {
        "成功"
    } else {
        "失败"
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
