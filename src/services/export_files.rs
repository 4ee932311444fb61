//! 导出文件读写 - 业务能力层
//!
//! 文件命名、临时文件、清理

use crate::error::FileError;
use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// 导出文件名前缀
const EXPORT_PREFIX: &str = "crossref";

/// 单个投稿的导出文件名
///
/// 例如 `crossref-05-03-2024-monograph-12.xml`
pub fn document_file_name(submission_id: i64, date: NaiveDate) -> String {
    format!(
        "{}-{}-monograph-{}.xml",
        EXPORT_PREFIX,
        date.format("%d-%m-%Y"),
        submission_id
    )
}

/// 批量导出的归档文件名
///
/// 例如 `crossref-05-03-2024-monographs-1.tar.gz`
pub fn archive_file_name(press_id: i64, date: NaiveDate, extension: &str) -> String {
    format!(
        "{}-{}-monographs-{}.{}",
        EXPORT_PREFIX,
        date.format("%d-%m-%Y"),
        press_id,
        extension
    )
}

/// 确保导出目录存在
pub fn ensure_export_dir(dir: &Path) -> Result<(), FileError> {
    fs::create_dir_all(dir).map_err(|source| FileError::CreateDirFailed {
        path: dir.to_path_buf(),
        source,
    })
}

/// 把文档写入导出目录下的临时文件
///
/// 返回的句柄被丢弃时文件自动删除，无论之后的存缴成功与否
///
/// # 参数
/// - `dir`: 导出目录
/// - `submission_id`: 投稿 ID（用于文件名）
/// - `xml`: 文档内容
/// - `date`: 导出日期（用于文件名）
pub fn write_temp_document(
    dir: &Path,
    submission_id: i64,
    xml: &str,
    date: NaiveDate,
) -> Result<NamedTempFile, FileError> {
    ensure_export_dir(dir)?;
    let prefix = format!(
        "{}-{}-monograph-{}-",
        EXPORT_PREFIX,
        date.format("%d-%m-%Y"),
        submission_id
    );
    let write_failed = |source| FileError::WriteFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".xml")
        .tempfile_in(dir)
        .map_err(write_failed)?;
    file.write_all(xml.as_bytes()).map_err(write_failed)?;
    file.flush().map_err(write_failed)?;

    debug!("临时文件已写入: {}", file.path().display());
    Ok(file)
}

/// 把文档写入导出目录（下载模式）
pub fn write_document(dir: &Path, file_name: &str, xml: &str) -> Result<PathBuf, FileError> {
    let path = dir.join(file_name);
    fs::write(&path, xml).map_err(|source| FileError::WriteFailed {
        path: path.clone(),
        source,
    })?;
    debug!("导出文件已写入: {}", path.display());
    Ok(path)
}

/// 删除一个导出文件
pub fn remove_file(path: &Path) -> Result<(), FileError> {
    fs::remove_file(path).map_err(|source| FileError::DeleteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// 尽力删除一批文件，失败只记警告
pub fn remove_files_quietly(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = remove_file(path) {
            warn!("⚠️ {}", e);
        }
    }
}
