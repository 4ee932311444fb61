//! 导出文件打包 - 业务能力层
//!
//! 下载模式下多份 XML 合并成一个归档文件

use crate::config::{ArchiveFormat, Config};
use crate::error::{ArchiveError, ConfigError};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 打包能力
pub trait Archiver {
    /// 工具名（用于日志和错误信息）
    fn name(&self) -> &str;

    /// 归档文件扩展名，不带点
    fn extension(&self) -> &str;

    /// 检查打包工具是否可用，在写任何文件之前调用
    fn check_available(&self) -> Result<(), ConfigError>;

    /// 把 `base_dir` 下的若干文件打包到 `target`，归档内只保留文件名
    ///
    /// # 参数
    /// - `target`: 归档文件路径
    /// - `base_dir`: 文件所在目录
    /// - `files`: 待打包文件，必须位于 `base_dir` 中
    fn bundle(&self, target: &Path, base_dir: &Path, files: &[PathBuf]) -> Result<(), ArchiveError>;
}

/// 按配置选择打包实现
pub fn archiver_for(config: &Config) -> Box<dyn Archiver> {
    match config.archive_format {
        ArchiveFormat::Zip => Box::new(ZipArchiver),
        ArchiveFormat::TarGz => Box::new(TarArchiver::new(config.tar_binary.clone())),
    }
}

/// 归档内的相对文件名
fn entry_name(base_dir: &Path, file: &Path) -> Result<String, ArchiveError> {
    let relative = file
        .strip_prefix(base_dir)
        .map_err(|_| ArchiveError::OutsideExportDir(file.to_path_buf()))?;
    Ok(relative.to_string_lossy().replace('\\', "/"))
}

/// zip 打包（进程内完成，总是可用）
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn name(&self) -> &str {
        "zip"
    }

    fn extension(&self) -> &str {
        "zip"
    }

    fn check_available(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    fn bundle(&self, target: &Path, base_dir: &Path, files: &[PathBuf]) -> Result<(), ArchiveError> {
        let mut zip = ZipWriter::new(File::create(target)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for file in files {
            let name = entry_name(base_dir, file)?;
            debug!("添加到 zip: {}", name);
            zip.start_file(name, options)?;
            zip.write_all(&std::fs::read(file)?)?;
        }

        zip.finish()?;
        info!("📦 已打包 {} 个文件: {}", files.len(), target.display());
        Ok(())
    }
}

/// tar.gz 打包（调用外部 tar 命令）
#[derive(Debug, Clone)]
pub struct TarArchiver {
    binary: Option<PathBuf>,
}

impl TarArchiver {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    fn binary(&self) -> Result<&Path, ConfigError> {
        let binary = self
            .binary
            .as_deref()
            .ok_or_else(|| unavailable("未配置 tar 路径 (TAR_BINARY)"))?;

        let metadata = std::fs::metadata(binary)
            .map_err(|e| unavailable(format!("{}: {}", binary.display(), e)))?;
        if !metadata.is_file() || !is_executable(&metadata) {
            return Err(unavailable(format!("{} 不是可执行文件", binary.display())));
        }
        Ok(binary)
    }
}

fn unavailable(reason: impl Into<String>) -> ConfigError {
    ConfigError::ArchiverUnavailable {
        tool: "tar".to_string(),
        reason: reason.into(),
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

impl Archiver for TarArchiver {
    fn name(&self) -> &str {
        "tar"
    }

    fn extension(&self) -> &str {
        "tar.gz"
    }

    fn check_available(&self) -> Result<(), ConfigError> {
        self.binary().map(|_| ())
    }

    fn bundle(&self, target: &Path, base_dir: &Path, files: &[PathBuf]) -> Result<(), ArchiveError> {
        let binary = self
            .binary()
            .map_err(|e| ArchiveError::TarFailed(e.to_string()))?;

        let names = files
            .iter()
            .map(|file| entry_name(base_dir, file))
            .collect::<Result<Vec<_>, _>>()?;

        let output = Command::new(binary)
            .arg("-czf")
            .arg(target)
            .arg("-C")
            .arg(base_dir)
            .args(["--owner", "0", "--group", "0", "--"])
            .args(&names)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ArchiveError::TarFailed(format!(
                "{} ({})",
                stderr.trim(),
                output.status
            )));
        }

        info!("📦 已打包 {} 个文件: {}", files.len(), target.display());
        Ok(())
    }
}
