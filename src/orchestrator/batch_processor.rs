//! 批量投稿处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量投稿的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、加载出版社配置、投稿与 DOI 记录
//! 2. **存缴模式**：逐个投稿执行 `DepositFlow`，汇总结果
//! 3. **下载模式**：构建全部文档，写出 XML，多于一个时打包
//! 4. **全局统计**：输出计数和最终信息
//!
//! ## 设计特点
//!
//! - **顺序处理**：一个投稿完整处理完再开始下一个
//! - **资源所有者**：持有 DOI 存储（经由状态跟踪器）
//! - **向下委托**：单个投稿的细节交给 workflow

use crate::config::{Config, ExportMode, PressContext};
use crate::crossref::build_document;
use crate::error::{AppError, AppResult};
use crate::models::{load_all_submissions, Submission};
use crate::services::{archiver_for, export_files, Archiver};
use crate::services::{DepositStatusTracker, DoiRegistry, FileDoiRegistry};
use crate::utils::logging;
use crate::workflow::{DepositFlow, FlowResult, SubmissionCtx};
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// 批次的最终信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchMessage {
    /// 全部成功（含沙盒跳过）
    Success,
    /// 第一个失败是校验错误
    Validation(String),
    /// 第一个失败是 Crossref 拒绝
    DepositUnsuccessful,
    /// 第一个失败是传输、响应解析或本地错误
    DepositFailed,
}

impl fmt::Display for BatchMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchMessage::Success => f.write_str("全部投稿处理完成"),
            BatchMessage::Validation(message) => f.write_str(message),
            BatchMessage::DepositUnsuccessful => f.write_str("存缴未成功"),
            BatchMessage::DepositFailed => f.write_str("存缴失败"),
        }
    }
}

/// 存缴模式的批次汇总
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub total: usize,
    pub registered: usize,
    /// 已注册但带警告（也计入 registered）
    pub warnings: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub rejected: usize,
    pub failed: usize,
    /// 第一个失败的投稿结果
    pub first_error: Option<FlowResult>,
}

impl BatchReport {
    fn record(&mut self, result: FlowResult) {
        self.total += 1;
        match &result {
            FlowResult::Registered { warning } => {
                self.registered += 1;
                if *warning {
                    self.warnings += 1;
                }
            }
            FlowResult::Skipped => self.skipped += 1,
            FlowResult::Invalid(_) => self.invalid += 1,
            FlowResult::Rejected(_) => self.rejected += 1,
            FlowResult::Failed(_) => self.failed += 1,
        }
        if self.first_error.is_none() && result.error_message().is_some() {
            self.first_error = Some(result);
        }
    }

    pub fn errors_occurred(&self) -> bool {
        self.first_error.is_some()
    }

    /// 失败总数
    pub fn failures(&self) -> usize {
        self.invalid + self.rejected + self.failed
    }

    pub fn message(&self) -> BatchMessage {
        match &self.first_error {
            None => BatchMessage::Success,
            Some(FlowResult::Invalid(message)) => BatchMessage::Validation(message.clone()),
            Some(FlowResult::Rejected(_)) => BatchMessage::DepositUnsuccessful,
            Some(_) => BatchMessage::DepositFailed,
        }
    }
}

/// 批量编排器
pub struct BatchOrchestrator<R> {
    config: Config,
    press: PressContext,
    tracker: DepositStatusTracker<R>,
}

impl<R: DoiRegistry> BatchOrchestrator<R> {
    pub fn new(config: Config, press: PressContext, registry: R) -> Self {
        Self {
            config,
            press,
            tracker: DepositStatusTracker::new(registry),
        }
    }

    pub fn registry(&self) -> &R {
        self.tracker.registry()
    }

    pub fn into_registry(self) -> R {
        self.tracker.into_inner()
    }

    /// 存缴模式：逐个构建、存缴、记录
    ///
    /// # 参数
    /// - `submissions`: 待存缴的投稿
    ///
    /// # 返回
    /// 批次汇总；只有 HTTP 客户端无法创建时才返回 Err
    pub async fn deposit_all(&mut self, submissions: &[Submission]) -> AppResult<BatchReport> {
        let flow = DepositFlow::new(&self.config, self.press.clone())?;
        let total = submissions.len();
        let mut report = BatchReport::default();

        for (index, submission) in submissions.iter().enumerate() {
            let ctx = SubmissionCtx::new(submission.id, index + 1, total);
            logging::log_submission_start(
                ctx.index,
                total,
                submission.id,
                submission.publication.chapters.len(),
            );

            let now = Local::now().naive_local();
            let result = flow.run(submission, &ctx, &mut self.tracker, now).await;
            report.record(result);
        }

        Ok(report)
    }

    /// 下载模式：按配置的打包格式导出
    pub fn download_all(&self, submissions: &[Submission]) -> AppResult<Option<PathBuf>> {
        let archiver = archiver_for(&self.config);
        self.download_all_with(submissions, archiver.as_ref(), Local::now().naive_local())
    }

    /// 下载模式
    ///
    /// # 参数
    /// - `submissions`: 待导出的投稿
    /// - `archiver`: 多于一个文件时使用的打包工具
    /// - `now`: 生成时间（批次 ID 与文件名）
    ///
    /// # 返回
    /// 导出的文件路径；没有投稿时返回 None
    pub fn download_all_with(
        &self,
        submissions: &[Submission],
        archiver: &dyn Archiver,
        now: NaiveDateTime,
    ) -> AppResult<Option<PathBuf>> {
        if submissions.is_empty() {
            warn!("⚠️ 没有可导出的投稿");
            return Ok(None);
        }

        let mut seen = HashSet::with_capacity(submissions.len());
        if let Some(duplicate) = submissions.iter().find(|s| !seen.insert(s.id)) {
            return Err(AppError::DuplicateSubmission(duplicate.id));
        }

        // 打包工具不可用时，在写任何文件之前放弃
        archiver.check_available()?;

        // ========== 构建全部文档 ==========
        let mut documents = Vec::with_capacity(submissions.len());
        let mut errors = Vec::new();
        for submission in submissions {
            let output = build_document(submission, &self.press, now);
            errors.extend(output.errors);
            documents.push(output.document);
        }

        if let Some(first) = errors.first().cloned() {
            for e in &errors {
                warn!("⚠️ {}", e);
            }
            return Err(AppError::Validation {
                count: errors.len(),
                first,
            });
        }

        // ========== 写出 XML ==========
        let export_dir = &self.config.export_dir;
        export_files::ensure_export_dir(export_dir)?;

        let mut written = Vec::with_capacity(documents.len());
        for document in &documents {
            let name = export_files::document_file_name(document.submission_id, now.date());
            let written_file = document
                .to_xml_string()
                .map_err(AppError::from)
                .and_then(|xml| {
                    export_files::write_document(export_dir, &name, &xml).map_err(AppError::from)
                });
            match written_file {
                Ok(path) => written.push(path),
                Err(e) => {
                    export_files::remove_files_quietly(&written);
                    return Err(e);
                }
            }
        }

        if written.len() == 1 {
            let path = written.remove(0);
            info!("✓ 已导出: {}", path.display());
            return Ok(Some(path));
        }

        // ========== 打包 ==========
        let archive_name =
            export_files::archive_file_name(self.press.id, now.date(), archiver.extension());
        let archive_path = export_dir.join(archive_name);

        let bundled = archiver.bundle(&archive_path, export_dir, &written);
        export_files::remove_files_quietly(&written);
        if let Err(e) = bundled {
            if archive_path.exists() {
                export_files::remove_files_quietly(std::slice::from_ref(&archive_path));
            }
            return Err(e.into());
        }

        info!("✓ 已导出 {} 个投稿: {}", written.len(), archive_path.display());
        Ok(Some(archive_path))
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    press: PressContext,
    submissions: Vec<Submission>,
    registry: FileDoiRegistry,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        logging::log_startup(mode_label(config.export_mode), config.sandbox);

        let press = PressContext::load(&config.press_file)?;

        info!("\n📁 正在扫描待处理的投稿...");
        let submissions = load_all_submissions(&config.submission_folder).await?;

        let mut registry = FileDoiRegistry::load(&config.registry_file)?;
        registry.seed_from(&submissions)?;

        Ok(Self {
            config,
            press,
            submissions,
            registry,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<()> {
        if self.submissions.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(());
        }

        logging::log_submissions_loaded(self.submissions.len());

        let mode = self.config.export_mode;
        let log_file = self.config.output_log_file.clone();
        let mut orchestrator = BatchOrchestrator::new(self.config, self.press, self.registry);

        match mode {
            ExportMode::Deposit => {
                let report = orchestrator.deposit_all(&self.submissions).await?;
                logging::print_final_stats(
                    report.registered,
                    report.failures(),
                    report.skipped,
                    report.total,
                );
                if report.errors_occurred() {
                    error!("❌ {}", report.message());
                } else {
                    info!("✅ {}", report.message());
                }
            }
            ExportMode::Download => match orchestrator.download_all(&self.submissions)? {
                Some(path) => info!("📄 导出结果: {}", path.display()),
                None => warn!("⚠️ 没有生成任何文件"),
            },
        }

        info!("\n日志已保存至: {}", log_file);
        Ok(())
    }
}

fn mode_label(mode: ExportMode) -> &'static str {
    match mode {
        ExportMode::Deposit => "存缴",
        ExportMode::Download => "导出",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_first_error() {
        let mut report = BatchReport::default();
        report.record(FlowResult::Registered { warning: true });
        report.record(FlowResult::Rejected("bad".to_string()));
        report.record(FlowResult::Invalid("投稿 9 缺少必填元素: Title".to_string()));
        report.record(FlowResult::Skipped);

        assert_eq!(report.total, 4);
        assert_eq!(report.registered, 1);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.failures(), 2);
        assert_eq!(report.skipped, 1);
        assert!(report.errors_occurred());
        assert_eq!(report.message(), BatchMessage::DepositUnsuccessful);
    }

    #[test]
    fn test_report_messages() {
        let mut report = BatchReport::default();
        report.record(FlowResult::Skipped);
        assert!(!report.errors_occurred());
        assert_eq!(report.message(), BatchMessage::Success);

        report.record(FlowResult::Invalid("投稿 9 缺少必填元素: Title".to_string()));
        assert_eq!(report.message().to_string(), "投稿 9 缺少必填元素: Title");

        let mut failed = BatchReport::default();
        failed.record(FlowResult::Failed("timeout".to_string()));
        assert_eq!(failed.message(), BatchMessage::DepositFailed);
    }
}
