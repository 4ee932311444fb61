//! 投稿存缴流程 - 流程层
//!
//! 核心职责：定义"一个投稿"的完整存缴流程
//!
//! 流程顺序：
//! 1. 构建文档 → 有校验错误则记为失败，不发送
//! 2. 写入导出目录下的临时文件
//! 3. 存缴 → 记录状态
//! 4. 删除临时文件（任何分支都会删除）

use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::clients::{DepositClient, DepositFailure, DepositOutcome};
use crate::config::{Config, PressContext};
use crate::crossref::build_document;
use crate::error::ConfigError;
use crate::models::Submission;
use crate::services::export_files;
use crate::services::{DepositStatusTracker, DoiRegistry};
use crate::workflow::submission_ctx::SubmissionCtx;

/// 单个投稿的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResult {
    /// 已注册
    Registered {
        /// Crossref 报告了警告
        warning: bool,
    },
    /// 沙盒模式，未发送
    Skipped,
    /// 元数据不完整，未发送
    Invalid(String),
    /// Crossref 拒绝
    Rejected(String),
    /// 传输、响应解析或本地步骤失败
    Failed(String),
}

impl FlowResult {
    /// 失败时给操作员看的信息
    pub fn error_message(&self) -> Option<&str> {
        match self {
            FlowResult::Invalid(message)
            | FlowResult::Rejected(message)
            | FlowResult::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// 投稿存缴流程
///
/// - 编排构建、写文件、存缴、记录状态
/// - 不持有 DOI 存储，由调用方传入跟踪器
pub struct DepositFlow {
    client: DepositClient,
    press: PressContext,
    export_dir: PathBuf,
}

impl DepositFlow {
    /// 创建新的存缴流程
    pub fn new(config: &Config, press: PressContext) -> Result<Self, ConfigError> {
        Ok(Self {
            client: DepositClient::new(config)?,
            press,
            export_dir: config.export_dir.clone(),
        })
    }

    /// 处理一个投稿
    ///
    /// # 参数
    /// - `submission`: 投稿快照
    /// - `ctx`: 日志上下文
    /// - `tracker`: 状态跟踪器
    /// - `now`: 生成时间
    pub async fn run<R: DoiRegistry>(
        &self,
        submission: &Submission,
        ctx: &SubmissionCtx,
        tracker: &mut DepositStatusTracker<R>,
        now: NaiveDateTime,
    ) -> FlowResult {
        // ========== 1. 构建文档 ==========
        let output = build_document(submission, &self.press, now);

        if let Some(first) = output.errors.first() {
            for e in &output.errors {
                warn!("{} ⚠️ {}", ctx, e);
            }
            let message = first.to_string();
            self.track_failure(ctx, tracker, &message);
            return FlowResult::Invalid(message);
        }

        let xml = match output.document.to_xml_string() {
            Ok(xml) => xml,
            Err(e) => {
                let message = format!("XML 序列化失败: {}", e);
                self.track_failure(ctx, tracker, &message);
                return FlowResult::Failed(message);
            }
        };

        // ========== 2. 写临时文件 ==========
        let file = match export_files::write_temp_document(
            &self.export_dir,
            submission.id,
            &xml,
            now.date(),
        ) {
            Ok(file) => file,
            Err(e) => {
                let message = e.to_string();
                self.track_failure(ctx, tracker, &message);
                return FlowResult::Failed(message);
            }
        };

        // ========== 3. 存缴并记录状态 ==========
        info!("{} 📤 存缴批次 {}", ctx, output.document.batch_id);
        let outcome = self
            .client
            .deposit(file.path(), self.press.credentials(), self.press.test_mode)
            .await;
        let tracked = tracker.record_outcome(submission.id, &outcome);

        // ========== 4. 清理 ==========
        if let Err(e) = file.close() {
            warn!("{} ⚠️ 临时文件删除失败: {}", ctx, e);
        }

        if let Err(e) = tracked {
            error!("{} ❌ {}", ctx, e);
            return FlowResult::Failed(e.to_string());
        }

        match &outcome {
            DepositOutcome::Registered { warning, .. } => {
                if warning.is_some() {
                    warn!("{} ⚠️ 已注册，但 Crossref 报告了警告", ctx);
                } else {
                    info!("{} ✅ 已注册", ctx);
                }
                FlowResult::Registered {
                    warning: warning.is_some(),
                }
            }
            DepositOutcome::Skipped => FlowResult::Skipped,
            DepositOutcome::Failed(failure) => {
                let message = outcome.failure_summary().unwrap_or_default();
                error!("{} ❌ {}", ctx, message);
                match failure {
                    DepositFailure::Rejected { .. } => FlowResult::Rejected(message),
                    _ => FlowResult::Failed(message),
                }
            }
        }
    }

    fn track_failure<R: DoiRegistry>(
        &self,
        ctx: &SubmissionCtx,
        tracker: &mut DepositStatusTracker<R>,
        message: &str,
    ) {
        if let Err(e) = tracker.record_failure(ctx.submission_id, message) {
            error!("{} ❌ {}", ctx, e);
        }
    }
}
