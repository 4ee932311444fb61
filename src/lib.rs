//! # Crossref Monograph Deposit
//!
//! 把专著（书 + 章节）元数据导出为 Crossref 4.3.7 XML 并存缴注册 DOI
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 唯一与网络打交道的一层
//! - `DepositClient` - 发送文档，返回分类后的 `DepositOutcome`
//!
//! ### ② 文档层（Crossref）
//! - `crossref/` - 投稿快照 → `doi_batch` 文档 + 校验错误，纯函数
//!
//! ### ③ 业务能力层（Services）
//! - `DoiRegistry` - DOI 记录存储
//! - `DepositStatusTracker` - 把存缴结果写回 DOI 记录
//! - `Archiver` - zip / tar.gz 打包
//! - `export_files` - 导出文件命名与临时文件
//!
//! ### ④ 流程层（Workflow）
//! - `SubmissionCtx` - 上下文封装（投稿 ID + 序号）
//! - `DepositFlow` - 单个投稿的流程（构建 → 写文件 → 存缴 → 记录）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理、统计，应用生命周期
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod crossref;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{DepositClient, DepositFailure, DepositOutcome, OutcomeStatus};
pub use config::{ArchiveFormat, Config, ExportMode, PressContext};
pub use crossref::{build_document, BuildOutput, CrossrefDocument};
pub use error::{AppError, AppResult, ValidationError};
pub use models::{DoiRecord, DoiStatus, Submission};
pub use orchestrator::{App, BatchMessage, BatchOrchestrator, BatchReport};
pub use services::{DepositStatusTracker, DoiRegistry, FileDoiRegistry, InMemoryDoiRegistry};
pub use workflow::{DepositFlow, FlowResult, SubmissionCtx};
