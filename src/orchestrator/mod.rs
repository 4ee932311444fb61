//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量投稿处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载投稿（Vec<Submission>）和 DOI 记录
//! - 存缴模式：逐个投稿委托 `DepositFlow`
//! - 下载模式：构建、写出、打包
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Submission>)
//!     ↓
//! workflow::DepositFlow (处理单个 Submission)
//!     ↓
//! crossref (文档构建) / services (状态跟踪、打包、导出文件)
//!     ↓
//! clients (DepositClient)
//! ```

pub mod batch_processor;

// 重新导出主要类型
pub use batch_processor::{App, BatchMessage, BatchOrchestrator, BatchReport};
