//! 投稿处理上下文
//!
//! 封装"我正在处理第几个投稿"这一信息

use std::fmt::Display;

/// 投稿处理上下文
#[derive(Debug, Clone, Copy)]
pub struct SubmissionCtx {
    /// 投稿 ID
    pub submission_id: i64,

    /// 在本批中的序号（从 1 开始，仅用于日志显示）
    pub index: usize,

    /// 本批投稿总数
    pub total: usize,
}

impl SubmissionCtx {
    pub fn new(submission_id: i64, index: usize, total: usize) -> Self {
        Self {
            submission_id,
            index,
            total,
        }
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[提交 {} {}/{}]", self.submission_id, self.index, self.total)
    }
}
