use serde::{Deserialize, Serialize};
use std::fmt;

/// DOI 注册状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoiStatus {
    /// 尚未存缴
    #[default]
    None,
    /// 已注册
    Registered,
    /// 存缴失败
    Error,
}

impl fmt::Display for DoiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DoiStatus::None => "none",
            DoiStatus::Registered => "registered",
            DoiStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// 一条 DOI 记录
///
/// 由 DOI 存储持有，存缴结果会原地覆盖 status / batch_id / failed_msg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoiRecord {
    pub id: u64,
    /// 所属投稿
    pub submission_id: i64,
    pub doi: String,
    #[serde(default)]
    pub status: DoiStatus,
    /// 存缴批次 ID
    #[serde(default)]
    pub batch_id: Option<String>,
    /// 失败或警告信息
    #[serde(default)]
    pub failed_msg: Option<String>,
    /// 注册机构标记
    #[serde(default)]
    pub registration_agency: Option<String>,
}

impl DoiRecord {
    pub fn new(id: u64, submission_id: i64, doi: impl Into<String>) -> Self {
        Self {
            id,
            submission_id,
            doi: doi.into(),
            status: DoiStatus::None,
            batch_id: None,
            failed_msg: None,
            registration_agency: None,
        }
    }
}
