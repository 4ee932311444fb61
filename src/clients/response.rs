//! Crossref 存缴响应解析与分类
//!
//! 响应分为四种形态：成功、带警告的成功、远端拒绝、传输失败。
//! 另有一种本地形态：本应可解析的响应无法解析（Malformed），
//! 它同样被收敛为失败结果，绝不向上抛出。

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// Crossref 校验拒绝时返回的状态码
pub const DEPOSIT_REJECTED_STATUS: u16 = 403;

/// 无法解析响应时写入 DOI 记录的通用信息
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Crossref 返回了无法解析的响应";

/// 远端报告 failure_count > 0 时的通用信息
pub const DEPOSIT_UNSUCCESSFUL_MESSAGE: &str = "Crossref 存缴未成功，请检查批次诊断";

/// 存缴结果的状态视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Registered,
    Error,
    Skipped,
}

/// 一次存缴的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositOutcome {
    /// 已注册；有警告时携带原始响应体
    Registered {
        batch_id: String,
        warning: Option<String>,
    },
    /// 失败
    Failed(DepositFailure),
    /// 沙盒模式，未发送
    Skipped,
}

/// 失败的具体原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositFailure {
    /// 网络不可达或非 2xx（403 除外）
    Transport {
        status: Option<u16>,
        diagnostic: String,
    },
    /// Crossref 拒绝：403，或 failure_count > 0
    Rejected {
        batch_id: Option<String>,
        /// 403 响应中的 msg
        message: Option<String>,
        diagnostic: Option<String>,
    },
    /// 响应本应可解析却缺少必要元素
    Malformed { detail: String },
}

impl DepositOutcome {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            DepositOutcome::Registered { .. } => OutcomeStatus::Registered,
            DepositOutcome::Failed(_) => OutcomeStatus::Error,
            DepositOutcome::Skipped => OutcomeStatus::Skipped,
        }
    }

    pub fn batch_id(&self) -> Option<&str> {
        match self {
            DepositOutcome::Registered { batch_id, .. } => Some(batch_id.as_str()),
            DepositOutcome::Failed(DepositFailure::Rejected { batch_id, .. }) => batch_id.as_deref(),
            _ => None,
        }
    }

    /// 写入 DOI 记录的诊断信息
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            DepositOutcome::Registered { warning, .. } => warning.as_deref(),
            DepositOutcome::Failed(DepositFailure::Transport { diagnostic, .. }) => Some(diagnostic.as_str()),
            DepositOutcome::Failed(DepositFailure::Rejected { diagnostic, .. }) => diagnostic.as_deref(),
            DepositOutcome::Failed(DepositFailure::Malformed { .. }) => Some(MALFORMED_RESPONSE_MESSAGE),
            DepositOutcome::Skipped => None,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, DepositOutcome::Registered { warning: Some(_), .. })
    }

    /// 面向操作员的一行摘要（只对失败有意义）
    pub fn failure_summary(&self) -> Option<String> {
        match self {
            DepositOutcome::Failed(DepositFailure::Transport { diagnostic, .. }) => {
                Some(format!("存缴请求失败: {}", diagnostic))
            }
            DepositOutcome::Failed(DepositFailure::Rejected {
                message: Some(message),
                ..
            }) => Some(format!("{} ({})", message, DEPOSIT_REJECTED_STATUS)),
            DepositOutcome::Failed(DepositFailure::Rejected { message: None, .. }) => {
                Some(DEPOSIT_UNSUCCESSFUL_MESSAGE.to_string())
            }
            DepositOutcome::Failed(DepositFailure::Malformed { .. }) => {
                Some(MALFORMED_RESPONSE_MESSAGE.to_string())
            }
            _ => None,
        }
    }
}

/// 对一次已收到的 HTTP 响应分类
///
/// # 参数
/// - `status`: HTTP 状态码
/// - `reason`: 状态短语，例如 `Forbidden`
/// - `body`: 响应体
pub fn classify_response(status: u16, reason: Option<&str>, body: &str) -> DepositOutcome {
    if (200..300).contains(&status) {
        return classify_success(body);
    }
    if status == DEPOSIT_REJECTED_STATUS {
        return classify_rejection(body);
    }
    DepositOutcome::Failed(DepositFailure::Transport {
        status: Some(status),
        diagnostic: format!("{} ({} {})", body, status, reason.unwrap_or("")).trim_end().to_string(),
    })
}

/// 传输层失败（没有响应）
pub fn transport_failure(error: impl std::fmt::Display) -> DepositOutcome {
    DepositOutcome::Failed(DepositFailure::Transport {
        status: None,
        diagnostic: error.to_string(),
    })
}

fn classify_success(body: &str) -> DepositOutcome {
    let fields = match first_element_texts(body, &["batch_id", "failure_count", "warning_count"]) {
        Ok(fields) => fields,
        Err(e) => return malformed(format!("XML 解析失败: {}", e)),
    };

    let Some(batch_id) = fields.get("batch_id").filter(|id| !id.is_empty()) else {
        return malformed("缺少 batch_id");
    };
    let failure_count = match parse_count(&fields, "failure_count") {
        Ok(count) => count,
        Err(detail) => return malformed(detail),
    };
    let warning_count = match parse_count(&fields, "warning_count") {
        Ok(count) => count,
        Err(detail) => return malformed(detail),
    };

    if failure_count > 0 {
        return DepositOutcome::Failed(DepositFailure::Rejected {
            batch_id: Some(batch_id.clone()),
            message: None,
            diagnostic: None,
        });
    }

    DepositOutcome::Registered {
        batch_id: batch_id.clone(),
        warning: (warning_count > 0).then(|| body.to_string()),
    }
}

fn classify_rejection(body: &str) -> DepositOutcome {
    let fields = match first_element_texts(body, &["batch_id", "msg"]) {
        Ok(fields) => fields,
        Err(e) => return malformed(format!("XML 解析失败: {}", e)),
    };

    let Some(message) = fields.get("msg") else {
        return malformed("403 响应缺少 msg");
    };

    DepositOutcome::Failed(DepositFailure::Rejected {
        batch_id: fields.get("batch_id").cloned(),
        message: Some(message.clone()),
        diagnostic: Some(format!("{}\n{}", message, body)),
    })
}

fn malformed(detail: impl Into<String>) -> DepositOutcome {
    DepositOutcome::Failed(DepositFailure::Malformed {
        detail: detail.into(),
    })
}

fn parse_count(fields: &HashMap<String, String>, name: &str) -> Result<u64, String> {
    let raw = fields.get(name).ok_or_else(|| format!("缺少 {}", name))?;
    raw.trim()
        .parse()
        .map_err(|_| format!("{} 不是数字: {}", name, raw))
}

/// 取出每个指定元素第一次出现时的文本
pub fn first_element_texts(xml: &str, names: &[&str]) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut found: HashMap<String, String> = HashMap::new();
    let mut current: Option<(String, String)> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if current.is_none() && names.contains(&name.as_str()) && !found.contains_key(&name) {
                    current = Some((name, String::new()));
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if current.is_none() && names.contains(&name.as_str()) {
                    found.entry(name).or_default();
                }
            }
            Event::Text(e) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if current.as_ref().is_some_and(|(open, _)| *open == name) {
                    if let Some((name, text)) = current.take() {
                        found.insert(name, text.trim().to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(found)
}
