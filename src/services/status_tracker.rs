//! 存缴状态跟踪 - 业务能力层
//!
//! 把一次存缴结果写回投稿名下的全部 DOI 记录。
//! 同一投稿的 DOI 要么全部更新，要么回滚到更新前的样子。

use crate::clients::DepositOutcome;
use crate::crossref::REGISTRATION_AGENCY;
use crate::error::StatusError;
use crate::models::{DoiRecord, DoiStatus};
use crate::services::registry::DoiRegistry;
use tracing::{debug, error, info, warn};

/// 一次状态写入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// 更新了若干条记录
    Applied(usize),
    /// 沙盒跳过，记录保持不变
    Unchanged,
}

/// 存缴状态跟踪器
///
/// 持有 DOI 存储，是存缴结果写入存储的唯一入口
pub struct DepositStatusTracker<R> {
    registry: R,
}

impl<R: DoiRegistry> DepositStatusTracker<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn into_inner(self) -> R {
        self.registry
    }

    /// 记录一次存缴结果
    ///
    /// # 参数
    /// - `submission_id`: 投稿 ID
    /// - `outcome`: 存缴客户端返回的结果
    ///
    /// # 返回
    /// 更新的记录数；沙盒跳过时返回 `Unchanged`
    pub fn record_outcome(
        &mut self,
        submission_id: i64,
        outcome: &DepositOutcome,
    ) -> Result<StatusUpdate, StatusError> {
        let status = match outcome {
            DepositOutcome::Skipped => {
                debug!("[提交 {}] 沙盒跳过，不更新 DOI 状态", submission_id);
                return Ok(StatusUpdate::Unchanged);
            }
            DepositOutcome::Registered { .. } => DoiStatus::Registered,
            DepositOutcome::Failed(_) => DoiStatus::Error,
        };

        let batch_id = outcome.batch_id().map(str::to_string);
        let failed_msg = outcome.diagnostic().map(str::to_string);
        self.apply(submission_id, status, batch_id, failed_msg)
    }

    /// 记录一次本地失败（校验失败、写文件失败等，未发送请求）
    pub fn record_failure(
        &mut self,
        submission_id: i64,
        message: &str,
    ) -> Result<StatusUpdate, StatusError> {
        self.apply(submission_id, DoiStatus::Error, None, Some(message.to_string()))
    }

    fn apply(
        &mut self,
        submission_id: i64,
        status: DoiStatus,
        batch_id: Option<String>,
        failed_msg: Option<String>,
    ) -> Result<StatusUpdate, StatusError> {
        let originals = self
            .registry
            .dois_for_submission(submission_id)
            .map_err(|source| StatusError::Lookup {
                submission_id,
                source,
            })?;

        if originals.is_empty() {
            warn!("[提交 {}] ⚠️ 没有任何 DOI 记录，跳过状态更新", submission_id);
            return Ok(StatusUpdate::Applied(0));
        }

        let mut applied: Vec<&DoiRecord> = Vec::with_capacity(originals.len());
        for original in &originals {
            let updated = updated_record(original, status, &batch_id, &failed_msg);
            if let Err(source) = self.registry.save(&updated) {
                let rollback_ok = self.roll_back(&applied);
                error!(
                    "[提交 {}] ❌ DOI {} 状态写入失败，回滚 {} 条",
                    submission_id,
                    original.doi,
                    applied.len()
                );
                return Err(StatusError::PartialUpdate {
                    submission_id,
                    applied: applied.iter().map(|r| r.doi.clone()).collect(),
                    failed_doi: original.doi.clone(),
                    rollback_ok,
                    source,
                });
            }
            applied.push(original);
        }

        info!(
            "[提交 {}] 📝 {} 个 DOI 状态更新为 {}",
            submission_id,
            applied.len(),
            status
        );
        Ok(StatusUpdate::Applied(applied.len()))
    }

    /// 逐条恢复原记录，全部成功才返回 true
    fn roll_back(&mut self, applied: &[&DoiRecord]) -> bool {
        let mut ok = true;
        for original in applied {
            if let Err(e) = self.registry.save(original) {
                error!("❌ DOI {} 回滚失败: {}", original.doi, e);
                ok = false;
            }
        }
        ok
    }
}

fn updated_record(
    original: &DoiRecord,
    status: DoiStatus,
    batch_id: &Option<String>,
    failed_msg: &Option<String>,
) -> DoiRecord {
    let mut record = original.clone();
    record.status = status;
    record.batch_id = batch_id.clone();
    record.failed_msg = failed_msg.clone();
    if status == DoiStatus::Registered {
        record.registration_agency = Some(REGISTRATION_AGENCY.to_string());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::DepositFailure;
    use crate::error::RegistryError;
    use crate::services::registry::InMemoryDoiRegistry;

    fn registry_with(dois: &[(i64, &str)]) -> InMemoryDoiRegistry {
        let mut registry = InMemoryDoiRegistry::new();
        for (submission_id, doi) in dois {
            registry.insert(*submission_id, doi);
        }
        registry
    }

    /// 第 N 次写入失败的存储
    struct FlakyRegistry {
        inner: InMemoryDoiRegistry,
        saves: usize,
        fail_on: usize,
    }

    impl DoiRegistry for FlakyRegistry {
        fn dois_for_submission(&self, submission_id: i64) -> Result<Vec<DoiRecord>, RegistryError> {
            self.inner.dois_for_submission(submission_id)
        }

        fn save(&mut self, record: &DoiRecord) -> Result<(), RegistryError> {
            self.saves += 1;
            if self.saves == self.fail_on {
                return Err(RegistryError::Rejected("disk full".to_string()));
            }
            self.inner.save(record)
        }
    }

    #[test]
    fn test_registered_updates_every_doi() {
        let registry = registry_with(&[(1, "10.1/a"), (1, "10.1/a.1"), (2, "10.1/b")]);
        let mut tracker = DepositStatusTracker::new(registry);

        let outcome = DepositOutcome::Registered {
            batch_id: "batch-1".to_string(),
            warning: None,
        };
        let update = tracker.record_outcome(1, &outcome).unwrap();
        assert_eq!(update, StatusUpdate::Applied(2));

        for record in tracker.registry().dois_for_submission(1).unwrap() {
            assert_eq!(record.status, DoiStatus::Registered);
            assert_eq!(record.batch_id.as_deref(), Some("batch-1"));
            assert_eq!(record.failed_msg, None);
            assert_eq!(record.registration_agency.as_deref(), Some(REGISTRATION_AGENCY));
        }
        let other = tracker.registry().dois_for_submission(2).unwrap();
        assert_eq!(other[0].status, DoiStatus::None);
    }

    #[test]
    fn test_warning_keeps_registered_status() {
        let mut tracker = DepositStatusTracker::new(registry_with(&[(1, "10.1/a")]));
        let outcome = DepositOutcome::Registered {
            batch_id: "batch-2".to_string(),
            warning: Some("<warning_count>1</warning_count>".to_string()),
        };
        tracker.record_outcome(1, &outcome).unwrap();

        let record = &tracker.registry().dois_for_submission(1).unwrap()[0];
        assert_eq!(record.status, DoiStatus::Registered);
        assert!(record.failed_msg.as_deref().unwrap().contains("warning_count"));
    }

    #[test]
    fn test_redeposit_overwrites_previous_outcome() {
        let mut tracker = DepositStatusTracker::new(registry_with(&[(1, "10.1/a")]));

        let rejected = DepositOutcome::Failed(DepositFailure::Rejected {
            batch_id: Some("batch-old".to_string()),
            message: Some("bad xml".to_string()),
            diagnostic: Some("bad xml".to_string()),
        });
        tracker.record_outcome(1, &rejected).unwrap();
        let record = &tracker.registry().dois_for_submission(1).unwrap()[0];
        assert_eq!(record.status, DoiStatus::Error);
        assert_eq!(record.failed_msg.as_deref(), Some("bad xml"));

        let registered = DepositOutcome::Registered {
            batch_id: "batch-new".to_string(),
            warning: None,
        };
        tracker.record_outcome(1, &registered).unwrap();
        let record = &tracker.registry().dois_for_submission(1).unwrap()[0];
        assert_eq!(record.status, DoiStatus::Registered);
        assert_eq!(record.batch_id.as_deref(), Some("batch-new"));
        assert_eq!(record.failed_msg, None);
    }

    #[test]
    fn test_replaced_chapter_doi_is_not_updated() {
        use crate::models::{Chapter, Publication, Submission};

        let book = |chapter_doi: &str| Submission {
            id: 1,
            url_path: None,
            publication: Publication {
                locale: "en_US".to_string(),
                title: Some("Book".to_string()),
                series_id: None,
                series_position: None,
                date_published: None,
                doi: Some("10.1/book".to_string()),
                chapters: vec![Chapter {
                    doi: Some(chapter_doi.to_string()),
                    source_chapter_id: 5,
                    ..Chapter::default()
                }],
            },
            series: None,
            file_path: None,
        };

        let mut registry = InMemoryDoiRegistry::new();
        registry.seed_from(&[book("10.1/old")]);
        registry.seed_from(&[book("10.1/new")]);
        let mut tracker = DepositStatusTracker::new(registry);

        let outcome = DepositOutcome::Registered {
            batch_id: "batch-4".to_string(),
            warning: None,
        };
        assert_eq!(tracker.record_outcome(1, &outcome).unwrap(), StatusUpdate::Applied(2));

        let registry = tracker.into_inner();
        assert!(registry.records().all(|r| r.doi != "10.1/old"));
        assert!(registry.records().all(|r| r.status == DoiStatus::Registered));
    }

    #[test]
    fn test_skipped_changes_nothing() {
        let mut tracker = DepositStatusTracker::new(registry_with(&[(1, "10.1/a")]));
        let before = tracker.registry().dois_for_submission(1).unwrap();

        let update = tracker.record_outcome(1, &DepositOutcome::Skipped).unwrap();

        assert_eq!(update, StatusUpdate::Unchanged);
        assert_eq!(tracker.registry().dois_for_submission(1).unwrap(), before);
    }

    #[test]
    fn test_record_failure_marks_error_without_batch() {
        let mut tracker = DepositStatusTracker::new(registry_with(&[(3, "10.1/c")]));
        tracker.record_failure(3, "投稿 3 缺少必填元素: Title").unwrap();

        let record = &tracker.registry().dois_for_submission(3).unwrap()[0];
        assert_eq!(record.status, DoiStatus::Error);
        assert_eq!(record.batch_id, None);
        assert_eq!(record.registration_agency, None);
        assert!(record.failed_msg.as_deref().unwrap().contains("Title"));
    }

    #[test]
    fn test_failed_save_rolls_back_applied_records() {
        let registry = FlakyRegistry {
            inner: registry_with(&[(1, "10.1/a"), (1, "10.1/a.1"), (1, "10.1/a.2")]),
            saves: 0,
            fail_on: 3,
        };
        let mut tracker = DepositStatusTracker::new(registry);

        let outcome = DepositOutcome::Registered {
            batch_id: "batch-3".to_string(),
            warning: None,
        };
        let err = tracker.record_outcome(1, &outcome).unwrap_err();

        match err {
            StatusError::PartialUpdate {
                applied,
                failed_doi,
                rollback_ok,
                ..
            } => {
                assert_eq!(applied, vec!["10.1/a".to_string(), "10.1/a.1".to_string()]);
                assert_eq!(failed_doi, "10.1/a.2");
                assert!(rollback_ok);
            }
            other => panic!("unexpected error: {other}"),
        }

        for record in tracker.registry().dois_for_submission(1).unwrap() {
            assert_eq!(record.status, DoiStatus::None);
            assert_eq!(record.batch_id, None);
        }
    }
}
