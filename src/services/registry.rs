//! DOI 记录存储 - 业务能力层
//!
//! DOI 记录归存储所有，存缴状态跟踪器只通过这里读写

use crate::error::RegistryError;
use crate::models::{DoiRecord, Submission};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// DOI 记录存储接口
pub trait DoiRegistry {
    /// 某个投稿拥有的全部 DOI（书 + 章节），按 ID 排序
    fn dois_for_submission(&self, submission_id: i64) -> Result<Vec<DoiRecord>, RegistryError>;

    /// 覆盖保存一条记录
    fn save(&mut self, record: &DoiRecord) -> Result<(), RegistryError>;
}

/// 一次同步的变化量
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub added: usize,
    pub removed: usize,
}

impl SeedSummary {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// 内存存储
#[derive(Debug, Default, Clone)]
pub struct InMemoryDoiRegistry {
    records: BTreeMap<u64, DoiRecord>,
    next_id: u64,
}

impl InMemoryDoiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_records(records: Vec<DoiRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
            next_id,
        }
    }

    /// 登记一个 DOI，已存在（同一投稿同一 DOI）时返回原 ID
    pub fn insert(&mut self, submission_id: i64, doi: &str) -> u64 {
        if let Some(existing) = self
            .records
            .values()
            .find(|r| r.submission_id == submission_id && r.doi == doi)
        {
            return existing.id;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.records.insert(id, DoiRecord::new(id, submission_id, doi));
        id
    }

    /// 让每个投稿名下的记录与快照中的 DOI 一致
    ///
    /// 快照里新出现的 DOI 建立记录；快照里已不存在的旧 DOI 记录被删除，
    /// 之后的状态更新不会再落到它们身上
    pub fn seed_from(&mut self, submissions: &[Submission]) -> SeedSummary {
        let mut summary = SeedSummary::default();
        for submission in submissions {
            let current = submission.doi_strings();

            let stale: Vec<u64> = self
                .records
                .values()
                .filter(|r| r.submission_id == submission.id && !current.contains(&r.doi.as_str()))
                .map(|r| r.id)
                .collect();
            for id in stale {
                if let Some(record) = self.records.remove(&id) {
                    info!("[提交 {}] 🗑️ DOI {} 已不在投稿中，删除记录", submission.id, record.doi);
                    summary.removed += 1;
                }
            }

            for doi in current {
                let before = self.records.len();
                self.insert(submission.id, doi);
                summary.added += self.records.len() - before;
            }
        }
        summary
    }

    pub fn get(&self, id: u64) -> Option<&DoiRecord> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &DoiRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DoiRegistry for InMemoryDoiRegistry {
    fn dois_for_submission(&self, submission_id: i64) -> Result<Vec<DoiRecord>, RegistryError> {
        Ok(self
            .records
            .values()
            .filter(|r| r.submission_id == submission_id)
            .cloned()
            .collect())
    }

    fn save(&mut self, record: &DoiRecord) -> Result<(), RegistryError> {
        match self.records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(RegistryError::NotFound(record.id)),
        }
    }
}

/// JSON 文件存储
///
/// 启动时整体读入，每次保存整体重写（先写临时文件再替换）
#[derive(Debug)]
pub struct FileDoiRegistry {
    path: PathBuf,
    inner: InMemoryDoiRegistry,
}

impl FileDoiRegistry {
    /// 加载存储文件，文件不存在时从空开始
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let inner = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            let records: Vec<DoiRecord> = serde_json::from_str(&content)?;
            info!("✓ 已加载 {} 条 DOI 记录: {}", records.len(), path.display());
            InMemoryDoiRegistry::from_records(records)
        } else {
            info!("DOI 记录文件不存在，将新建: {}", path.display());
            InMemoryDoiRegistry::new()
        };
        Ok(Self { path, inner })
    }

    /// 与投稿快照同步并写盘
    pub fn seed_from(&mut self, submissions: &[Submission]) -> Result<SeedSummary, RegistryError> {
        let summary = self.inner.seed_from(submissions);
        if summary.changed() {
            self.persist()?;
            debug!("新增 {} 条、删除 {} 条 DOI 记录", summary.added, summary.removed);
        }
        Ok(summary)
    }

    pub fn records(&self) -> impl Iterator<Item = &DoiRecord> {
        self.inner.records()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: self.path.clone(),
            source,
        };
        let records: Vec<&DoiRecord> = self.inner.records().collect();
        let json = serde_json::to_string_pretty(&records)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl DoiRegistry for FileDoiRegistry {
    fn dois_for_submission(&self, submission_id: i64) -> Result<Vec<DoiRecord>, RegistryError> {
        self.inner.dois_for_submission(submission_id)
    }

    fn save(&mut self, record: &DoiRecord) -> Result<(), RegistryError> {
        let previous = self
            .inner
            .get(record.id)
            .cloned()
            .ok_or(RegistryError::NotFound(record.id))?;
        self.inner.save(record)?;
        if let Err(e) = self.persist() {
            // 写盘失败时内存也回到原值
            self.inner.save(&previous)?;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chapter, DoiStatus, Publication};

    fn submission(id: i64, book_doi: Option<&str>, chapter_dois: &[&str]) -> Submission {
        Submission {
            id,
            url_path: None,
            publication: Publication {
                locale: "en_US".to_string(),
                title: Some("Book".to_string()),
                series_id: None,
                series_position: None,
                date_published: None,
                doi: book_doi.map(str::to_string),
                chapters: chapter_dois
                    .iter()
                    .enumerate()
                    .map(|(i, doi)| Chapter {
                        doi: Some(doi.to_string()),
                        source_chapter_id: i as i64,
                        ..Chapter::default()
                    })
                    .collect(),
            },
            series: None,
            file_path: None,
        }
    }

    #[test]
    fn test_seed_is_idempotent() {
        let mut registry = InMemoryDoiRegistry::new();
        let books = vec![
            submission(1, Some("10.1/a"), &["10.1/a.1", "10.1/a.2"]),
            submission(2, None, &["10.1/b.1"]),
        ];

        assert_eq!(registry.seed_from(&books), SeedSummary { added: 4, removed: 0 });
        assert_eq!(registry.seed_from(&books), SeedSummary::default());
        assert_eq!(registry.dois_for_submission(1).unwrap().len(), 3);
        assert_eq!(registry.dois_for_submission(2).unwrap().len(), 1);
        assert!(registry.dois_for_submission(3).unwrap().is_empty());
    }

    #[test]
    fn test_seed_drops_dois_the_submission_no_longer_lists() {
        let mut registry = InMemoryDoiRegistry::new();
        registry.seed_from(&[submission(1, Some("10.1/book"), &["10.1/old"])]);

        let summary = registry.seed_from(&[submission(1, Some("10.1/book"), &["10.1/new"])]);

        assert_eq!(summary, SeedSummary { added: 1, removed: 1 });
        let dois: Vec<String> = registry
            .dois_for_submission(1)
            .unwrap()
            .into_iter()
            .map(|r| r.doi)
            .collect();
        assert_eq!(dois, vec!["10.1/book".to_string(), "10.1/new".to_string()]);
    }

    #[test]
    fn test_file_registry_persists_pruned_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dois.json");

        let mut registry = FileDoiRegistry::load(&path).unwrap();
        registry
            .seed_from(&[submission(1, None, &["10.1/old"])])
            .unwrap();
        registry
            .seed_from(&[submission(1, None, &["10.1/new"])])
            .unwrap();

        let reloaded = FileDoiRegistry::load(&path).unwrap();
        let records = reloaded.dois_for_submission(1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].doi, "10.1/new");
    }

    #[test]
    fn test_save_unknown_record_fails() {
        let mut registry = InMemoryDoiRegistry::new();
        let record = DoiRecord::new(99, 1, "10.1/x");
        assert!(matches!(registry.save(&record), Err(RegistryError::NotFound(99))));
    }

    #[test]
    fn test_file_registry_round_trips_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dois.json");

        let mut registry = FileDoiRegistry::load(&path).unwrap();
        registry
            .seed_from(&[submission(1, Some("10.1/a"), &["10.1/a.1"])])
            .unwrap();

        let mut record = registry.dois_for_submission(1).unwrap().remove(0);
        record.status = DoiStatus::Registered;
        record.batch_id = Some("batch-1".to_string());
        registry.save(&record).unwrap();

        let reloaded = FileDoiRegistry::load(&path).unwrap();
        let records = reloaded.dois_for_submission(1).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, DoiStatus::Registered);
        assert_eq!(records[0].batch_id.as_deref(), Some("batch-1"));
        assert_eq!(records[1].status, DoiStatus::None);
    }

    #[test]
    fn test_file_registry_rejects_broken_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dois.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(FileDoiRegistry::load(&path), Err(RegistryError::Format(_))));
    }
}
