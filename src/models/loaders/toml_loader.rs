use crate::models::submission::Submission;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一个投稿快照
pub async fn load_submission(toml_file_path: &Path) -> Result<Submission> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut submission: Submission = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    // 设置文件路径
    submission.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(submission)
}

/// 从文件夹中加载所有 TOML 投稿，按文件名排序
///
/// 无法解析的文件只记录警告并跳过
pub async fn load_all_submissions(folder_path: &str) -> Result<Vec<Submission>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut submissions = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_submission(&path).await {
            Ok(submission) => {
                tracing::info!(
                    "成功加载投稿 {}，章节数: {}",
                    submission.id,
                    submission.publication.chapters.len()
                );
                submissions.push(submission);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(submissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_TOML: &str = r#"
id = 42
url_path = "river-book"

[publication]
locale = "en_US"
title = "Rivers of Europe"
series_id = 5
series_position = "3"
date_published = "2023-09-01"
doi = "10.1234/rivers"

[[publication.chapters]]
title = "The Rhine"
pages = "1-20"
doi = "10.1234/rivers.1"
source_chapter_id = 100

[[publication.chapters.authors]]
given_name = "Jane"
family_name = "Doe"

[series]
id = 5
title = "European Waters"
online_issn = "1234-5678"
"#;

    #[tokio::test]
    async fn test_load_all_submissions_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.toml"), BOOK_TOML).await.unwrap();
        fs::write(dir.path().join("b.toml"), "id = ").await.unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").await.unwrap();

        let submissions = load_all_submissions(dir.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(submissions.len(), 1);
        let book = &submissions[0];
        assert_eq!(book.id, 42);
        assert_eq!(book.publication.chapters.len(), 1);
        assert_eq!(book.publication.chapters[0].authors[0].given_name.as_deref(), Some("Jane"));
        assert_eq!(book.series.as_ref().unwrap().online_issn.as_deref(), Some("1234-5678"));
        assert!(book.file_path.as_deref().unwrap().ends_with("a.toml"));
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let result = load_all_submissions("/definitely/not/here").await;
        assert!(result.is_err());
    }
}
