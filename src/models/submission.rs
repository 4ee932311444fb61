use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// 投稿（一本书）快照
///
/// 由加载器一次性读入，构建器只读不写
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    /// 公开路径，存在时优先用于资源链接
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    /// 当前版本
    pub publication: Publication,
    /// 已解析的丛书信息（publication.series_id 存在时由加载方填入）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,
    /// 来源 TOML 文件路径（仅用于日志）
    #[serde(skip)]
    pub file_path: Option<String>,
}

impl Submission {
    /// 资源链接使用的公开 ID：url_path 优先，否则数字 ID
    pub fn best_id(&self) -> String {
        match self.url_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => self.id.to_string(),
        }
    }

    /// 本投稿拥有的全部 DOI 字符串（书 + 各章节），按文档顺序
    pub fn doi_strings(&self) -> Vec<&str> {
        let mut dois = Vec::with_capacity(self.publication.chapters.len() + 1);
        if let Some(doi) = self.publication.doi.as_deref() {
            dois.push(doi);
        }
        dois.extend(
            self.publication
                .chapters
                .iter()
                .filter_map(|chapter| chapter.doi.as_deref()),
        );
        dois
    }
}

/// 当前出版版本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    /// 例如 `en_US`
    pub locale: String,
    /// 该 locale 下的书名
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub series_id: Option<i64>,
    /// 丛书中的位置，写入 volume
    #[serde(default)]
    pub series_position: Option<String>,
    /// 出版日期，`YYYY-MM-DD` 或 `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub date_published: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl Publication {
    /// 出版年份
    pub fn publication_year(&self) -> Option<i32> {
        let raw = self.date_published.as_deref()?.trim();
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .ok()
            .map(|date| date.year())
    }

    /// 由 locale 得到 ISO 639-1 语言代码，例如 `en_US` → `en`
    pub fn language_code(&self) -> Option<String> {
        static LOCALE_RE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = LOCALE_RE
            .get_or_init(|| Regex::new(r"^([A-Za-z]{2,3})(?:[_@-]|$)").ok())
            .as_ref()?;
        re.captures(self.locale.trim())
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
    }
}

/// 章节
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub title: Option<String>,
    /// 页码范围，例如 `12-20`
    #[serde(default)]
    pub pages: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub doi: Option<String>,
    /// 稳定的章节来源 ID，用于章节资源链接
    pub source_chapter_id: i64,
}

/// 作者
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

impl Author {
    pub fn new(given_name: Option<&str>, family_name: Option<&str>) -> Self {
        Self {
            given_name: given_name.map(str::to_string),
            family_name: family_name.map(str::to_string),
        }
    }
}

/// 丛书
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    /// 电子版 ISSN
    #[serde(default)]
    pub online_issn: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(locale: &str, date: Option<&str>) -> Publication {
        Publication {
            locale: locale.to_string(),
            title: None,
            series_id: None,
            series_position: None,
            date_published: date.map(str::to_string),
            doi: None,
            chapters: Vec::new(),
        }
    }

    #[test]
    fn test_publication_year() {
        assert_eq!(publication("en_US", Some("2021-06-30")).publication_year(), Some(2021));
        assert_eq!(
            publication("en_US", Some("2019-01-02 10:11:12")).publication_year(),
            Some(2019)
        );
        assert_eq!(publication("en_US", Some("soon")).publication_year(), None);
        assert_eq!(publication("en_US", None).publication_year(), None);
    }

    #[test]
    fn test_language_code() {
        assert_eq!(publication("en_US", None).language_code().as_deref(), Some("en"));
        assert_eq!(publication("de", None).language_code().as_deref(), Some("de"));
        assert_eq!(publication("sr@latin", None).language_code().as_deref(), Some("sr"));
        assert_eq!(publication("", None).language_code(), None);
    }

    #[test]
    fn test_best_id_prefers_url_path() {
        let mut submission = Submission {
            id: 12,
            url_path: Some("open-book".to_string()),
            publication: publication("en_US", None),
            series: None,
            file_path: None,
        };
        assert_eq!(submission.best_id(), "open-book");
        submission.url_path = Some("  ".to_string());
        assert_eq!(submission.best_id(), "12");
    }
}
