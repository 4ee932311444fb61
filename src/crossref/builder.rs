//! Crossref 文档构建器
//!
//! ## 职责
//!
//! 把一个投稿快照（书 + 章节 + 作者 + 丛书）和出版社配置转换成
//! Crossref 4.3.7 的 `doi_batch` 文档，同时收集缺失必填字段的校验错误。
//!
//! ## 约定
//!
//! - 从不因为缺数据而失败：缺少必填字段时记录一个 `ValidationError`，
//!   并省略对应节点，文档照常产出
//! - 一个投稿恰好产出一个 `book` 节点，每个章节恰好一个 `content_item`
//! - 纯函数：不读配置、不做 I/O，时间由调用方传入

use chrono::NaiveDateTime;
use tracing::warn;

use crate::config::PressContext;
use crate::crossref::xml::XmlElement;
use crate::crossref::{
    CROSSREF_VERSION, CROSSREF_XMLNS, CROSSREF_XMLNS_XSI, CROSSREF_XSI_SCHEMALOCATION, ROOT_ELEMENT,
};
use crate::error::ValidationError;
use crate::models::{Author, Chapter, Submission};

/// 构建结果：文档 + 校验错误
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub document: CrossrefDocument,
    pub errors: Vec<ValidationError>,
}

impl BuildOutput {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 一份构建好的 Crossref 文档
#[derive(Debug, Clone)]
pub struct CrossrefDocument {
    pub submission_id: i64,
    /// head 中的 doi_batch_id
    pub batch_id: String,
    pub root: XmlElement,
}

impl CrossrefDocument {
    pub fn to_xml_string(&self) -> Result<String, quick_xml::Error> {
        self.root.to_xml_string()
    }

    /// body 下唯一的 book 节点
    pub fn book(&self) -> Option<&XmlElement> {
        self.root.find_path(&["body", "book"])
    }
}

/// 便捷入口：`(快照, 出版社, 时间) → (文档, 错误)`
pub fn build_document(submission: &Submission, press: &PressContext, now: NaiveDateTime) -> BuildOutput {
    DocumentBuilder::new(press).build(submission, now)
}

/// 书的元数据形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookVariant {
    /// 单本书 `book_metadata`
    Plain,
    /// 丛书中的一本 `book_series_metadata`
    Series,
}

/// 文档构建器
pub struct DocumentBuilder<'a> {
    press: &'a PressContext,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(press: &'a PressContext) -> Self {
        Self { press }
    }

    /// 构建文档
    ///
    /// # 参数
    /// - `submission`: 投稿快照
    /// - `now`: 生成时间，用于批次 ID 和时间戳
    pub fn build(&self, submission: &Submission, now: NaiveDateTime) -> BuildOutput {
        let mut errors = Vec::new();
        let batch_id = format!("{}-{}", now.format("%Y-%m-%d-%-H-%M-%S"), submission.id);

        let root = self
            .root_node()
            .child(self.head_node(submission.id, &batch_id, now, &mut errors))
            .child(self.body_node(submission, &mut errors));

        BuildOutput {
            document: CrossrefDocument {
                submission_id: submission.id,
                batch_id,
                root,
            },
            errors,
        }
    }

    fn root_node(&self) -> XmlElement {
        XmlElement::new(ROOT_ELEMENT)
            .attr("xmlns", CROSSREF_XMLNS)
            .attr("xmlns:xsi", CROSSREF_XMLNS_XSI)
            .attr("version", CROSSREF_VERSION)
            .attr(
                "xsi:schemaLocation",
                format!("{} {}", CROSSREF_XMLNS, CROSSREF_XSI_SCHEMALOCATION),
            )
    }

    // ========== head ==========

    fn head_node(
        &self,
        submission_id: i64,
        batch_id: &str,
        now: NaiveDateTime,
        errors: &mut Vec<ValidationError>,
    ) -> XmlElement {
        let mut head = XmlElement::new("head")
            .child(XmlElement::with_text("doi_batch_id", batch_id))
            .child(XmlElement::with_text(
                "timestamp",
                now.format("%Y%m%d%-H%M%S").to_string(),
            ));

        let depositor_name = non_empty(self.press.depositor_name.as_deref());
        let depositor_email = non_empty(self.press.depositor_email.as_deref());

        let mut depositor = XmlElement::new("depositor");
        match depositor_name {
            Some(name) => depositor.push(XmlElement::with_text("depositor_name", name)),
            None => errors.push(ValidationError::new(submission_id, "Depositor Name")),
        }
        match depositor_email {
            Some(email) => depositor.push(XmlElement::with_text("email_address", email)),
            None => errors.push(ValidationError::new(submission_id, "Depositor Email")),
        }
        head.push(depositor);

        // 注册方沿用存缴人名称
        if let Some(name) = depositor_name {
            head.push(XmlElement::with_text("registrant", name));
        }
        head
    }

    // ========== body ==========

    fn body_node(&self, submission: &Submission, errors: &mut Vec<ValidationError>) -> XmlElement {
        let mut book = XmlElement::new("book").attr("book_type", "edited_book");
        book.push(self.book_metadata_node(submission, errors));

        for chapter in &submission.publication.chapters {
            book.push(self.content_item_node(submission, chapter, errors));
        }

        XmlElement::new("body").child(book)
    }

    fn book_variant(&self, submission: &Submission, errors: &mut Vec<ValidationError>) -> BookVariant {
        match (submission.publication.series_id, submission.series.as_ref()) {
            (Some(_), Some(_)) => BookVariant::Series,
            (Some(series_id), None) => {
                warn!(
                    "[提交 {}] 丛书 {} 不存在，按单本书处理",
                    submission.id, series_id
                );
                errors.push(ValidationError::new(submission.id, "Series"));
                BookVariant::Plain
            }
            (None, _) => BookVariant::Plain,
        }
    }

    fn book_metadata_node(&self, submission: &Submission, errors: &mut Vec<ValidationError>) -> XmlElement {
        let publication = &submission.publication;
        let variant = self.book_variant(submission, errors);

        let name = match variant {
            BookVariant::Plain => "book_metadata",
            BookVariant::Series => "book_series_metadata",
        };
        let mut metadata = XmlElement::new(name);
        if let Some(language) = publication.language_code() {
            metadata = metadata.attr("language", language);
        }

        // 丛书信息：series_metadata 在最前
        let mut volume = None;
        if variant == BookVariant::Series {
            let (series_metadata, position) = self.series_nodes(submission, errors);
            metadata.push(series_metadata);
            volume = position;
        }

        match non_empty(publication.title.as_deref()) {
            Some(title) => metadata.push(titles_node(title)),
            None => errors.push(ValidationError::new(submission.id, "Title")),
        }

        if let Some(volume) = volume {
            metadata.push(volume);
        }

        match publication.publication_year() {
            Some(year) => metadata.push(
                XmlElement::new("publication_date")
                    .attr("media_type", "online")
                    .child(XmlElement::with_text("year", year.to_string())),
            ),
            None => errors.push(ValidationError::new(submission.id, "Publication Date")),
        }

        match self.press.publisher_name(&publication.locale) {
            Some(publisher) => metadata.push(
                XmlElement::new("publisher")
                    .child(XmlElement::with_text("publisher_name", publisher)),
            ),
            None => errors.push(ValidationError::new(submission.id, "Publisher Name")),
        }

        if let Some(doi) = non_empty(publication.doi.as_deref()) {
            metadata.push(doi_data_node(doi, self.book_url(submission)));
        }

        metadata
    }

    /// 返回 series_metadata 节点和（可能缺失的）volume 节点
    fn series_nodes(
        &self,
        submission: &Submission,
        errors: &mut Vec<ValidationError>,
    ) -> (XmlElement, Option<XmlElement>) {
        let mut series_metadata = XmlElement::new("series_metadata");
        let series = submission.series.as_ref();

        match non_empty(series.and_then(|s| s.title.as_deref())) {
            Some(title) => series_metadata.push(titles_node(title)),
            None => errors.push(ValidationError::new(submission.id, "Series Title")),
        }

        match non_empty(series.and_then(|s| s.online_issn.as_deref())) {
            Some(issn) => series_metadata.push(XmlElement::with_text("issn", issn)),
            None => errors.push(ValidationError::new(submission.id, "Series ISSN")),
        }

        let volume = match non_empty(submission.publication.series_position.as_deref()) {
            Some(position) => Some(XmlElement::with_text("volume", position)),
            None => {
                errors.push(ValidationError::new(submission.id, "Series Position"));
                None
            }
        };

        (series_metadata, volume)
    }

    // ========== 章节 ==========

    fn content_item_node(
        &self,
        submission: &Submission,
        chapter: &Chapter,
        errors: &mut Vec<ValidationError>,
    ) -> XmlElement {
        let mut item = XmlElement::new("content_item")
            .attr("component_type", "chapter")
            .attr("publication_type", "full_text");

        if let Some(contributors) = contributors_node(&chapter.authors) {
            item.push(contributors);
        }

        if let Some(title) = non_empty(chapter.title.as_deref()) {
            item.push(titles_node(title));
        }

        if let Some(pages) = non_empty(chapter.pages.as_deref()) {
            match split_pages(pages) {
                Some((first, last)) => item.push(
                    XmlElement::new("pages")
                        .child(XmlElement::with_text("first_page", first))
                        .child(XmlElement::with_text("last_page", last)),
                ),
                None => warn!("[提交 {}] 无法识别的页码: {}", submission.id, pages),
            }
        }

        match non_empty(chapter.doi.as_deref()) {
            Some(doi) => item.push(doi_data_node(doi, self.chapter_url(submission, chapter))),
            None => errors.push(ValidationError::new(
                submission.id,
                format!("Chapter DOI ({})", chapter.source_chapter_id),
            )),
        }

        item
    }

    // ========== 资源链接 ==========

    fn book_url(&self, submission: &Submission) -> String {
        format!(
            "{}/catalog/book/{}",
            self.press.base_url.trim_end_matches('/'),
            submission.best_id()
        )
    }

    fn chapter_url(&self, submission: &Submission, chapter: &Chapter) -> String {
        format!(
            "{}/chapter/{}",
            self.book_url(submission),
            chapter.source_chapter_id
        )
    }
}

// ========== 节点辅助函数 ==========

fn titles_node(title: &str) -> XmlElement {
    XmlElement::new("titles").child(XmlElement::with_text("title", title))
}

fn doi_data_node(doi: &str, resource: String) -> XmlElement {
    XmlElement::new("doi_data")
        .child(XmlElement::with_text("doi", doi))
        .child(XmlElement::with_text("resource", resource))
}

/// 作者列表 → contributors
///
/// 第一个可用作者为 first，其余为 additional；只有名没有姓时把名写进 surname；
/// 两者都没有的作者直接跳过。没有可用作者时返回 None。
fn contributors_node(authors: &[Author]) -> Option<XmlElement> {
    let mut contributors = XmlElement::new("contributors");

    for author in authors {
        let given = non_empty(author.given_name.as_deref());
        let family = non_empty(author.family_name.as_deref());

        let names: Vec<XmlElement> = match (given, family) {
            (Some(given), Some(family)) => vec![
                XmlElement::with_text("given_name", given),
                XmlElement::with_text("surname", family),
            ],
            (Some(single), None) | (None, Some(single)) => {
                vec![XmlElement::with_text("surname", single)]
            }
            (None, None) => continue,
        };

        let sequence = if contributors.children.is_empty() {
            "first"
        } else {
            "additional"
        };
        let mut person = XmlElement::new("person_name")
            .attr("sequence", sequence)
            .attr("contributor_role", "author");
        for name in names {
            person.push(name);
        }
        contributors.push(person);
    }

    if contributors.children.is_empty() {
        None
    } else {
        Some(contributors)
    }
}

/// 页码字符串 → (first_page, last_page)
///
/// 以 `-` 分割；没有第二段时首页兼作末页。超过两段时只取前两段。
fn split_pages(pages: &str) -> Option<(String, String)> {
    let mut segments = pages.split('-').map(str::trim);
    let first = segments.next().filter(|s| !s.is_empty())?;
    let last = segments.next().filter(|s| !s.is_empty()).unwrap_or(first);
    if segments.next().is_some() {
        warn!("页码 {} 含有多个连字符，只使用前两段", pages);
    }
    Some((first.to_string(), last.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
