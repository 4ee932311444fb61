//! Crossref 元数据文档
//!
//! - `xml` - 极简元素树与序列化
//! - `builder` - 投稿快照 → Crossref 4.3.7 文档 + 校验错误（纯函数，无 I/O）

pub mod builder;
pub mod xml;

pub use builder::{build_document, BuildOutput, CrossrefDocument, DocumentBuilder};
pub use xml::XmlElement;

/// Crossref 命名空间
pub const CROSSREF_XMLNS: &str = "http://www.crossref.org/schema/4.3.7";
/// XML Schema 实例命名空间
pub const CROSSREF_XMLNS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Schema 文件地址
pub const CROSSREF_XSI_SCHEMALOCATION: &str = "http://www.crossref.org/schemas/crossref4.3.7.xsd";
/// Schema 版本
pub const CROSSREF_VERSION: &str = "4.3.7";
/// 根元素
pub const ROOT_ELEMENT: &str = "doi_batch";
/// 注册成功时写入 DOI 记录的机构标记
pub const REGISTRATION_AGENCY: &str = "CrossrefExportPlugin";
