//! 极简 XML 元素树
//!
//! 只覆盖 Crossref 文档需要的形态：元素、属性、纯文本内容。
//! 序列化交给 `quick-xml` 的 Writer，负责转义与缩进。

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};

/// XML 元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// 创建空元素
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// 创建只含文本的元素
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.text = Some(text.into());
        element
    }

    /// 追加属性（链式）
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// 追加子元素（链式）
    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// 追加子元素
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// 读取属性值
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 文本内容
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// 第一个同名直接子元素
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// 所有同名直接子元素
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// 按路径查找，例如 `find_path(&["head", "doi_batch_id"])`
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |element, name| element.find(name))
    }

    /// 子树中所有同名元素（深度优先，包含自身）
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        if self.name == name {
            found.push(self);
        }
        for child in &self.children {
            child.collect_descendants(name, found);
        }
    }

    /// 序列化为带 XML 声明、两空格缩进的字符串
    pub fn to_xml_string(&self) -> Result<String, quick_xml::Error> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_element(&mut writer, self)?;
        let bytes = writer.into_inner().into_inner();
        // 输入全部来自 &str，必然是合法 UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<(), quick_xml::Error> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.text.is_none() && element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &element.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_escapes_text_and_attributes() {
        let root = XmlElement::new("titles")
            .attr("lang", "a\"b")
            .child(XmlElement::with_text("title", "Fish & Chips <2nd ed.>"));

        let xml = root.to_xml_string().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("Fish &amp; Chips &lt;2nd ed.&gt;"));
        assert!(xml.contains("lang=\"a&quot;b\""));
        assert!(xml.contains("</titles>"));
    }

    #[test]
    fn test_find_path_and_descendants() {
        let root = XmlElement::new("doi_batch").child(
            XmlElement::new("body").child(
                XmlElement::new("book")
                    .child(XmlElement::new("content_item"))
                    .child(XmlElement::new("content_item")),
            ),
        );

        assert!(root.find_path(&["body", "book"]).is_some());
        assert!(root.find_path(&["body", "journal"]).is_none());
        assert_eq!(root.descendants("content_item").len(), 2);
        assert_eq!(root.find_path(&["body", "book"]).unwrap().find_all("content_item").count(), 2);
    }

    #[test]
    fn test_empty_element_is_self_closing() {
        let xml = XmlElement::new("series_metadata").to_xml_string().unwrap();
        assert!(xml.contains("<series_metadata/>"));
    }
}
