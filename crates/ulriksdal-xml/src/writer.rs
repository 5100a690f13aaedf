#![forbid(unsafe_code)]

//! XML writing utilities using quick-xml's `Writer`.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use std::borrow::Cow;
use ulriksdal_core::Error;

/// A simple XML writer wrapping quick-xml's `Writer`.
pub struct XmlWriter {
    writer: quick_xml::Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Create a new XML writer.
    pub fn new() -> Self {
        Self {
            writer: quick_xml::Writer::new(Vec::new()),
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), Error> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlWrite(e.to_string()))
    }

    /// Write the XML declaration.
    pub fn write_declaration(&mut self) -> Result<(), Error> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    /// Start an element with the given name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        let start = start_tag(name, attrs);
        self.write(Event::Start(start))
    }

    /// Write an empty element (self-closing).
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        let start = start_tag(name, attrs);
        self.write(Event::Empty(start))
    }

    /// End the current element.
    pub fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Write text content. Markup characters and carriage returns are
    /// escaped, so a parser's line-end handling gives back `text`.
    pub fn write_text(&mut self, text: &str) -> Result<(), Error> {
        let escaped = partial_escape(text).replace('\r', "&#xD;");
        self.write(Event::Text(BytesText::from_escaped(escaped)))
    }

    /// Write a comment verbatim.
    pub fn write_comment(&mut self, text: &str) -> Result<(), Error> {
        self.write(Event::Comment(BytesText::from_escaped(text)))
    }

    /// Finish writing and return the XML bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    /// Finish writing and return the XML as a string.
    pub fn into_string(self) -> Result<String, Error> {
        String::from_utf8(self.into_bytes()).map_err(|e| Error::XmlWrite(e.to_string()))
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn start_tag<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attrs {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_attribute(value).into_bytes()),
        });
    }
    start
}

/// Escape an attribute value so that attribute-value normalization on
/// re-parse gives back exactly `value`.
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\t', "&#x9;")
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_text_and_attributes() {
        let mut w = XmlWriter::new();
        w.start_element("a", &[("k", "x\"<y")]).unwrap();
        w.write_text("1 < 2 & 3").unwrap();
        w.end_element("a").unwrap();
        let out = w.into_string().unwrap();
        assert!(out.starts_with("<a k=\"x&quot;&lt;y\">"));
        assert!(out.contains("1 &lt; 2 &amp; 3"));
        assert!(out.ends_with("</a>"));
    }

    #[test]
    fn test_whitespace_in_attributes_escaped() {
        let mut w = XmlWriter::new();
        w.empty_element("a", &[("k", "x\ny\tz\r")]).unwrap();
        assert_eq!(w.into_string().unwrap(), "<a k=\"x&#xA;y&#x9;z&#xD;\"/>");
    }

    #[test]
    fn test_carriage_return_in_text_escaped() {
        let mut w = XmlWriter::new();
        w.start_element("a", &[]).unwrap();
        w.write_text("1\r\n2").unwrap();
        w.end_element("a").unwrap();
        assert_eq!(w.into_string().unwrap(), "<a>1&#xD;\n2</a>");
    }

    #[test]
    fn test_empty_element() {
        let mut w = XmlWriter::new();
        w.empty_element("x:b", &[("xmlns:x", "urn:x")]).unwrap();
        assert_eq!(w.into_string().unwrap(), "<x:b xmlns:x=\"urn:x\"/>");
    }
}
