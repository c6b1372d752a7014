//! Thin layer over quick-xml that keeps the renderer code declarative.

use std::collections::HashMap;

use brohub_core::AppError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

fn render_error(err: impl std::fmt::Display) -> AppError {
    AppError::XmlRender(err.to_string())
}

/// Sequential `gml:id` values. Identifiers may not start with a digit, and
/// the portal expects them stable within one document.
pub(crate) struct IdGen {
    document: u32,
    labels: HashMap<String, u32>,
}

impl IdGen {
    pub(crate) fn new() -> Self {
        IdGen {
            document: 0,
            labels: HashMap::new(),
        }
    }

    /// Zero-padded document id, `id_0001` style.
    pub(crate) fn document_id(&mut self) -> String {
        self.document += 1;
        format!("id_{:04}", self.document)
    }

    /// Running id per prefix, `measuringpoint_1` style. Each prefix counts
    /// independently, so sibling structures number from 1.
    pub(crate) fn labeled(&mut self, prefix: &str) -> String {
        let count = self.labels.entry(prefix.to_string()).or_insert(0);
        *count += 1;
        format!("{}_{}", prefix, count)
    }
}

pub(crate) struct DocWriter {
    inner: Writer<Vec<u8>>,
}

impl DocWriter {
    pub(crate) fn new() -> Self {
        DocWriter {
            inner: Writer::new_with_indent(Vec::new(), b' ', 4),
        }
    }

    pub(crate) fn declaration(&mut self) -> Result<(), AppError> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(render_error)
    }

    pub(crate) fn open(&mut self, name: &str) -> Result<(), AppError> {
        self.open_with(name, &[])
    }

    pub(crate) fn open_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), AppError> {
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            start.push_attribute((*key, *value));
        }
        self.inner
            .write_event(Event::Start(start))
            .map_err(render_error)
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<(), AppError> {
        self.inner
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(render_error)
    }

    pub(crate) fn leaf(&mut self, name: &str, text: &str) -> Result<(), AppError> {
        self.leaf_with(name, &[], text)
    }

    pub(crate) fn leaf_with(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), AppError> {
        self.open_with(name, attrs)?;
        self.inner
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(render_error)?;
        self.close(name)
    }

    /// Writes the element only when the value is present and non-empty.
    /// Optional fields with an empty value are omitted, never rendered empty.
    pub(crate) fn opt_leaf(&mut self, name: &str, value: Option<&str>) -> Result<(), AppError> {
        self.opt_leaf_with(name, &[], value)
    }

    pub(crate) fn opt_leaf_with(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        value: Option<&str>,
    ) -> Result<(), AppError> {
        match value {
            Some(text) if !text.trim().is_empty() => self.leaf_with(name, attrs, text),
            _ => Ok(()),
        }
    }

    pub(crate) fn empty(&mut self, name: &str) -> Result<(), AppError> {
        self.inner
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(render_error)
    }

    /// A date leaf wrapped in the common `brocom:date` element.
    pub(crate) fn date_block(&mut self, name: &str, date: &str) -> Result<(), AppError> {
        self.open(name)?;
        self.leaf("brocom:date", date)?;
        self.close(name)
    }

    pub(crate) fn into_string(self) -> Result<String, AppError> {
        String::from_utf8(self.inner.into_inner()).map_err(render_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_id_label_counts_independently() {
        let mut ids = IdGen::new();
        assert_eq!(ids.document_id(), "id_0001");
        assert_eq!(ids.labeled("measuringpoint"), "measuringpoint_1");
        assert_eq!(ids.labeled("tube"), "tube_1");
        assert_eq!(ids.labeled("measuringpoint"), "measuringpoint_2");
        assert_eq!(ids.labeled("tube"), "tube_2");
        assert_eq!(ids.document_id(), "id_0002");
    }

    #[test]
    fn opt_leaf_skips_empty_values() {
        let mut doc = DocWriter::new();
        doc.open("root").unwrap();
        doc.opt_leaf("kept", Some("value")).unwrap();
        doc.opt_leaf("dropped", Some("   ")).unwrap();
        doc.opt_leaf("absent", None).unwrap();
        doc.close("root").unwrap();

        let xml = doc.into_string().unwrap();
        assert!(xml.contains("<kept>value</kept>"));
        assert!(!xml.contains("dropped"));
        assert!(!xml.contains("absent"));
    }

    #[test]
    fn text_is_escaped() {
        let mut doc = DocWriter::new();
        doc.leaf("name", "put < 3 & put > 1").unwrap();
        let xml = doc.into_string().unwrap();
        assert!(xml.contains("put &lt; 3 &amp; put &gt; 1"));
    }
}
