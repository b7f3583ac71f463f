//! Plain-text pages from a DOCX document.
//!
//! A page is the text between explicit page breaks (`<w:br w:type="page"/>`)
//! in body paragraphs. Tables are rendered one row per line with non-empty
//! cells joined by ` | `.

use crate::error::ConfigurationError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";

/// Reads the first `max_pages` pages of a DOCX file as plain text.
///
/// # Errors
///
/// Returns `ConfigurationError::Unreadable` if the file is not a readable
/// DOCX package or its main part is not well-formed XML.
pub fn read_docx_pages(path: &Path, max_pages: usize) -> Result<Vec<String>, ConfigurationError> {
    let unreadable = |reason: String| ConfigurationError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| unreadable(e.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| unreadable(format!("{DOCUMENT_PART}: {e}")))?;
    let mut xml = Vec::new();
    part.read_to_end(&mut xml).map_err(|e| unreadable(e.to_string()))?;

    let pages = pages_from_xml(&xml, max_pages).map_err(unreadable)?;
    tracing::info!(path = %path.display(), pages = pages.len(), "read document");
    Ok(pages)
}

/// Same as [`read_docx_pages`], with pages separated by a blank line.
///
/// # Errors
///
/// See [`read_docx_pages`].
pub fn read_docx_text(path: &Path, max_pages: usize) -> Result<String, ConfigurationError> {
    Ok(read_docx_pages(path, max_pages)?.join("\n\n"))
}

#[derive(Default)]
struct PageCollector {
    max_pages: usize,
    pages: Vec<String>,
    lines: Vec<String>,
    paragraph: String,
    page_break: bool,
    in_text: bool,
    table_depth: usize,
    table_rows: Vec<String>,
    row_cells: Vec<String>,
    cell: String,
}

impl PageCollector {
    fn new(max_pages: usize) -> Self {
        Self {
            max_pages: max_pages.max(1),
            ..Self::default()
        }
    }

    fn full(&self) -> bool {
        self.pages.len() >= self.max_pages
    }

    fn push_text(&mut self, text: &str) {
        if self.table_depth == 0 {
            self.paragraph.push_str(text);
        } else {
            self.cell.push_str(text);
        }
    }

    fn flush_page(&mut self) {
        if !self.lines.is_empty() {
            let page = self.lines.join("\n");
            self.lines.clear();
            self.pages.push(page.trim().to_string());
        }
    }

    fn start(&mut self, element: &BytesStart<'_>) {
        match element.local_name().as_ref() {
            b"t" => self.in_text = true,
            b"p" if self.table_depth == 0 => {
                self.paragraph.clear();
                self.page_break = false;
            }
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table_rows.clear();
                }
            }
            b"tr" if self.table_depth == 1 => self.row_cells.clear(),
            b"tc" if self.table_depth == 1 => self.cell.clear(),
            _ => self.inline(element),
        }
    }

    fn inline(&mut self, element: &BytesStart<'_>) {
        match element.local_name().as_ref() {
            b"br" if is_page_break(element) => {
                if self.table_depth == 0 {
                    self.page_break = true;
                }
            }
            b"br" | b"cr" => self.push_text("\n"),
            b"tab" => self.push_text("\t"),
            _ => {}
        }
    }

    fn end(&mut self, local_name: &[u8]) {
        match local_name {
            b"t" => self.in_text = false,
            b"p" if self.table_depth == 0 => {
                let text = self.paragraph.trim();
                if !text.is_empty() {
                    self.lines.push(text.to_string());
                }
                if self.page_break {
                    self.flush_page();
                }
            }
            b"p" => self.cell.push('\n'),
            b"tc" if self.table_depth == 1 => {
                let cell = self.cell.trim().to_string();
                self.row_cells.push(cell);
            }
            b"tr" if self.table_depth == 1 => {
                let cells: Vec<&str> = self
                    .row_cells
                    .iter()
                    .map(String::as_str)
                    .filter(|c| !c.is_empty())
                    .collect();
                if !cells.is_empty() {
                    self.table_rows.push(cells.join(" | "));
                }
            }
            b"tbl" => {
                if self.table_depth == 1 && !self.table_rows.is_empty() {
                    self.lines.push(self.table_rows.join("\n"));
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<String> {
        if !self.full() {
            self.flush_page();
        }
        self.pages.truncate(self.max_pages);
        self.pages
    }
}

fn is_page_break(element: &BytesStart<'_>) -> bool {
    element
        .attributes()
        .flatten()
        .any(|a| a.key.local_name().as_ref() == b"type" && a.value.as_ref() == b"page")
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix("#x").map_or_else(
                || name.strip_prefix('#').and_then(|d| d.parse().ok()),
                |hex| u32::from_str_radix(hex, 16).ok(),
            )?;
            char::from_u32(code)
        }
    }
}

fn pages_from_xml(xml: &[u8], max_pages: usize) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut collector = PageCollector::new(max_pages);
    let mut buf = Vec::with_capacity(1024);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => collector.start(&e),
            Ok(Event::Empty(e)) => collector.inline(&e),
            Ok(Event::Text(e)) if collector.in_text => {
                let text = std::str::from_utf8(e.as_ref()).map_err(|e| e.to_string())?;
                collector.push_text(text);
            }
            Ok(Event::GeneralRef(e)) if collector.in_text => {
                let name = std::str::from_utf8(e.as_ref()).map_err(|e| e.to_string())?;
                if let Some(c) = resolve_entity(name) {
                    collector.push_text(c.encode_utf8(&mut [0; 4]));
                }
            }
            Ok(Event::End(e)) => {
                collector.end(e.local_name().as_ref());
                if collector.full() {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed {DOCUMENT_PART}: {e}")),
            _ => {}
        }
    }

    Ok(collector.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>")
    }

    fn page_break() -> String {
        "<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>".to_string()
    }

    fn body(parts: &[String]) -> String {
        format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?><w:document {NS}><w:body>{}</w:body></w:document>", parts.concat())
    }

    fn write_docx(path: &Path, xml: &str) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_pages_split_on_explicit_breaks() {
        let xml = body(&[
            para("估价报告"),
            para("报告编号：HB-2024-001"),
            page_break(),
            para("致估价委托人函"),
            page_break(),
            para("第三页"),
        ]);
        let pages = pages_from_xml(xml.as_bytes(), 10).unwrap();
        assert_eq!(pages, vec!["估价报告\n报告编号：HB-2024-001", "致估价委托人函", "第三页"]);
    }

    #[test]
    fn test_page_limit() {
        let xml = body(&[para("一"), page_break(), para("二"), page_break(), para("三")]);
        assert_eq!(pages_from_xml(xml.as_bytes(), 2).unwrap(), vec!["一", "二"]);
    }

    #[test]
    fn test_tables_and_entities() {
        let table = "<w:tbl>\
            <w:tr><w:tc>".to_string()
            + &para("产权人")
            + "</w:tc><w:tc>"
            + &para("总价")
            + "</w:tc></w:tr>\
            <w:tr><w:tc>"
            + &para("李四")
            + "</w:tc><w:tc></w:tc><w:tc>"
            + &para("320万元")
            + "</w:tc></w:tr></w:tbl>";
        let xml = body(&[para("A &amp; B&#x3000;公司"), table]);
        let pages = pages_from_xml(xml.as_bytes(), 10).unwrap();
        assert_eq!(pages, vec!["A & B\u{3000}公司\n产权人 | 总价\n李四 | 320万元"]);
    }

    #[test]
    fn test_read_docx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        write_docx(&path, &body(&[para("第一页"), page_break(), para("第二页")]));

        assert_eq!(read_docx_text(&path, 10).unwrap(), "第一页\n\n第二页");
        assert_eq!(read_docx_pages(&path, 1).unwrap(), vec!["第一页"]);
    }

    #[test]
    fn test_not_a_docx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.docx");
        std::fs::write(&path, "not a zip").unwrap();
        assert!(matches!(
            read_docx_pages(&path, 10),
            Err(ConfigurationError::Unreadable { .. })
        ));
    }
}
