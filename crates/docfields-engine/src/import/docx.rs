//! Minimal WordprocessingML to HTML conversion.
//!
//! Reads `word/document.xml` out of the archive and walks its tags in a
//! single pass. Paragraphs become `<p>` or headings, run formatting becomes
//! `<strong>`/`<em>`/`<u>`, and line breaks become `<br />`. Anything else
//! (tables, drawings, unknown styles) is flattened to text and reported as a
//! warning.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::Regex;

use super::{Conversion, ConversionWarning, ConvertError, DocxConverter, WarningKind};

const DOCUMENT_PART: &str = "word/document.xml";

/// Prefix of the WordprocessingML namespace used by Word
const WORD_PREFIX: &str = "w";

fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| {
        Regex::new(r"<(/?)(?:([A-Za-z][\w.-]*):)?([A-Za-z][\w.-]*)([^>]*?)(/?)>")
            .expect("Invalid tag regex")
    })
}

fn val_regex() -> &'static Regex {
    static VAL_REGEX: OnceLock<Regex> = OnceLock::new();
    VAL_REGEX.get_or_init(|| Regex::new(r#"\bw:val="([^"]*)""#).expect("Invalid val regex"))
}

/// Converter for the common subset of DOCX formatting
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicDocxConverter;

impl BasicDocxConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert the raw `word/document.xml` part
    pub fn convert_document_xml(&self, xml: &str) -> Conversion {
        let mut walker = Walker::default();
        let mut last = 0;

        for captures in tag_regex().captures_iter(xml) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            walker.text(&xml[last..whole.start()]);
            last = whole.end();

            let prefix = captures.get(2).map_or("", |m| m.as_str());
            if prefix != WORD_PREFIX {
                continue;
            }
            let tag = Tag {
                closing: !captures[1].is_empty(),
                name: captures.get(3).map_or("", |m| m.as_str()),
                attrs: captures.get(4).map_or("", |m| m.as_str()),
                self_closing: !captures[5].is_empty(),
            };
            walker.tag(&tag);
        }

        walker.finish()
    }
}

impl DocxConverter for BasicDocxConverter {
    fn convert(&self, bytes: &[u8]) -> Result<Conversion, ConvertError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut part = match archive.by_name(DOCUMENT_PART) {
            Ok(part) => part,
            Err(zip::result::ZipError::FileNotFound) => return Err(ConvertError::MissingDocument),
            Err(e) => return Err(e.into()),
        };

        let mut xml = String::new();
        part.read_to_string(&mut xml)?;
        Ok(self.convert_document_xml(&xml))
    }
}

struct Tag<'a> {
    closing: bool,
    name: &'a str,
    attrs: &'a str,
    self_closing: bool,
}

impl Tag<'_> {
    fn val(&self) -> Option<&str> {
        val_regex()
            .captures(self.attrs)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Toggle properties like `<w:b/>` are on unless `w:val` says otherwise
    fn is_on(&self) -> bool {
        !matches!(self.val(), Some("false" | "0" | "off" | "none"))
    }
}

#[derive(Default, Clone, Copy)]
struct RunFormat {
    bold: bool,
    italic: bool,
    underline: bool,
}

/// Paragraph-level state, set aside while a nested paragraph is walked
#[derive(Default)]
struct Frame {
    paragraph: String,
    style: Option<String>,
    run: String,
    format: RunFormat,
    in_run: bool,
    in_text: bool,
    in_run_props: bool,
}

#[derive(Default)]
struct Walker {
    html: String,
    warnings: Vec<ConversionWarning>,
    paragraph: String,
    style: Option<String>,
    run: String,
    format: RunFormat,
    in_run: bool,
    in_text: bool,
    in_run_props: bool,
    /// Open `<w:p>` elements; text boxes nest paragraphs inside runs
    open_paragraphs: usize,
    outer: Vec<Frame>,
    seen_table: bool,
    seen_drawing: bool,
}

impl Walker {
    fn text(&mut self, raw: &str) {
        if !self.in_text || raw.is_empty() {
            return;
        }
        let decoded = html_escape::decode_html_entities(raw);
        self.run.push_str(&html_escape::encode_text(&decoded));
    }

    fn tag(&mut self, tag: &Tag<'_>) {
        match (tag.name, tag.closing) {
            ("p", false) if !tag.self_closing => self.begin_paragraph(),
            ("p", false) => {}
            ("p", true) => {
                self.end_paragraph();
                self.open_paragraphs = self.open_paragraphs.saturating_sub(1);
                if let Some(frame) = self.outer.pop() {
                    self.restore(frame);
                }
            }
            ("pStyle", false) => self.style = tag.val().map(str::to_string),
            ("r", false) if !tag.self_closing => {
                self.run.clear();
                self.format = RunFormat::default();
                self.in_run = true;
            }
            ("r", true) => {
                self.in_run = false;
                self.end_run();
            }
            ("rPr", false) => self.in_run_props = !tag.self_closing,
            ("rPr", true) => self.in_run_props = false,
            ("b", false) if self.in_run_props => self.format.bold = tag.is_on(),
            ("i", false) if self.in_run_props => self.format.italic = tag.is_on(),
            ("u", false) if self.in_run_props => self.format.underline = tag.is_on(),
            ("t", false) => self.in_text = !tag.self_closing,
            ("t", true) => self.in_text = false,
            ("br" | "cr", false) if self.in_run => self.run.push_str("<br />"),
            ("tab", false) if self.in_run && !self.in_run_props => self.run.push('\t'),
            ("tbl", false) if !self.seen_table => {
                self.seen_table = true;
                self.warn(
                    WarningKind::UnsupportedContent,
                    "Tables are not supported; cell text was kept as paragraphs".to_string(),
                );
            }
            ("drawing" | "pict", false) if !self.seen_drawing => {
                self.seen_drawing = true;
                self.warn(
                    WarningKind::UnsupportedContent,
                    "Images are not supported and were skipped".to_string(),
                );
            }
            _ => {}
        }
    }

    fn begin_paragraph(&mut self) {
        if self.open_paragraphs > 0 {
            let frame = Frame {
                paragraph: std::mem::take(&mut self.paragraph),
                style: self.style.take(),
                run: std::mem::take(&mut self.run),
                format: self.format,
                in_run: self.in_run,
                in_text: self.in_text,
                in_run_props: self.in_run_props,
            };
            self.outer.push(frame);
        }
        self.open_paragraphs += 1;
        self.paragraph.clear();
        self.style = None;
        self.run.clear();
        self.format = RunFormat::default();
        self.in_run = false;
        self.in_text = false;
        self.in_run_props = false;
    }

    fn restore(&mut self, frame: Frame) {
        self.paragraph = frame.paragraph;
        self.style = frame.style;
        self.run = frame.run;
        self.format = frame.format;
        self.in_run = frame.in_run;
        self.in_text = frame.in_text;
        self.in_run_props = frame.in_run_props;
    }

    fn end_run(&mut self) {
        if self.run.is_empty() {
            return;
        }
        let mut html = std::mem::take(&mut self.run);
        if self.format.underline {
            html = format!("<u>{html}</u>");
        }
        if self.format.italic {
            html = format!("<em>{html}</em>");
        }
        if self.format.bold {
            html = format!("<strong>{html}</strong>");
        }
        self.paragraph.push_str(&html);
    }

    fn end_paragraph(&mut self) {
        // Runs are normally closed already; this catches truncated markup
        self.end_run();
        if self.paragraph.is_empty() {
            return;
        }

        let style = self.style.take();
        let element = match style.as_deref() {
            None | Some("Normal") | Some("ListParagraph") => "p".to_string(),
            Some("Title") => "h1".to_string(),
            Some(style) => match heading_level(style) {
                Some(level) => format!("h{level}"),
                None => {
                    self.warn(
                        WarningKind::UnrecognisedStyle,
                        format!("Unrecognised paragraph style: '{style}'"),
                    );
                    "p".to_string()
                }
            },
        };

        let content = std::mem::take(&mut self.paragraph);
        self.html.push_str(&format!("<{element}>{content}</{element}>"));
    }

    fn warn(&mut self, kind: WarningKind, message: String) {
        if !self.warnings.iter().any(|w| w.message == message) {
            self.warnings.push(ConversionWarning { kind, message });
        }
    }

    fn finish(mut self) -> Conversion {
        self.end_paragraph();
        Conversion {
            html: self.html,
            warnings: self.warnings,
        }
    }
}

/// `Heading1`..`Heading6` (case-insensitive, as Word and LibreOffice write them)
fn heading_level(style: &str) -> Option<u8> {
    let lower = style.to_ascii_lowercase();
    let level: u8 = lower.strip_prefix("heading")?.trim().parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::extract_field_names;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(DOCUMENT_PART, options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_headings_and_formatting() {
        let xml = document(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Invoice</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t xml:space="preserve">Dear </w:t></w:r>"#,
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t>{{customer.name}}</w:t></w:r>"#,
            r#"<w:r><w:t>,</w:t></w:r></w:p>"#,
        ));

        let conversion = BasicDocxConverter::new().convert_document_xml(&xml);

        insta::assert_snapshot!(
            conversion.html,
            @"<h1>Invoice</h1><p>Dear <strong>{{customer.name}}</strong>,</p>"
        );
        assert!(conversion.warnings.is_empty());
    }

    #[test]
    fn test_text_is_unescaped_then_html_escaped() {
        let xml = document(r#"<w:p><w:r><w:t>Fish &amp; Chips &lt;3</w:t></w:r></w:p>"#);

        let conversion = BasicDocxConverter::new().convert_document_xml(&xml);

        assert_eq!(conversion.html, "<p>Fish &amp; Chips &lt;3</p>");
    }

    #[test]
    fn test_disabled_toggle_and_italic_underline() {
        let xml = document(concat!(
            r#"<w:p><w:r><w:rPr><w:b w:val="false"/><w:i/><w:u w:val="single"/></w:rPr>"#,
            r#"<w:t>note</w:t><w:br/><w:t>next</w:t></w:r></w:p>"#,
        ));

        let conversion = BasicDocxConverter::new().convert_document_xml(&xml);

        assert_eq!(conversion.html, "<p><em><u>note<br />next</u></em></p>");
    }

    #[test]
    fn test_empty_paragraphs_are_skipped() {
        let xml = document(r#"<w:p/><w:p><w:pPr/></w:p><w:p><w:r><w:t>x</w:t></w:r></w:p>"#);

        let conversion = BasicDocxConverter::new().convert_document_xml(&xml);

        assert_eq!(conversion.html, "<p>x</p>");
    }

    #[test]
    fn test_unknown_style_and_tables_warn() {
        let xml = document(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Fancy"/></w:pPr><w:r><w:t>a</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Fancy"/></w:pPr><w:r><w:t>b</w:t></w:r></w:p>"#,
        ));

        let conversion = BasicDocxConverter::new().convert_document_xml(&xml);

        assert_eq!(conversion.html, "<p>a</p><p>cell</p><p>b</p>");
        let kinds: Vec<WarningKind> = conversion.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::UnrecognisedStyle, WarningKind::UnsupportedContent]
        );
    }

    #[test]
    fn test_text_box_paragraph_keeps_outer_text() {
        // Given a paragraph whose second run holds a text box
        let xml = document(concat!(
            r#"<w:p><w:r><w:t xml:space="preserve">Dear </w:t></w:r>"#,
            r#"<w:r><w:drawing><wps:txbx><w:txbxContent>"#,
            r#"<w:p><w:r><w:t>Boxed</w:t></w:r></w:p>"#,
            r#"</w:txbxContent></wps:txbx></w:drawing></w:r>"#,
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t>{{customer.name}}</w:t></w:r></w:p>"#,
        ));

        // When converted
        let conversion = BasicDocxConverter::new().convert_document_xml(&xml);

        // Then the text box becomes its own paragraph and the outer one survives
        assert_eq!(
            conversion.html,
            "<p>Boxed</p><p>Dear <strong>{{customer.name}}</strong></p>"
        );
        assert_eq!(conversion.warnings.len(), 1);
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(heading_level("Heading2"), Some(2));
        assert_eq!(heading_level("heading 6"), Some(6));
        assert_eq!(heading_level("Heading7"), None);
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn test_convert_archive() {
        let xml = document(
            r#"<w:p><w:r><w:t>Total: {{invoice.total}}</w:t></w:r></w:p>"#,
        );

        let conversion = BasicDocxConverter::new().convert(&docx_bytes(&xml)).unwrap();

        assert_eq!(conversion.html, "<p>Total: {{invoice.total}}</p>");
        assert_eq!(extract_field_names(&conversion.html), vec!["invoice.total"]);
    }

    #[test]
    fn test_convert_rejects_non_zip() {
        let result = BasicDocxConverter::new().convert(b"plain text");
        assert!(matches!(result, Err(ConvertError::Archive(_))));
    }

    #[test]
    fn test_convert_requires_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let result = BasicDocxConverter::new().convert(&bytes);

        assert!(matches!(result, Err(ConvertError::MissingDocument)));
    }
}
