//! Source adapters turn one fetched document into a lazy sequence of records.
//!
//! A document is parsed once with [`Document::parse`]; that is the only place a whole-document
//! failure is reported. Adapters then walk the parsed document and drop every row or line
//! they cannot read, so a single malformed unit never aborts a scan.

use itertools::Itertools;
use scraper::{ElementRef, Html};
use serde::Serialize;
use thiserror::Error;
use crate::ruleset::Ruleset;
use crate::util::normalize_ws;

pub mod html_schedule;
pub mod links;
pub mod pdf_schedule;
pub mod score_table;

pub use html_schedule::{HtmlFinalsAdapter, HtmlScheduleAdapter};
pub use pdf_schedule::{PdfFinalsAdapter, PdfScheduleAdapter};
pub use score_table::ScoreTableAdapter;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Pdf,
}
impl DocumentKind {
    pub fn detect(url: &str, data: &[u8]) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.to_lowercase().ends_with(".pdf") || data.starts_with(b"%PDF") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Html
        }
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("document is empty")]
    Empty,
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
    #[error("{adapter} cannot read a {kind:?} document")]
    KindMismatch { adapter: &'static str, kind: DocumentKind },
}

pub enum Document {
    Html(Html),
    Text(String),
}
impl Document {
    pub fn parse(kind: DocumentKind, data: &[u8]) -> Result<Self, DocumentError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(DocumentError::Empty)
        }
        match kind {
            DocumentKind::Html => Ok(Document::Html(Html::parse_document(&String::from_utf8_lossy(data)))),
            DocumentKind::Pdf => {
                // the extractor panics on some malformed files
                let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data))
                    .map_err(|_| DocumentError::Pdf("extractor panicked".to_string()))?
                    .map_err(|e| DocumentError::Pdf(e.to_string()))?;
                if text.trim().is_empty() {
                    return Err(DocumentError::Empty)
                }
                Ok(Document::Text(text))
            }
        }
    }
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Html(_) => DocumentKind::Html,
            Document::Text(_) => DocumentKind::Pdf,
        }
    }
    pub(crate) fn html(&self, adapter: &'static str) -> Result<&Html, DocumentError> {
        match self {
            Document::Html(html) => Ok(html),
            Document::Text(_) => Err(DocumentError::KindMismatch { adapter, kind: self.kind() }),
        }
    }
    pub(crate) fn text(&self, adapter: &'static str) -> Result<&str, DocumentError> {
        match self {
            Document::Text(text) => Ok(text),
            Document::Html(_) => Err(DocumentError::KindMismatch { adapter, kind: self.kind() }),
        }
    }
}

pub trait SourceAdapter {
    type Record;
    fn name(&self) -> &'static str;
    fn records<'d>(&'d self, doc: &'d Document) -> Result<Box<dyn Iterator<Item = Self::Record> + 'd>, DocumentError>;
}

/// Adapters compiled from one ruleset.
pub struct Adapters {
    pub html_schedule: HtmlScheduleAdapter,
    pub html_finals: HtmlFinalsAdapter,
    pub pdf_schedule: PdfScheduleAdapter,
    pub pdf_finals: PdfFinalsAdapter,
    pub score_table: ScoreTableAdapter,
}
impl Adapters {
    pub fn new(rules: &Ruleset) -> anyhow::Result<Self> {
        Ok(Self {
            html_schedule: HtmlScheduleAdapter::new(rules),
            html_finals: HtmlFinalsAdapter::new(rules),
            pdf_schedule: PdfScheduleAdapter::new(rules)?,
            pdf_finals: PdfFinalsAdapter::new(rules)?,
            score_table: ScoreTableAdapter::new(rules),
        })
    }
}

pub(crate) fn element_text(el: ElementRef) -> String {
    normalize_ws(&el.text().join(" "))
}

/// Direct `td`/`th` children of a table row.
pub(crate) fn row_cells(row: ElementRef) -> Vec<ElementRef> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

pub(crate) fn has_class(el: ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c.eq_ignore_ascii_case(class))
}
