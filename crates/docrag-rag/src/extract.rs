//! Text extraction, dispatched on file extension

use std::path::Path;
use std::sync::LazyLock;

use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use docrag_core::{Error, Result};

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));

/// Extraction strategy selected from a file extension.
///
/// The extension is authoritative; file contents are never sniffed to pick a
/// strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    Pdf,
    PlainText,
    /// Fallback for every other extension
    Generic,
}

/// Sub-formats understood by the generic extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenericFormat {
    Markdown,
    Html,
    Text,
}

impl ExtractorKind {
    /// Pick the strategy for a lower-cased extension (without the dot)
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "pdf" => ExtractorKind::Pdf,
            "txt" => ExtractorKind::PlainText,
            _ => ExtractorKind::Generic,
        }
    }

    /// Pick the strategy for a path
    pub fn for_path(path: &Path) -> Self {
        Self::from_extension(&extension_of(path))
    }

    /// Name recorded in chunk metadata
    pub fn name(&self) -> &'static str {
        match self {
            ExtractorKind::Pdf => "pdf",
            ExtractorKind::PlainText => "plain_text",
            ExtractorKind::Generic => "generic",
        }
    }

    /// Extract text from the raw bytes of `path`.
    ///
    /// PDF parsing is CPU-bound and runs on the blocking pool.
    pub async fn extract(&self, bytes: Vec<u8>, path: &Path) -> Result<String> {
        let raw = match self {
            ExtractorKind::Pdf => tokio::task::spawn_blocking(move || extract_pdf(&bytes))
                .await
                .map_err(|e| Error::Extraction(format!("PDF extraction task failed: {}", e)))??,
            ExtractorKind::PlainText => decode_utf8(bytes)?,
            ExtractorKind::Generic => extract_generic(bytes, generic_format(path))?,
        };

        Ok(normalize_whitespace(&raw))
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn generic_format(path: &Path) -> GenericFormat {
    match extension_of(path).as_str() {
        "md" | "markdown" => GenericFormat::Markdown,
        "html" | "htm" => GenericFormat::Html,
        _ => GenericFormat::Text,
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Extraction(format!("failed to read PDF: {}", e)))
}

fn decode_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| Error::Extraction("file is not valid UTF-8 text".to_string()))
}

fn extract_generic(bytes: Vec<u8>, format: GenericFormat) -> Result<String> {
    if bytes.contains(&0) {
        return Err(Error::Extraction(
            "unsupported file type: binary content".to_string(),
        ));
    }
    let text = decode_utf8(bytes)?;

    Ok(match format {
        GenericFormat::Markdown => markdown_to_text(&text),
        GenericFormat::Html => html_to_text(&text),
        GenericFormat::Text => text,
    })
}

fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::Item,
            ) => text.push_str("\n\n"),
            _ => {}
        }
    }

    text
}

fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut blocks = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript" | "template"))
        });
        let trimmed = text.trim();
        if !hidden && !trimmed.is_empty() {
            blocks.push(trimmed.to_string());
        }
    }

    blocks.join("\n")
}

/// Collapse runs of blank lines and trim the ends
fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    EXCESS_BLANK_LINES
        .replace_all(&unified, "\n\n")
        .trim()
        .to_string()
}
