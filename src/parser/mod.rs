use tracing::{debug, warn};

use crate::errors::PipelineError;

/// Source file formats the pipeline accepts. Anything else fails fast with
/// `UnsupportedFormat` before parsing, chunking, or embedding work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Txt,
}

impl SourceFormat {
    pub fn from_filename(filename: &str) -> Result<Self, PipelineError> {
        let ext = filename
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Txt),
            other => Err(PipelineError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
        }
    }
}

/// Start offset of a page's text within the joined document text.
#[derive(Debug, Clone, Copy)]
pub struct PageOffset {
    pub offset: usize,
    pub page: u32,
}

/// Plain text extracted from an uploaded document, with enough page
/// bookkeeping to attribute a chunk back to its source page.
#[derive(Debug)]
pub struct ParsedDocument {
    pub text: String,
    pub page_offsets: Vec<PageOffset>,
    pub page_count: u32,
}

impl ParsedDocument {
    /// Page containing the given byte offset, if the source is paginated.
    pub fn page_for_offset(&self, offset: usize) -> Option<u32> {
        let idx = self.page_offsets.partition_point(|p| p.offset <= offset);
        idx.checked_sub(1).map(|i| self.page_offsets[i].page)
    }
}

/// Parse raw bytes into plain text according to the declared format.
pub fn parse(bytes: &[u8], format: SourceFormat) -> Result<ParsedDocument, PipelineError> {
    match format {
        SourceFormat::Pdf => parse_pdf(bytes),
        SourceFormat::Txt => parse_txt(bytes),
    }
}

fn parse_txt(bytes: &[u8]) -> Result<ParsedDocument, PipelineError> {
    let text = String::from_utf8_lossy(bytes).into_owned();
    Ok(ParsedDocument {
        text,
        page_offsets: Vec::new(),
        page_count: 0,
    })
}

/// Page-wise PDF text extraction. Problem pages are skipped rather than
/// aborting the whole document; a document where every page is empty is
/// reported upstream as `EmptyDocument` once chunking yields nothing.
fn parse_pdf(bytes: &[u8]) -> Result<ParsedDocument, PipelineError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| PipelineError::Parse(format!("failed to load PDF: {e}")))?;

    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    let mut text = String::new();
    let mut page_offsets = Vec::new();
    let mut skipped = 0u32;

    for page_no in pages.keys() {
        let page_text = match doc.extract_text(&[*page_no]) {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping page {page_no}: {e}");
                skipped += 1;
                continue;
            }
        };
        if page_text.trim().is_empty() {
            skipped += 1;
            continue;
        }
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        page_offsets.push(PageOffset {
            offset: text.len(),
            page: *page_no,
        });
        text.push_str(page_text.trim_end());
    }

    if page_count > 0 && skipped > page_count / 2 {
        // Likely a scanned PDF; text extraction cannot help without OCR.
        warn!("{skipped}/{page_count} pages yielded no text; document may be scanned");
    }
    debug!(
        "Extracted text from {}/{page_count} pages",
        page_offsets.len()
    );

    Ok(ParsedDocument {
        text,
        page_offsets,
        page_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(
            SourceFormat::from_filename("notes.txt").unwrap(),
            SourceFormat::Txt
        );
        assert_eq!(
            SourceFormat::from_filename("Book.PDF").unwrap(),
            SourceFormat::Pdf
        );
        assert!(matches!(
            SourceFormat::from_filename("slides.docx"),
            Err(PipelineError::UnsupportedFormat(ext)) if ext == "docx"
        ));
        assert!(matches!(
            SourceFormat::from_filename("noextension"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_txt() {
        let parsed = parse(b"hello world", SourceFormat::Txt).unwrap();
        assert_eq!(parsed.text, "hello world");
        assert_eq!(parsed.page_count, 0);
        assert_eq!(parsed.page_for_offset(3), None);
    }

    #[test]
    fn test_parse_pdf_rejects_garbage() {
        assert!(matches!(
            parse(b"not a pdf at all", SourceFormat::Pdf),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_page_for_offset() {
        let parsed = ParsedDocument {
            text: "page one text\n\npage two text".to_string(),
            page_offsets: vec![
                PageOffset { offset: 0, page: 1 },
                PageOffset { offset: 15, page: 2 },
            ],
            page_count: 2,
        };
        assert_eq!(parsed.page_for_offset(0), Some(1));
        assert_eq!(parsed.page_for_offset(14), Some(1));
        assert_eq!(parsed.page_for_offset(15), Some(2));
        assert_eq!(parsed.page_for_offset(27), Some(2));
    }
}
