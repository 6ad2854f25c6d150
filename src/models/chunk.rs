use serde::{Deserialize, Serialize};

/// Fixed metadata attached to every stored chunk.
///
/// Chapter and subsection tags are opaque identifiers supplied by the
/// external chapter metadata service; the core only stores and filters
/// on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub page: Option<u32>,
    pub chunk_index: u32,
    pub document_hash: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub subsection: Option<String>,
}

/// A contiguous slice of document text, the unit of embedding and retrieval.
/// Immutable once created; `span` is the byte range into the parsed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub span: (usize, usize),
    pub metadata: ChunkMetadata,
}

/// A single retrieval hit. Transient; produced per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub content: String,
    pub page: Option<u32>,
    pub chunk_index: u32,
    pub score: f64,
    pub rank: usize,
}

/// A reference back to the source chunk/page that supported an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub page: Option<u32>,
    pub chunk_index: u32,
    pub excerpt: String,
    pub score: f64,
}

const EXCERPT_CHARS: usize = 80;

impl Citation {
    pub fn from_result(result: &RetrievalResult) -> Self {
        Self {
            page: result.page,
            chunk_index: result.chunk_index,
            excerpt: excerpt(&result.content),
            score: result.score,
        }
    }

    /// Display form, e.g. `page 12: "Newton's second law states..."`.
    pub fn display(&self) -> String {
        match self.page {
            Some(page) => format!("page {}: \"{}\"", page, self.excerpt),
            None => format!("\"{}\"", self.excerpt),
        }
    }
}

fn excerpt(content: &str) -> String {
    let trimmed = content.trim().replace(['\n', '\r'], " ");
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed;
    }
    let cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(content: &str, page: Option<u32>) -> RetrievalResult {
        RetrievalResult {
            content: content.to_string(),
            page,
            chunk_index: 3,
            score: 0.91,
            rank: 0,
        }
    }

    #[test]
    fn test_citation_display_with_page() {
        let c = Citation::from_result(&result("Newton's second law.", Some(12)));
        assert_eq!(c.display(), "page 12: \"Newton's second law.\"");
    }

    #[test]
    fn test_citation_display_without_page() {
        let c = Citation::from_result(&result("Plain text source.", None));
        assert_eq!(c.display(), "\"Plain text source.\"");
    }

    #[test]
    fn test_excerpt_truncates_long_content() {
        let long = "x".repeat(500);
        let c = Citation::from_result(&result(&long, Some(1)));
        assert!(c.excerpt.chars().count() <= EXCERPT_CHARS + 1);
        assert!(c.excerpt.ends_with('…'));
    }

    #[test]
    fn test_excerpt_flattens_newlines() {
        let c = Citation::from_result(&result("line one\nline two", Some(1)));
        assert_eq!(c.excerpt, "line one line two");
    }
}
