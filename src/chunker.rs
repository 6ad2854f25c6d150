use crate::errors::PipelineError;

/// Byte range of one chunk within the parsed document text.
///
/// Chunks are exact substrings of the input: chunk *i+1* starts `overlap`
/// bytes before the end of chunk *i*, so stripping the overlap prefix from
/// every chunk after the first reconstructs the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

impl ChunkSpan {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Break preference inside the size window, strongest first. The sentence
/// separators match the splitter configuration of the original document
/// processor (Latin and CJK sentence ends).
const SENTENCE_BREAKS: [&str; 5] = [". ", "。", "！", "？", "；"];

/// Split `text` into overlapping spans of at most `chunk_size` bytes.
///
/// Splits on paragraph, newline, sentence, then space boundaries where one
/// exists inside the window; falls back to a hard cut. `overlap` must be
/// strictly less than `chunk_size` or splitting could never terminate.
/// Empty or whitespace-only input yields zero spans, not an error.
pub fn chunk_spans(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<ChunkSpan>, PipelineError> {
    if chunk_size == 0 {
        return Err(PipelineError::Config(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::Config(format!(
            "chunk_overlap ({overlap}) must be strictly less than chunk_size ({chunk_size})"
        )));
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    if text.len() <= chunk_size {
        return Ok(vec![ChunkSpan {
            start: 0,
            end: text.len(),
        }]);
    }

    let mut spans = Vec::new();
    let mut start = 0usize;

    loop {
        if text.len() - start <= chunk_size {
            spans.push(ChunkSpan {
                start,
                end: text.len(),
            });
            break;
        }

        // Largest char boundary within the size window.
        let mut window_end = start + chunk_size;
        while !text.is_char_boundary(window_end) {
            window_end -= 1;
        }
        // Smallest char boundary past the overlap region; ending before it
        // would stall the next start position.
        let mut min_end = start + overlap + 1;
        while min_end < text.len() && !text.is_char_boundary(min_end) {
            min_end += 1;
        }
        if window_end < min_end {
            window_end = min_end;
        }

        let end = break_before(text, start, min_end, window_end).min(text.len());
        spans.push(ChunkSpan { start, end });
        if end >= text.len() {
            break;
        }

        let mut next = end - overlap;
        while !text.is_char_boundary(next) {
            next += 1;
        }
        debug_assert!(next > start);
        start = next;
    }

    Ok(spans)
}

/// Pick the strongest semantic break in `(min_end..=window_end]`, preferring
/// the rightmost occurrence of each separator class. Hard cut at the window
/// edge when nothing qualifies.
fn break_before(text: &str, start: usize, min_end: usize, window_end: usize) -> usize {
    let window = &text[start..window_end];

    if let Some(idx) = window.rfind("\n\n") {
        let end = start + idx + 2;
        if end >= min_end {
            return end;
        }
    }
    if let Some(idx) = window.rfind('\n') {
        let end = start + idx + 1;
        if end >= min_end {
            return end;
        }
    }

    let mut best: Option<usize> = None;
    for sep in SENTENCE_BREAKS {
        if let Some(idx) = window.rfind(sep) {
            let end = start + idx + sep.len();
            if end >= min_end && end <= window_end {
                best = Some(best.map_or(end, |b| b.max(end)));
            }
        }
    }
    if let Some(end) = best {
        return end;
    }

    if let Some(idx) = window.rfind(' ') {
        let end = start + idx + 1;
        if end >= min_end {
            return end;
        }
    }

    window_end
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip each chunk's overlap prefix and concatenate; must reproduce
    /// the original text byte for byte.
    fn reconstruct(text: &str, spans: &[ChunkSpan]) -> String {
        let mut out = String::new();
        let mut prev_end = 0usize;
        for (i, span) in spans.iter().enumerate() {
            let chunk = span.slice(text);
            if i == 0 {
                out.push_str(chunk);
            } else {
                let overlap = prev_end - span.start;
                out.push_str(&chunk[overlap..]);
            }
            prev_end = span.end;
        }
        out
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_spans("", 1000, 200).unwrap().is_empty());
        assert!(chunk_spans("   \n\t  ", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_small_text_single_chunk_unchanged() {
        let text = "a".repeat(50);
        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].slice(&text), text);
    }

    #[test]
    fn test_overlap_must_be_less_than_chunk_size() {
        assert!(matches!(
            chunk_spans("some text", 100, 100),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            chunk_spans("some text", 100, 250),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            chunk_spans("some text", 0, 0),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_round_trip_ascii() {
        let text = (0..40)
            .map(|i| format!("Sentence number {i} carries a little payload. "))
            .collect::<String>();
        for (size, overlap) in [(200, 0), (200, 50), (120, 30), (97, 13)] {
            let spans = chunk_spans(&text, size, overlap).unwrap();
            assert!(spans.len() > 1);
            assert_eq!(reconstruct(&text, &spans), text, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_round_trip_cjk() {
        let text = "牛顿第二定律指出，物体加速度与所受合外力成正比。".repeat(30);
        for (size, overlap) in [(300, 60), (128, 31)] {
            let spans = chunk_spans(&text, size, overlap).unwrap();
            assert!(spans.len() > 1);
            assert_eq!(reconstruct(&text, &spans), text, "size={size} overlap={overlap}");
            for span in &spans {
                assert!(text.is_char_boundary(span.start));
                assert!(text.is_char_boundary(span.end));
            }
        }
    }

    #[test]
    fn test_spans_are_ordered_and_overlapping() {
        let text = "word ".repeat(500);
        let spans = chunk_spans(&text, 200, 40).unwrap();
        for pair in spans.windows(2) {
            assert!(pair[1].start < pair[0].end);
            assert!(pair[1].start > pair[0].start);
            assert_eq!(pair[0].end - pair[1].start, 40);
        }
        for span in &spans {
            assert!(span.len() <= 200);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(100), "b".repeat(100));
        let spans = chunk_spans(&text, 150, 10).unwrap();
        // First chunk ends right after the blank line, not at the hard limit.
        assert_eq!(spans[0].end, 102);
        assert!(spans[0].slice(&text).ends_with("\n\n"));
    }

    #[test]
    fn test_prefers_sentence_boundary_over_hard_cut() {
        let text = format!("{}. {}", "a".repeat(80), "b".repeat(100));
        let spans = chunk_spans(&text, 120, 20).unwrap();
        assert_eq!(spans[0].end, 82);
        assert!(spans[0].slice(&text).ends_with(". "));
    }

    #[test]
    fn test_hard_cut_when_no_boundary() {
        let text = "x".repeat(1000);
        let spans = chunk_spans(&text, 300, 50).unwrap();
        assert!(spans.len() > 1);
        assert_eq!(spans[0].end, 300);
        assert_eq!(reconstruct(&text, &spans), text);
    }
}
