//! Deterministic chunking of raw document text into overlapping,
//! provenance-tagged passages.
//!
//! The chunker infers structure from the text itself: pages come from
//! form-feed separators when the export carries them, otherwise from a
//! fixed characters-per-page estimate; sections come from heading-looking
//! lines. Every run over the same input yields the same chunks, and every
//! non-whitespace character of the input is covered by at least one chunk.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, RagError};

/// Splits `text` into ordered, overlapping chunks tagged with section titles
/// and page bounds.
///
/// Returns [`RagError::EmptyDocument`] when the input holds no visible text.
/// A document shorter than one window yields exactly one chunk.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, RagError> {
    if text.trim().is_empty() {
        return Err(RagError::EmptyDocument);
    }

    let page_starts = page_start_offsets(text, config.chars_per_page);
    let max_chunk_size = config.max_chunk_size.max(1);
    let step = max_chunk_size.saturating_sub(config.overlap_size).max(1);

    let mut chunks = Vec::new();
    for section in split_sections(text, &config.default_section) {
        let body = &text[section.start..section.end];
        if body.trim().is_empty() {
            continue;
        }

        let char_offsets: Vec<usize> = body.char_indices().map(|(offset, _)| offset).collect();
        let total_chars = char_offsets.len();
        let mut window_start = 0;
        loop {
            let window_end = (window_start + max_chunk_size).min(total_chars);
            let byte_start = char_offsets[window_start];
            let byte_end = if window_end == total_chars {
                body.len()
            } else {
                char_offsets[window_end]
            };

            let piece = &body[byte_start..byte_end];
            if !piece.trim().is_empty() {
                let first = section.start + byte_start;
                let last = (section.start + byte_end - 1).max(first);
                chunks.push(Chunk {
                    text: piece.to_string(),
                    section: section.title.clone(),
                    page_start: page_of(&page_starts, first),
                    page_end: page_of(&page_starts, last),
                });
            }

            if window_end == total_chars {
                break;
            }
            window_start += step;
        }
    }

    if chunks.is_empty() {
        return Err(RagError::EmptyDocument);
    }
    Ok(chunks)
}

struct SectionSpan {
    title: String,
    start: usize,
    end: usize,
}

/// Splits the document into heading-delimited spans. The heading line itself
/// belongs to the section it opens, so no character falls between sections.
fn split_sections(text: &str, default_section: &str) -> Vec<SectionSpan> {
    let mut sections: Vec<SectionSpan> = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if is_heading(line) {
            if let Some(open) = sections.last_mut() {
                open.end = offset;
            }
            let mut title = heading_title(line);
            if title.is_empty() {
                title = default_section.to_string();
            }
            sections.push(SectionSpan {
                title,
                start: offset,
                end: text.len(),
            });
        } else if sections.is_empty() {
            sections.push(SectionSpan {
                title: default_section.to_string(),
                start: 0,
                end: text.len(),
            });
        }
        offset += line.len();
    }

    sections.retain(|section| section.start < section.end);
    sections
}

fn numbered_heading() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+(\.\d+)*[.)]?\s+\S").expect("numbered heading pattern is valid")
    })
}

/// Heading heuristic tuned for plain-text document exports: markdown-style
/// `#` prefixes, numbered outline entries, and short title-case lines that
/// do not end like a sentence.
fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 80 {
        return false;
    }
    if trimmed.starts_with('#') {
        return true;
    }
    if numbered_heading().is_match(trimmed) {
        return true;
    }
    let ends_like_sentence = trimmed.ends_with(['.', '!', '?', ',', ';', ':']);
    !ends_like_sentence
        && trimmed.split_whitespace().count() <= 8
        && trimmed.chars().next().is_some_and(char::is_uppercase)
}

fn heading_title(line: &str) -> String {
    line.trim().trim_start_matches('#').trim().to_string()
}

/// Byte offsets at which each page begins. Page breaks take precedence;
/// without them pages are estimated from `chars_per_page`.
fn page_start_offsets(text: &str, chars_per_page: usize) -> Vec<usize> {
    if text.contains('\u{0C}') {
        let mut starts = vec![0];
        for (offset, ch) in text.char_indices() {
            if ch == '\u{0C}' {
                starts.push(offset + ch.len_utf8());
            }
        }
        return starts;
    }

    let chars_per_page = chars_per_page.max(1);
    text.char_indices()
        .map(|(offset, _)| offset)
        .step_by(chars_per_page)
        .collect()
}

fn page_of(page_starts: &[usize], byte_offset: usize) -> u32 {
    page_starts.partition_point(|start| *start <= byte_offset) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(max: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chunk_size: max,
            overlap_size: overlap,
            ..ChunkingConfig::default()
        }
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = chunk_text("   \n\t", &ChunkingConfig::default()).unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument));
    }

    #[test]
    fn short_document_yields_exactly_one_chunk() {
        let chunks = chunk_text("just a tiny note", &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "just a tiny note");
        assert_eq!(chunks[0].section, "Introduction");
        assert_eq!(chunks[0].page_start, 1);
        assert_eq!(chunks[0].page_end, 1);
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "Refund Policy\nrefunds are issued within thirty days of purchase. \
                    contact support with the order number.\nShipping\nitems ship \
                    within two business days from our warehouse.";
        let first = chunk_text(text, &config(40, 10)).unwrap();
        let second = chunk_text(text, &config(40, 10)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn headings_open_new_sections() {
        let text = "Refund Policy\nrefunds within thirty days.\nShipping\nships in two days.";
        let chunks = chunk_text(text, &ChunkingConfig::default()).unwrap();
        let sections: Vec<&str> = chunks.iter().map(|c| c.section.as_str()).collect();
        assert_eq!(sections, vec!["Refund Policy", "Shipping"]);
    }

    #[test]
    fn text_before_first_heading_uses_default_section() {
        let text = "some untitled preamble text here.\nDetails\nthe details follow.";
        let chunks = chunk_text(text, &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks[0].section, "Introduction");
        assert_eq!(chunks[1].section, "Details");
    }

    #[test]
    fn numbered_and_hash_headings_are_recognized() {
        assert!(is_heading("1. Getting Started\n"));
        assert!(is_heading("2.3 Deep Dive\n"));
        assert!(is_heading("## Appendix\n"));
        assert!(!is_heading("this sentence keeps going and ends properly.\n"));
        assert!(!is_heading("a lowercase fragment\n"));
    }

    #[test]
    fn overlap_duplicates_boundary_text() {
        let body = "abcdefghijklmnopqrstuvwxy";
        let chunks = chunk_text(body, &config(10, 4)).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "ghijklmnop");
        assert!(chunks[1].text.starts_with(&chunks[0].text[6..]));
        assert_eq!(chunks[3].text, "stuvwxy");
    }

    #[test]
    fn zero_window_size_is_clamped_instead_of_panicking() {
        let chunks = chunk_text("hello", &config(0, 0)).unwrap();
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, "hello");

        let chunks = chunk_text("hello", &config(0, 150)).unwrap();
        assert!(!chunks.is_empty());
    }

    #[test]
    fn bare_marker_headings_fall_back_to_the_default_section() {
        let text = "###\nbody text under a title-less marker.";
        let chunks = chunk_text(text, &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks[0].section, "Introduction");
        assert_eq!(chunks[0].citation(), "Introduction (pp. 1–1)");
    }

    #[test]
    fn form_feeds_define_page_bounds() {
        let text = "alpha body on page one\u{0C}beta body on page two";
        let chunks = chunk_text(
            text,
            &ChunkingConfig {
                max_chunk_size: 1000,
                ..ChunkingConfig::default()
            },
        )
        .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_start, 1);
        assert_eq!(chunks[0].page_end, 2);
    }

    #[test]
    fn estimated_pages_advance_with_offset() {
        let text = "a".repeat(120);
        let chunks = chunk_text(
            &text,
            &ChunkingConfig {
                max_chunk_size: 50,
                overlap_size: 0,
                chars_per_page: 40,
                ..ChunkingConfig::default()
            },
        )
        .unwrap();
        assert_eq!(chunks[0].page_start, 1);
        assert_eq!(chunks[0].page_end, 2);
        assert_eq!(chunks.last().unwrap().page_end, 3);
        for chunk in &chunks {
            assert!(chunk.page_start <= chunk.page_end);
        }
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "déjà vu ".repeat(60);
        let chunks = chunk_text(&text, &config(50, 10)).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }

    proptest! {
        // Lowercase alphabetic input never trips the heading heuristic, so
        // the whole document is one section and adjacent windows overlap by
        // exactly `overlap_size`; dropping the overlap from every window but
        // the first must rebuild the input.
        #[test]
        fn windows_cover_the_whole_document(body in "[a-z]( {0,3}[a-z]){0,300}") {
            let cfg = config(32, 8);
            let chunks = chunk_text(&body, &cfg).unwrap();
            let again = chunk_text(&body, &cfg).unwrap();
            prop_assert_eq!(&chunks, &again);

            let step = cfg.max_chunk_size - cfg.overlap_size;
            let mut rebuilt = chunks[0].text.clone();
            for chunk in &chunks[1..] {
                let overlap = chunk.text.len().min(cfg.max_chunk_size - step);
                rebuilt.push_str(&chunk.text[overlap..]);
            }
            prop_assert_eq!(rebuilt, body);
        }
    }
}
