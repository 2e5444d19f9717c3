//! Paragraph-preserving text chunker.

use once_cell::sync::Lazy;
use regex::Regex;

/// Per-request character ceiling, leaving room for prompt overhead inside
/// the provider's context window.
pub const MAX_CHARS: usize = 12_000;

/// Separator placed between paragraphs packed into one chunk.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{2,}").expect("static regex compile"));

/// Length in characters, the unit every ceiling in this crate is measured in.
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split on runs of two or more newlines, in order.
#[must_use]
pub fn paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK_RE.split(text).collect()
}

/// Partition `text` into ordered chunks of at most `max_chars` characters.
///
/// Paragraphs are packed greedily and never split; a paragraph longer than
/// `max_chars` becomes a chunk of its own.
#[must_use]
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let separator_len = char_len(PARAGRAPH_SEPARATOR);
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0;

    for paragraph in paragraphs(text) {
        let paragraph_len = char_len(paragraph);

        if !buf.is_empty() && buf_len + separator_len + paragraph_len > max_chars {
            chunks.push(std::mem::take(&mut buf));
            buf_len = 0;
        }

        if !buf.is_empty() {
            buf.push_str(PARAGRAPH_SEPARATOR);
            buf_len += separator_len;
        }
        buf.push_str(paragraph);
        buf_len += paragraph_len;
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small deterministic generator so property checks need no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((self.0 >> 33) as usize) % bound
        }
    }

    fn random_document(rng: &mut Lcg, max_paragraph: usize) -> String {
        let count = 1 + rng.next(40);
        let mut paras = Vec::with_capacity(count);
        for i in 0..count {
            let len = 1 + rng.next(max_paragraph);
            let ch = if i % 3 == 0 { 'é' } else { 'x' };
            paras.push(std::iter::repeat_n(ch, len).collect::<String>());
        }
        let mut doc = String::new();
        for (i, p) in paras.iter().enumerate() {
            if i > 0 {
                doc.push_str(&"\n".repeat(2 + rng.next(3)));
            }
            doc.push_str(p);
        }
        doc
    }

    #[test]
    fn test_short_text_is_single_chunk_verbatim() {
        let text = "one\n\n\n\ntwo";
        assert_eq!(split(text, 100), vec![text.to_string()]);
        assert_eq!(split("", 100), vec![String::new()]);
    }

    #[test]
    fn test_packs_paragraphs_greedily() {
        let text = "aaaa\n\nbbbb\n\ncccc\n\ndddd";
        // "aaaa\n\nbbbb" is 10 chars, adding "\n\ncccc" would make 16.
        assert_eq!(split(text, 12), vec!["aaaa\n\nbbbb", "cccc\n\ndddd"]);
    }

    #[test]
    fn test_separator_counts_toward_ceiling() {
        let text = "aaaaa\n\nbbbbb\n\nc";
        // 5 + 2 + 5 = 12 > 11, so the first two paragraphs cannot share a chunk.
        let chunks = split(text, 11);
        assert_eq!(chunks, vec!["aaaaa", "bbbbb\n\nc"]);
        assert!(chunks.iter().all(|c| char_len(c) <= 11));
    }

    #[test]
    fn test_oversized_paragraph_is_its_own_chunk() {
        let big = "y".repeat(30);
        let text = format!("small\n\n{big}\n\ntail");
        let chunks = split(&text, 10);
        assert_eq!(chunks, vec!["small".to_string(), big, "tail".to_string()]);
    }

    #[test]
    fn test_leading_oversized_paragraph_emits_no_empty_chunk() {
        let big = "z".repeat(25);
        let text = format!("{big}\n\nok");
        let chunks = split(&text, 10);
        assert_eq!(chunks, vec![big, "ok".to_string()]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = format!("{}\n\n{}", "é".repeat(6), "ü".repeat(6));
        // 14 characters but 26 bytes.
        assert_eq!(split(&text, 14).len(), 1);
        assert_eq!(split(&text, 13).len(), 2);
    }

    #[test]
    fn test_chunk_bound_holds_for_generated_documents() {
        let mut rng = Lcg(42);
        for _ in 0..200 {
            let max = 20 + rng.next(200);
            let doc = random_document(&mut rng, max + max / 2);
            let source: Vec<&str> = paragraphs(&doc);

            for chunk in split(&doc, max) {
                assert!(
                    char_len(&chunk) <= max || source.contains(&chunk.as_str()),
                    "chunk of {} chars exceeds {max} and is not a single paragraph",
                    char_len(&chunk)
                );
            }
        }
    }

    #[test]
    fn test_chunks_preserve_paragraph_order() {
        let mut rng = Lcg(7);
        for _ in 0..200 {
            let max = 20 + rng.next(200);
            let doc = random_document(&mut rng, max);
            let chunks = split(&doc, max);

            let rejoined = chunks.join(PARAGRAPH_SEPARATOR);
            assert_eq!(paragraphs(&rejoined), paragraphs(&doc));
        }
    }

    #[test]
    fn test_thirty_thousand_chars_make_three_chunks() {
        let paragraph = "w".repeat(1_000);
        let doc = vec![paragraph; 30].join(PARAGRAPH_SEPARATOR);
        assert!(char_len(&doc) > 30_000);

        let chunks = split(&doc, MAX_CHARS);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| char_len(c) <= MAX_CHARS));
    }
}
