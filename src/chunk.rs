//! Recursive character splitter.
//!
//! Text is cut at the coarsest separator that brings pieces under the chunk
//! size, then pieces are merged back into windows of at most `chunk_size`
//! characters, each carrying up to `overlap` characters of the previous one.

use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const SEPARATORS: [&str; 5] = ["\n\n", "\n", ".", "!", "?"];

/// Split text into overlapping windows measured in characters.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size.saturating_sub(1));

    let pieces = split_recursive(text, &SEPARATORS, chunk_size);
    merge_pieces(&pieces, chunk_size, overlap)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive<'a>(text: &'a str, separators: &[&str], chunk_size: usize) -> Vec<&'a str> {
    if char_len(text) <= chunk_size {
        return vec![text];
    }

    match separators.split_first() {
        Some((sep, rest)) => text
            .split_inclusive(*sep)
            .flat_map(|piece| split_recursive(piece, rest, chunk_size))
            .collect(),
        None => text
            .split_inclusive(char::is_whitespace)
            .flat_map(|word| hard_split(word, chunk_size))
            .collect(),
    }
}

/// Cut a single oversized word at character boundaries.
fn hard_split(word: &str, chunk_size: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = word;
    while char_len(rest) > chunk_size {
        let at = rest
            .char_indices()
            .nth(chunk_size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(at);
        out.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

fn merge_pieces(pieces: &[&str], chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut len = 0;

    for &piece in pieces {
        let piece_len = char_len(piece);

        if len + piece_len > chunk_size && !window.is_empty() {
            push_window(&mut chunks, &window);
            while len > overlap || (len > 0 && len + piece_len > chunk_size) {
                match window.pop_front() {
                    Some((_, n)) => len -= n,
                    None => break,
                }
            }
        }

        window.push_back((piece, piece_len));
        len += piece_len;
    }

    if !window.is_empty() {
        push_window(&mut chunks, &window);
    }

    chunks
}

fn push_window(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let text: String = window.iter().map(|(p, _)| *p).collect();
    let text = text.trim();
    if !text.is_empty() {
        chunks.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(n: usize) -> String {
        (0..n)
            .map(|i| format!("Sentence number {i:03} talks about the video topic."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("Hello, world!", 1000, 200);
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(split_text("", 1000, 200).is_empty());
        assert!(split_text("   \n\n ", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = sentences(100);
        let chunks = split_text(&text, 1000, 200);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 1000, "chunk too long: {}", char_len(chunk));
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = sentences(100);
        let chunks = split_text(&text, 1000, 200);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(40).collect::<Vec<_>>().into_iter().rev().collect();
            assert!(pair[1].contains(tail.trim()), "no overlap between chunks");
        }
    }

    #[test]
    fn test_all_text_covered() {
        let text = sentences(60);
        let chunks = split_text(&text, 500, 100);
        for i in 0..60 {
            let needle = format!("number {i:03}");
            assert!(chunks.iter().any(|c| c.contains(&needle)), "lost {needle}");
        }
    }

    #[test]
    fn test_text_without_separators_splits_on_whitespace() {
        let text = vec!["word"; 600].join(" ");
        let chunks = split_text(&text, 1000, 150);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| char_len(c) <= 1000));
        assert!(chunks.iter().all(|c| c.split(' ').all(|w| w == "word")));
    }

    #[test]
    fn test_oversized_word_hard_split() {
        let text = "x".repeat(2500);
        let chunks = split_text(&text, 1000, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(char_len(&chunks[2]), 500);
    }

    #[test]
    fn test_multibyte_characters() {
        let text = "नमस्ते दुनिया। ".repeat(200);
        let chunks = split_text(&text, 300, 50);
        assert!(chunks.iter().all(|c| char_len(c) <= 300));
    }
}
