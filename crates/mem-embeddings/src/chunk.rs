//! Chunker (C5): splits long content into overlapping windows.

/// One window of a chunked document. `vector_small` is attached once the
/// caller has embedded `text`; `generate_chunked` only produces the text
/// windows, leaving embedding generation to the caller per chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWindow {
    pub index: u32,
    pub total: u32,
    pub text: String,
}

/// Emit windows of length `chunk_size` advancing by `chunk_size - overlap`,
/// covering the entire input. For `text` no longer than `chunk_size`, emits
/// exactly one window.
#[must_use]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkWindow> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![ChunkWindow { index: 0, total: 1, text: text.to_string() }];
    }

    let stride = chunk_size.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect::<String>());
        if end == chars.len() {
            break;
        }
        start += stride;
    }

    let total = u32::try_from(windows.len()).unwrap_or(u32::MAX);
    windows
        .into_iter()
        .enumerate()
        .map(|(i, text)| ChunkWindow { index: u32::try_from(i).unwrap_or(u32::MAX), total, text })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_window() {
        let windows = chunk_text("hello", 1000, 200);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].total, 1);
        assert_eq!(windows[0].text, "hello");
    }

    #[test]
    fn long_text_produces_multiple_overlapping_windows() {
        let text = "x ".repeat(600); // 1200 chars
        let windows = chunk_text(&text, 1000, 200);
        assert!(windows.len() >= 2);
        let total = windows[0].total;
        for (i, w) in windows.iter().enumerate() {
            assert_eq!(w.index, u32::try_from(i).unwrap());
            assert_eq!(w.total, total);
        }
        assert_eq!(total as usize, windows.len());
    }

    #[test]
    fn windows_cover_the_entire_input() {
        let text = "abcdefghij".repeat(50); // 500 chars
        let windows = chunk_text(&text, 100, 20);
        let reconstructed_len: usize = windows.iter().map(|w| w.text.chars().count()).sum::<usize>();
        assert!(reconstructed_len >= text.chars().count());
        assert_eq!(windows.last().unwrap().text.chars().last(), text.chars().last());
    }

    #[test]
    fn zero_overlap_does_not_infinite_loop() {
        let text = "a".repeat(50);
        let windows = chunk_text(&text, 10, 10);
        assert!(!windows.is_empty());
    }
}
