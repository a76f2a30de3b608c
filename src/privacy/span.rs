//! Character-offset bookkeeping
//!
//! Spans exchanged between the recognizer, detector and anonymizer are
//! counted in Unicode scalar values, not bytes, so that offsets reported to
//! callers line up with what they see in the source text. `CharIndex` maps
//! those offsets back to byte positions for slicing.

/// Byte positions of every character boundary in a text
pub struct CharIndex<'a> {
    text: &'a str,
    /// `boundaries[i]` is the byte offset of character `i`; the final entry
    /// is `text.len()`.
    boundaries: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    /// Index the character boundaries of `text`
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Number of characters in the text
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Byte offset of character `offset`, clamped to the end of the text
    pub fn byte_offset(&self, offset: usize) -> usize {
        self.boundaries[offset.min(self.char_len())]
    }

    /// Character offset of a byte position that lies on a char boundary
    pub fn char_offset(&self, byte: usize) -> usize {
        match self.boundaries.binary_search(&byte) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Slice by character offsets, clamping both ends to the text
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end).max(start);
        &self.text[start..end]
    }

    /// Slice `[start - radius, end + radius]`, clamped to the text
    pub fn window(&self, start: usize, end: usize, radius: usize) -> &'a str {
        self.slice(start.saturating_sub(radius), end.saturating_add(radius))
    }
}
