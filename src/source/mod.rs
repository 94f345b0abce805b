use serde::Deserialize;
use std::ops::Range;

/// A byte range into the text of a code fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Span {
    /// Byte offset of the first character of the node.
    pub start: u32,
    /// Length of the node in bytes; zero when the node has no source text.
    pub length: u32,
}

impl Span {
    pub const EMPTY: Span = Span {
        start: 0,
        length: 0,
    };

    pub fn new(start: usize, length: usize) -> Self {
        Self {
            start: start as u32,
            length: length as u32,
        }
    }

    pub fn range(&self) -> Range<usize> {
        let start = self.start as usize;
        start..start + self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Slices `text` if the span lies inside it.
    pub fn slice<'src>(&self, text: &'src str) -> Option<&'src str> {
        if self.is_empty() {
            return None;
        }
        text.get(self.range())
    }
}

/// Maps byte offsets of a fragment's text to one-based line numbers.
#[derive(Debug, Clone)]
pub struct LineBreaks {
    /// Offset at which each line starts.
    line_starts: Vec<u32>,
}

impl LineBreaks {
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                text.bytes()
                    .enumerate()
                    .filter(|(_, byte)| *byte == b'\n')
                    .map(|(offset, _)| offset as u32 + 1),
            )
            .collect();
        Self { line_starts }
    }

    pub fn get_line(&self, offset: u32) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line as u32 + 1,
            Err(next) => next as u32,
        }
    }

    pub fn get_line_from_span(&self, span: Span) -> u32 {
        self.get_line(span.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_based() {
        let breaks = LineBreaks::new("int x = 1;\nx++;\n");
        assert_eq!(breaks.get_line(0), 1);
        assert_eq!(breaks.get_line(10), 1);
        assert_eq!(breaks.get_line(11), 2);
        assert_eq!(breaks.get_line(15), 2);
    }

    #[test]
    fn empty_span_does_not_slice() {
        assert_eq!(Span::EMPTY.slice("abc"), None);
        assert_eq!(Span::new(1, 1).slice("abc"), Some("b"));
        assert_eq!(Span::new(2, 5).slice("abc"), None);
    }
}
