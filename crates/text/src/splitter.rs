//! Recursive character text splitter.
//!
//! Splits text into chunks of at most `chunk_size` characters, trying the
//! coarsest separator first (paragraphs, then lines, sentences, words) and
//! only drilling down to finer separators for pieces that are still too big.
//! The last resort is splitting between characters, which always fits.
//!
//! Separators stay attached to the piece they end, so with
//! `chunk_overlap == 0` the chunks concatenate back to the input exactly.
//! Lengths are counted in Unicode scalar values and cuts never fall inside a
//! UTF-8 code point.

use std::collections::VecDeque;
use std::ops::Range;

use quarry_core::error::SplitterError;

/// Separators tried in order, largest semantic unit first.
pub const DEFAULT_SEPARATORS: [&str; 7] = ["\n\n", "\n", ". ", "! ", "? ", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of trailing context repeated at the start of the next chunk.
    pub chunk_overlap: usize,
}

impl SplitterConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn validate(&self) -> Result<(), SplitterError> {
        if self.chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        Ok(())
    }
}

/// A contiguous byte range of the input plus its length in characters.
#[derive(Debug, Clone)]
struct Piece {
    span: Range<usize>,
    chars: usize,
}

impl Piece {
    fn new(text: &str, span: Range<usize>) -> Self {
        let chars = text[span.clone()].chars().count();
        Self { span, chars }
    }
}

#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    config: SplitterConfig,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self, SplitterError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Splitter without overlap. A `chunk_size` of zero is raised to one.
    pub fn without_overlap(chunk_size: usize) -> Self {
        Self::with_config(SplitterConfig::new(chunk_size.max(1), 0))
    }

    fn with_config(config: SplitterConfig) -> Self {
        Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the separator priority list.
    ///
    /// Character-level splitting is still used once the list is exhausted.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    /// Split `text` into ordered chunks borrowed from it.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.chunks(text).collect()
    }

    /// Lazily iterate over the chunks of `text`.
    ///
    /// Only the spans needed for the next chunk are split, so taking the
    /// first chunk of a long text never visits its tail at finer
    /// separators. Calling again restarts from the top.
    pub fn chunks<'s, 'a>(&'s self, text: &'a str) -> Chunks<'s, 'a> {
        let mut chunks = Chunks {
            text,
            config: self.config,
            frames: Vec::new(),
            ready: VecDeque::new(),
        };
        if !text.is_empty() {
            chunks.push_frame(0..text.len(), &self.separators);
        }
        chunks
    }
}

/// One level of the recursive split: the pieces of a span cut at a single
/// separator, plus the greedy merge window over them.
struct Frame<'s> {
    pieces: std::vec::IntoIter<Piece>,
    finer: &'s [String],
    window: VecDeque<Piece>,
    total: usize,
}

/// Lazy chunk iterator returned by [`RecursiveTextSplitter::chunks`].
pub struct Chunks<'s, 'a> {
    text: &'a str,
    config: SplitterConfig,
    frames: Vec<Frame<'s>>,
    ready: VecDeque<Range<usize>>,
}

impl<'s, 'a> Chunks<'s, 'a> {
    fn push_frame(&mut self, span: Range<usize>, separators: &'s [String]) {
        let slice = &self.text[span.clone()];

        let (index, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_empty() || slice.contains(s.as_str()))
            .map(|(i, s)| (i, s.as_str()))
            .unwrap_or((separators.len(), ""));

        self.frames.push(Frame {
            pieces: split_pieces(self.text, span, separator).into_iter(),
            finer: separators.get(index + 1..).unwrap_or(&[]),
            window: VecDeque::new(),
            total: 0,
        });
    }

    /// Greedily add `piece` to the frame's window, emitting the window as a
    /// chunk when it would overflow and keeping up to `chunk_overlap`
    /// characters of its tail.
    fn feed(
        frame: &mut Frame<'s>,
        piece: Piece,
        config: SplitterConfig,
        out: &mut VecDeque<Range<usize>>,
    ) {
        if frame.total + piece.chars > config.chunk_size {
            if let (Some(first), Some(last)) = (frame.window.front(), frame.window.back()) {
                out.push_back(first.span.start..last.span.end);
            }
            while frame.total > config.chunk_overlap
                || (frame.total > 0 && frame.total + piece.chars > config.chunk_size)
            {
                match frame.window.pop_front() {
                    Some(dropped) => frame.total -= dropped.chars,
                    None => break,
                }
            }
        }
        frame.total += piece.chars;
        frame.window.push_back(piece);
    }

    fn flush(frame: &mut Frame<'s>, out: &mut VecDeque<Range<usize>>) {
        if let (Some(first), Some(last)) = (frame.window.front(), frame.window.back()) {
            out.push_back(first.span.start..last.span.end);
        }
        frame.window.clear();
        frame.total = 0;
    }
}

impl<'a> Iterator for Chunks<'_, 'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            if let Some(span) = self.ready.pop_front() {
                return Some(&self.text[span]);
            }

            let config = self.config;
            let frame = self.frames.last_mut()?;

            match frame.pieces.next() {
                Some(piece) if piece.chars <= config.chunk_size => {
                    Self::feed(frame, piece, config, &mut self.ready);
                }
                Some(piece) => {
                    Self::flush(frame, &mut self.ready);
                    // Only non-empty separators can produce an oversized
                    // piece, so `finer` is strictly shorter here.
                    let finer = frame.finer;
                    self.push_frame(piece.span, finer);
                }
                None => {
                    Self::flush(frame, &mut self.ready);
                    self.frames.pop();
                }
            }
        }
    }
}

/// Cut `span` of `text` after every occurrence of `separator`, or between
/// characters when the separator is empty. Never yields empty pieces.
fn split_pieces(text: &str, span: Range<usize>, separator: &str) -> Vec<Piece> {
    let offset = span.start;
    let slice = &text[span];

    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(i, c)| Piece {
                span: offset + i..offset + i + c.len_utf8(),
                chars: 1,
            })
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (i, matched) in slice.match_indices(separator) {
        let end = i + matched.len();
        pieces.push(Piece::new(text, offset + last..offset + end));
        last = end;
    }
    if last < slice.len() {
        pieces.push(Piece::new(text, offset + last..offset + slice.len()));
    }
    pieces
}
