//! Heading-aware chunking for large documents

use crate::config::ChunkConfig;
use crate::structure;
use lectern_domain::{Chunk, ContentBlock};

/// Splits parsed documents into chunks sized to a token target
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    /// Create a new text chunker
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Parse and chunk a whole document
    ///
    /// Documents without headings are split by size alone. A heading chunk
    /// more than twice the target is sub-split, and the pieces keep the
    /// chunk's heading path.
    pub fn chunk_document(&self, text: &str) -> Vec<Chunk> {
        let blocks = structure::parse(text);
        if !blocks.iter().any(ContentBlock::is_heading) {
            return self
                .split_spans(text, self.config.target_tokens)
                .into_iter()
                .map(|(offset, piece)| Chunk::from_blocks(vec![ContentBlock::text(piece, Vec::new(), offset)]))
                .collect();
        }

        let limit = self.config.target_tokens.saturating_mul(2);
        let mut chunks = Vec::new();
        for chunk in self.chunk_by_headings(blocks, self.config.target_tokens, self.config.min_chunk_tokens) {
            if self.config.tokens_for_chars(chunk.char_len()) <= limit {
                chunks.push(chunk);
                continue;
            }
            let rendered = chunk.text();
            let mut cursor = chunk.char_start;
            for (_, piece) in self.split_spans(&rendered, self.config.target_tokens) {
                let (start, end) = source_span(text, cursor, piece);
                let mut sub = Chunk::from_blocks(vec![ContentBlock::text(piece, chunk.heading_path.clone(), start)]);
                sub.heading_path = chunk.heading_path.clone();
                sub.char_end = end;
                cursor = end;
                chunks.push(sub);
            }
        }
        chunks
    }

    /// Group blocks greedily into chunks
    ///
    /// The running chunk is closed only when the next block would push it over
    /// `target_tokens`, it already exceeds `min_chunk_tokens`, and the next block
    /// is a heading. A heading therefore always opens the chunk holding the
    /// content that follows it. Whitespace-only blocks are skipped.
    pub fn chunk_by_headings(&self, blocks: Vec<ContentBlock>, target_tokens: usize, min_chunk_tokens: usize) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<ContentBlock> = Vec::new();
        let mut current_chars = 0;

        for block in blocks {
            if block.content.trim().is_empty() {
                continue;
            }
            let block_chars = block.char_len();
            let current_tokens = self.config.tokens_for_chars(current_chars);
            let next_tokens = self.config.tokens_for_chars(current_chars + block_chars);

            if block.is_heading() && !current.is_empty() && next_tokens > target_tokens && current_tokens > min_chunk_tokens {
                chunks.push(Chunk::from_blocks(std::mem::take(&mut current)));
                current_chars = 0;
            }
            current_chars += block_chars;
            current.push(block);
        }

        if !current.is_empty() {
            chunks.push(Chunk::from_blocks(current));
        }
        chunks
    }

    /// Split unstructured text into pieces of roughly `target_tokens`
    ///
    /// Each cut backs off to a paragraph break, else a line break, else the end
    /// of a sentence, looking only within the trailing half of the window.
    /// Pieces are trimmed and never empty.
    pub fn split_by_approx_tokens(&self, text: &str, target_tokens: usize) -> Vec<String> {
        self.split_spans(text, target_tokens)
            .into_iter()
            .map(|(_, piece)| piece.to_string())
            .collect()
    }

    fn split_spans<'a>(&self, text: &'a str, target_tokens: usize) -> Vec<(usize, &'a str)> {
        let window = target_tokens.saturating_mul(self.config.chars_per_token).max(1);
        let mut pieces = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                break;
            }
            let start = pos + (rest.len() - trimmed.len());

            let Some(end) = byte_index_of_char(trimmed, window) else {
                pieces.push((start, trimmed.trim_end()));
                break;
            };
            let half = byte_index_of_char(trimmed, window / 2).unwrap_or(0);
            let cut = find_cut(&trimmed[half..end]).map_or(end, |i| half + i);

            let piece = trimmed[..cut].trim_end();
            if !piece.is_empty() {
                pieces.push((start, piece));
            }
            pos = start + cut;
        }
        pieces
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}

/// Byte index of the `n`th character, or `None` when the text is not longer than `n`
fn byte_index_of_char(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(i, _)| i)
}

/// Byte span of `piece` in `source`, searching forward from `from`
///
/// Every non-blank line of a rendered piece appears in order in the source
/// (headings without their markup), so the span runs from the first line's
/// match to the end of the last line's match.
fn source_span(source: &str, from: usize, piece: &str) -> (usize, usize) {
    let mut start = None;
    let mut cursor = from;
    for line in piece.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        let Some(found) = source.get(cursor..).and_then(|rest| rest.find(line)) else {
            break;
        };
        start.get_or_insert(cursor + found);
        cursor += found + line.len();
    }
    (start.unwrap_or(from), cursor)
}

/// Cut position inside `window`: after a paragraph break, a line break or a sentence
fn find_cut(window: &str) -> Option<usize> {
    if let Some(i) = window.rfind("\n\n") {
        return Some(i + 2);
    }
    if let Some(i) = window.rfind('\n') {
        return Some(i + 1);
    }
    let mut next_is_space = false;
    for (i, c) in window.char_indices().rev() {
        if matches!(c, '.' | '!' | '?') && next_is_space {
            return Some(i + c.len_utf8());
        }
        next_is_space = c.is_whitespace();
    }
    None
}
