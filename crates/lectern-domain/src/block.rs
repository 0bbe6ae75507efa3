//! Structural fragments of a source document

use serde::{Deserialize, Serialize};

/// Kind of a parsed content block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// A detected heading line
    Heading,
    /// A run of body text between headings
    Text,
}

/// A parsed fragment of the source document
///
/// Created line-by-line by the structure parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    /// Heading or text
    pub kind: BlockKind,

    /// The block's text (a single line for headings)
    pub content: String,

    /// Ancestor headings, outermost first
    pub heading_path: Vec<String>,

    /// Heading depth (0 for body text)
    pub level: u8,

    /// Byte offset of the block's first line in the source text
    #[serde(default)]
    pub offset: usize,
}

impl ContentBlock {
    /// Create a heading block
    pub fn heading(content: impl Into<String>, level: u8, heading_path: Vec<String>, offset: usize) -> Self {
        Self {
            kind: BlockKind::Heading,
            content: content.into(),
            heading_path,
            level,
            offset,
        }
    }

    /// Create a body text block
    pub fn text(content: impl Into<String>, heading_path: Vec<String>, offset: usize) -> Self {
        Self {
            kind: BlockKind::Text,
            content: content.into(),
            heading_path,
            level: 0,
            offset,
        }
    }

    /// Whether this block is a heading
    pub fn is_heading(&self) -> bool {
        self.kind == BlockKind::Heading
    }

    /// Length of the block's content in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A contiguous group of blocks sized to approximate a token target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Blocks in source order
    pub blocks: Vec<ContentBlock>,

    /// Representative heading label used for citations
    pub heading_path: Vec<String>,

    /// Byte offset where the chunk starts in the source
    pub char_start: usize,

    /// Byte offset where the chunk ends in the source
    pub char_end: usize,
}

impl Chunk {
    /// Build a chunk from blocks, deriving the heading label and offsets
    ///
    /// The label is the heading path of the first heading in the chunk, or the
    /// path the first block sits under.
    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        let heading_path = blocks
            .iter()
            .find(|b| b.is_heading())
            .map(|b| {
                let mut path = b.heading_path.clone();
                path.push(b.content.clone());
                path
            })
            .or_else(|| blocks.first().map(|b| b.heading_path.clone()))
            .unwrap_or_default();

        let char_start = blocks.first().map(|b| b.offset).unwrap_or(0);
        let char_end = blocks
            .last()
            .map(|b| b.offset + b.content.len())
            .unwrap_or(char_start);

        Self {
            blocks,
            heading_path,
            char_start,
            char_end,
        }
    }

    /// Render the chunk as plain text for the LLM
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The heading path joined for display ("Chapter 1 > Section 2")
    pub fn heading_label(&self) -> String {
        self.heading_path.join(" > ")
    }

    /// Total characters across all blocks
    pub fn char_len(&self) -> usize {
        self.blocks.iter().map(ContentBlock::char_len).sum()
    }
}
