//! Serialization of content to and from the persisted JSON envelope
//!
//! The persisted form is a JSON object `{ blocks, entityMap }` where every
//! block carries `key`, `text`, `type`, `depth`, `inlineStyleRanges` and
//! `entityRanges`. Decoding never fails: corrupt input falls back to the
//! empty content and the problem is reported as a warning.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::content::{Block, BlockType, ContentState, InlineStyle, StyleRange, MAX_LIST_DEPTH};

/// Serialized document envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDocument {
    pub blocks: Vec<SerializedBlock>,
    #[serde(default)]
    pub entity_map: serde_json::Map<String, serde_json::Value>,
}

/// Serialized block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBlock {
    pub key: String,
    pub text: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub depth: u8,
    #[serde(default)]
    pub inline_style_ranges: Vec<SerializedStyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<serde_json::Value>,
}

/// Serialized inline style range, `offset` and `length` in chars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: String,
}

/// Why a serialized document was rejected
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("content is not a valid document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has no blocks")]
    NoBlocks,

    #[error("duplicate block key `{0}`")]
    DuplicateKey(String),

    #[error("unknown block type `{tag}` in block `{key}`")]
    UnknownBlockType { key: String, tag: String },

    #[error("unknown inline style `{tag}` in block `{key}`")]
    UnknownStyle { key: String, tag: String },

    #[error("style range at {offset} with length {length} exceeds block `{key}` of length {len}")]
    RangeOutOfBounds {
        key: String,
        offset: usize,
        length: usize,
        len: usize,
    },

    #[error("block `{key}` has depth {depth}, maximum is {max}", max = MAX_LIST_DEPTH)]
    DepthOutOfRange { key: String, depth: u8 },
}

/// Result of a tolerant decode
#[derive(Debug)]
pub struct Decoded {
    pub content: ContentState,
    /// Set when the input was corrupt and `content` is the empty fallback
    pub warning: Option<CodecError>,
}

/// Convert content into its serialized envelope
pub fn encode(content: &ContentState) -> SerializedDocument {
    let blocks = content
        .blocks()
        .iter()
        .map(|block| SerializedBlock {
            key: block.key.clone(),
            text: block.text.clone(),
            block_type: block.block_type.as_tag().to_string(),
            depth: block.depth,
            inline_style_ranges: block
                .style_ranges()
                .iter()
                .map(|r| SerializedStyleRange {
                    offset: r.start,
                    length: r.end - r.start,
                    style: r.style.as_tag().to_string(),
                })
                .collect(),
            entity_ranges: Vec::new(),
        })
        .collect();

    SerializedDocument {
        blocks,
        entity_map: serde_json::Map::new(),
    }
}

/// Encode content into the JSON string stored as document content
pub fn encode_to_string(content: &ContentState) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&encode(content))?)
}

/// Decode persisted content, falling back to empty content on any failure.
///
/// Blank input is the content of a freshly created document and decodes to
/// the empty content without a warning.
pub fn decode(input: &str) -> Decoded {
    if input.trim().is_empty() {
        return Decoded {
            content: ContentState::empty(),
            warning: None,
        };
    }

    match parse(input) {
        Ok(content) => Decoded {
            content,
            warning: None,
        },
        Err(e) => Decoded {
            content: ContentState::empty(),
            warning: Some(e),
        },
    }
}

/// Strict decode of a JSON string
pub fn parse(input: &str) -> Result<ContentState, CodecError> {
    let document: SerializedDocument = serde_json::from_str(input)?;
    from_serialized(document)
}

/// Validate a serialized envelope and build content from it
pub fn from_serialized(document: SerializedDocument) -> Result<ContentState, CodecError> {
    if document.blocks.is_empty() {
        return Err(CodecError::NoBlocks);
    }

    let mut blocks: Vec<Block> = Vec::with_capacity(document.blocks.len());
    for raw in document.blocks {
        if blocks.iter().any(|b| b.key == raw.key) {
            return Err(CodecError::DuplicateKey(raw.key));
        }
        blocks.push(block_from_serialized(raw)?);
    }

    ContentState::from_blocks(blocks).ok_or(CodecError::NoBlocks)
}

fn block_from_serialized(raw: SerializedBlock) -> Result<Block, CodecError> {
    let block_type = BlockType::from_tag(&raw.block_type).ok_or_else(|| CodecError::UnknownBlockType {
        key: raw.key.clone(),
        tag: raw.block_type.clone(),
    })?;

    if raw.depth > MAX_LIST_DEPTH {
        return Err(CodecError::DepthOutOfRange {
            key: raw.key,
            depth: raw.depth,
        });
    }

    let len = raw.text.chars().count();
    let mut ranges = Vec::with_capacity(raw.inline_style_ranges.len());
    for range in &raw.inline_style_ranges {
        let style = InlineStyle::from_tag(&range.style).ok_or_else(|| CodecError::UnknownStyle {
            key: raw.key.clone(),
            tag: range.style.clone(),
        })?;
        let end = range.offset.checked_add(range.length).filter(|end| *end <= len);
        let Some(end) = end else {
            return Err(CodecError::RangeOutOfBounds {
                key: raw.key.clone(),
                offset: range.offset,
                length: range.length,
                len,
            });
        };
        ranges.push(StyleRange::new(style, range.offset, end));
    }

    Ok(Block::new(raw.key, block_type, raw.text)
        .with_depth(raw.depth)
        .with_ranges(ranges))
}
