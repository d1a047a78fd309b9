//! Block-based rich text content model
//!
//! A document is an ordered list of [`Block`]s. Each block carries its own
//! text, block type, list depth and inline style ranges. All offsets are
//! counted in chars, never bytes.

use std::collections::BTreeSet;

/// Deepest nesting level a list item may reach
pub const MAX_LIST_DEPTH: u8 = 4;

/// Key identifying a block within one document
pub type BlockKey = String;

/// Kind of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    #[default]
    Paragraph,
    HeaderOne,
    HeaderTwo,
    UnorderedListItem,
    OrderedListItem,
}

impl BlockType {
    /// Whether this block type takes part in list indentation
    pub fn is_list(self) -> bool {
        matches!(self, BlockType::UnorderedListItem | BlockType::OrderedListItem)
    }

    /// Tag used in the serialized form
    pub fn as_tag(self) -> &'static str {
        match self {
            BlockType::Paragraph => "unstyled",
            BlockType::HeaderOne => "header-one",
            BlockType::HeaderTwo => "header-two",
            BlockType::UnorderedListItem => "unordered-list-item",
            BlockType::OrderedListItem => "ordered-list-item",
        }
    }

    /// Parse a serialized tag. `paragraph` is accepted as an alias of `unstyled`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "unstyled" | "paragraph" => Some(BlockType::Paragraph),
            "header-one" => Some(BlockType::HeaderOne),
            "header-two" => Some(BlockType::HeaderTwo),
            "unordered-list-item" => Some(BlockType::UnorderedListItem),
            "ordered-list-item" => Some(BlockType::OrderedListItem),
            _ => None,
        }
    }
}

/// Inline formatting attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
}

impl InlineStyle {
    pub fn as_tag(self) -> &'static str {
        match self {
            InlineStyle::Bold => "BOLD",
            InlineStyle::Italic => "ITALIC",
            InlineStyle::Underline => "UNDERLINE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "BOLD" => Some(InlineStyle::Bold),
            "ITALIC" => Some(InlineStyle::Italic),
            "UNDERLINE" => Some(InlineStyle::Underline),
            _ => None,
        }
    }
}

/// Half-open char interval `[start, end)` carrying one style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRange {
    pub style: InlineStyle,
    pub start: usize,
    pub end: usize,
}

impl StyleRange {
    pub fn new(style: InlineStyle, start: usize, end: usize) -> Self {
        Self { style, start, end }
    }
}

/// One paragraph, heading or list item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub key: BlockKey,
    pub block_type: BlockType,
    pub text: String,
    pub depth: u8,
    /// Normalized: merged per style, sorted by start
    ranges: Vec<StyleRange>,
}

impl Block {
    /// Create an unformatted block at depth 0
    pub fn new(key: impl Into<BlockKey>, block_type: BlockType, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            block_type,
            text: text.into(),
            depth: 0,
            ranges: Vec::new(),
        }
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    /// Attach style ranges. Ranges are clipped to the text and merged.
    pub fn with_ranges(mut self, ranges: Vec<StyleRange>) -> Self {
        self.ranges = normalize(ranges, self.len());
        self
    }

    pub fn style_ranges(&self) -> &[StyleRange] {
        &self.ranges
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_index(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Styles applied to the char at `offset`
    pub fn styles_at(&self, offset: usize) -> BTreeSet<InlineStyle> {
        self.ranges
            .iter()
            .filter(|r| r.start <= offset && offset < r.end)
            .map(|r| r.style)
            .collect()
    }

    /// Whether every char in `[start, end)` carries `style`
    pub fn has_style(&self, style: InlineStyle, start: usize, end: usize) -> bool {
        start < end
            && self
                .ranges
                .iter()
                .any(|r| r.style == style && r.start <= start && end <= r.end)
    }

    pub fn add_style(&mut self, style: InlineStyle, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut ranges = std::mem::take(&mut self.ranges);
        ranges.push(StyleRange::new(style, start, end));
        self.ranges = normalize(ranges, self.len());
    }

    pub fn remove_style(&mut self, style: InlineStyle, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if r.style != style || r.end <= start || r.start >= end {
                ranges.push(r);
                continue;
            }
            if r.start < start {
                ranges.push(StyleRange::new(style, r.start, start));
            }
            if end < r.end {
                ranges.push(StyleRange::new(style, end, r.end));
            }
        }
        self.ranges = normalize(ranges, self.len());
    }

    /// Insert `text` at `offset`; the inserted chars carry exactly `styles`
    pub fn insert(&mut self, offset: usize, text: &str, styles: &BTreeSet<InlineStyle>) {
        let count = text.chars().count();
        if count == 0 {
            return;
        }
        let offset = offset.min(self.len());
        let at = self.byte_index(offset);
        self.text.insert_str(at, text);

        let mut ranges = Vec::with_capacity(self.ranges.len() + styles.len() + 1);
        for r in self.ranges.drain(..) {
            if r.end <= offset {
                ranges.push(r);
            } else if r.start >= offset {
                ranges.push(StyleRange::new(r.style, r.start + count, r.end + count));
            } else {
                ranges.push(StyleRange::new(r.style, r.start, offset));
                ranges.push(StyleRange::new(r.style, offset + count, r.end + count));
            }
        }
        for style in styles {
            ranges.push(StyleRange::new(*style, offset, offset + count));
        }
        self.ranges = normalize(ranges, self.len());
    }

    /// Remove the chars in `[start, end)`
    pub fn delete(&mut self, start: usize, end: usize) {
        let len = self.len();
        let end = end.min(len);
        if start >= end {
            return;
        }
        let (from, to) = (self.byte_index(start), self.byte_index(end));
        self.text.replace_range(from..to, "");

        let removed = end - start;
        let shift = |p: usize| {
            if p <= start {
                p
            } else if p >= end {
                p - removed
            } else {
                start
            }
        };
        let ranges = self
            .ranges
            .drain(..)
            .map(|r| StyleRange::new(r.style, shift(r.start), shift(r.end)))
            .collect();
        self.ranges = normalize(ranges, self.len());
    }

    /// Split at `offset`, keeping the head in place and returning the tail
    /// under `key` with the same type and depth.
    pub fn split_off(&mut self, offset: usize, key: impl Into<BlockKey>) -> Block {
        let offset = offset.min(self.len());
        let at = self.byte_index(offset);
        let tail_text = self.text.split_off(at);

        let mut head = Vec::new();
        let mut tail = Vec::new();
        for r in self.ranges.drain(..) {
            if r.start < offset {
                head.push(StyleRange::new(r.style, r.start, r.end.min(offset)));
            }
            if r.end > offset {
                tail.push(StyleRange::new(r.style, r.start.max(offset) - offset, r.end - offset));
            }
        }
        self.ranges = normalize(head, self.len());

        Block::new(key, self.block_type, tail_text)
            .with_depth(self.depth)
            .with_ranges(tail)
    }

    /// Append the text and formatting of `other` to this block
    pub fn append(&mut self, other: &Block) {
        let shift = self.len();
        self.text.push_str(&other.text);
        let mut ranges = std::mem::take(&mut self.ranges);
        ranges.extend(
            other
                .ranges
                .iter()
                .map(|r| StyleRange::new(r.style, r.start + shift, r.end + shift)),
        );
        self.ranges = normalize(ranges, self.len());
    }
}

/// Clip to `len`, drop empty ranges, merge overlapping or touching ranges of
/// the same style and sort by start.
fn normalize(mut ranges: Vec<StyleRange>, len: usize) -> Vec<StyleRange> {
    for r in &mut ranges {
        r.end = r.end.min(len);
    }
    ranges.retain(|r| r.start < r.end);
    ranges.sort_by_key(|r| (r.style, r.start));

    let mut merged: Vec<StyleRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(last) = merged.last_mut() {
            if last.style == range.style && range.start <= last.end {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged.sort_by_key(|r| (r.start, r.style));
    merged
}

/// A position inside the content: block index and char offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

/// Ordered, resolved form of a [`Selection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Anchor/focus selection, direction agnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_key: BlockKey,
    pub focus_offset: usize,
}

impl Selection {
    /// Collapsed selection
    pub fn caret(key: impl Into<BlockKey>, offset: usize) -> Self {
        let key = key.into();
        Self {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
        }
    }

    pub fn range(
        anchor_key: impl Into<BlockKey>,
        anchor_offset: usize,
        focus_key: impl Into<BlockKey>,
        focus_offset: usize,
    ) -> Self {
        Self {
            anchor_key: anchor_key.into(),
            anchor_offset,
            focus_key: focus_key.into(),
            focus_offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    /// Bring the selection inside `content`. Unknown keys move to the end of
    /// the last block, offsets are clamped to the block length.
    pub fn clamp(&self, content: &ContentState) -> Selection {
        let fix = |key: &str, offset: usize| match content.block(key) {
            Some(block) => (block.key.clone(), offset.min(block.len())),
            None => {
                let last = content.last();
                (last.key.clone(), last.len())
            }
        };
        let (anchor_key, anchor_offset) = fix(&self.anchor_key, self.anchor_offset);
        let (focus_key, focus_offset) = fix(&self.focus_key, self.focus_offset);
        Selection {
            anchor_key,
            anchor_offset,
            focus_key,
            focus_offset,
        }
    }

    /// Resolve into ordered block positions
    pub fn span(&self, content: &ContentState) -> Option<Span> {
        let anchor = Position {
            block: content.index_of(&self.anchor_key)?,
            offset: self.anchor_offset,
        };
        let focus = Position {
            block: content.index_of(&self.focus_key)?,
            offset: self.focus_offset,
        };
        Some(if anchor <= focus {
            Span { start: anchor, end: focus }
        } else {
            Span { start: focus, end: anchor }
        })
    }
}

/// The full ordered block sequence of a document. Never empty, keys unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentState {
    blocks: Vec<Block>,
}

impl Default for ContentState {
    fn default() -> Self {
        Self::empty()
    }
}

impl ContentState {
    /// Canonical empty content: a single empty paragraph
    pub fn empty() -> Self {
        Self {
            blocks: vec![Block::new(key_for(0), BlockType::Paragraph, "")],
        }
    }

    /// Build from blocks. Returns `None` for an empty list or duplicate keys.
    pub fn from_blocks(blocks: Vec<Block>) -> Option<Self> {
        if blocks.is_empty() {
            return None;
        }
        let mut seen = BTreeSet::new();
        if !blocks.iter().all(|b| seen.insert(b.key.as_str())) {
            return None;
        }
        Some(Self { blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn block(&self, key: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.key == key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.key == key)
    }

    pub fn first(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// A key not used by any block
    pub fn fresh_key(&self) -> BlockKey {
        (self.blocks.len()..)
            .map(key_for)
            .find(|key| self.block(key).is_none())
            .unwrap_or_default()
    }

    /// Block text joined with newlines
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Per-block `(index, start, end)` char intervals covered by `span`
    pub fn segments(&self, span: Span) -> Vec<(usize, usize, usize)> {
        (span.start.block..=span.end.block)
            .map(|i| {
                let start = if i == span.start.block { span.start.offset } else { 0 };
                let end = if i == span.end.block {
                    span.end.offset
                } else {
                    self.blocks[i].len()
                };
                (i, start, end)
            })
            .collect()
    }

    /// Delete everything covered by `span`, joining the boundary blocks.
    /// Returns the caret position where the span started.
    pub fn delete_span(&mut self, span: Span) -> Position {
        let Span { start, end } = span;
        if span.is_collapsed() {
            return start;
        }
        if start.block == end.block {
            self.blocks[start.block].delete(start.offset, end.offset);
            return start;
        }
        let mut last = self.blocks[end.block].clone();
        let tail = last.split_off(end.offset, last.key.clone());
        let head = &mut self.blocks[start.block];
        let head_len = head.len();
        head.delete(start.offset, head_len);
        head.append(&tail);
        self.blocks.drain(start.block + 1..=end.block);
        start
    }
}

fn key_for(n: usize) -> BlockKey {
    format!("b{n}")
}
