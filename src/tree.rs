/// Arena-backed block tree built up line by line
///
/// Open blocks always form a single path from the document root down to
/// the innermost open leaf; the engine closes and reopens blocks along
/// that path as lines arrive.
use crate::marker::ListShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct ListData {
    pub shape: ListShape,
    /// Literal digits of the first item's start value, ordered lists only.
    pub ordered_start: Option<String>,
    pub default_ordered_start: Option<String>,
    /// Source column where the list's first marker began.
    pub column: usize,
    /// Set at most from false to true, never reset.
    pub is_loose: bool,
    /// Blank-line markers recorded across the list's items and still
    /// pending classification by the close pass.
    pub count_all_blank_lines: usize,
    /// Consecutive-blank-line counter; reset on any non-blank
    /// continuation line.
    pub count_blank_lines_reset: usize,
}

impl ListData {
    pub fn is_ordered(&self) -> bool {
        matches!(self.shape, ListShape::Ordered(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItemData {
    /// Column of the item's own marker.
    pub column: usize,
    /// Columns of indentation a line needs to continue this item.
    pub required_columns: usize,
    /// True while the item's marker was immediately followed by end of
    /// line and the width is not yet confirmed by content. Flips to
    /// false once, never back.
    pub pending_resolution: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphData {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FencedCodeData {
    pub fence_char: char,
    pub fence_length: usize,
    pub info: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndentedCodeData {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockData {
    Document,
    List(ListData),
    ListItem(ListItemData),
    Paragraph(ParagraphData),
    FencedCode(FencedCodeData),
    IndentedCode(IndentedCodeData),
    ThematicBreak,
    /// Lightweight placeholder recording "a blank line occurred here";
    /// consumed by the list close pass.
    BlankLine,
}

#[derive(Debug)]
pub struct BlockNode {
    pub parent: Option<BlockId>,
    pub children: Vec<BlockId>,
    pub is_open: bool,
    /// Whether a blank line breaks this block. An open fenced code block
    /// keeps its interior blank lines, so it is not breakable.
    pub breakable: bool,
    pub data: BlockData,
}

pub struct BlockTree {
    nodes: Vec<BlockNode>,
}

impl BlockTree {
    pub fn new() -> Self {
        BlockTree {
            nodes: vec![BlockNode {
                parent: None,
                children: Vec::new(),
                is_open: true,
                breakable: true,
                data: BlockData::Document,
            }],
        }
    }

    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    pub fn node(&self, id: BlockId) -> &BlockNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: BlockId) -> &mut BlockNode {
        &mut self.nodes[id.0]
    }

    /// Append a new open block under `parent`.
    pub fn push_block(&mut self, parent: BlockId, data: BlockData) -> BlockId {
        let breakable = !matches!(data, BlockData::FencedCode(_));
        let id = BlockId(self.nodes.len());
        self.nodes.push(BlockNode {
            parent: Some(parent),
            children: Vec::new(),
            is_open: true,
            breakable,
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.node(id).parent
    }

    pub fn is_list(&self, id: BlockId) -> bool {
        matches!(self.node(id).data, BlockData::List(_))
    }

    pub fn is_list_item(&self, id: BlockId) -> bool {
        matches!(self.node(id).data, BlockData::ListItem(_))
    }

    pub fn is_paragraph(&self, id: BlockId) -> bool {
        matches!(self.node(id).data, BlockData::Paragraph(_))
    }

    pub fn is_fenced_code(&self, id: BlockId) -> bool {
        matches!(self.node(id).data, BlockData::FencedCode(_))
    }

    pub fn is_indented_code(&self, id: BlockId) -> bool {
        matches!(self.node(id).data, BlockData::IndentedCode(_))
    }

    pub fn is_thematic_break(&self, id: BlockId) -> bool {
        matches!(self.node(id).data, BlockData::ThematicBreak)
    }

    pub fn is_blank_line(&self, id: BlockId) -> bool {
        matches!(self.node(id).data, BlockData::BlankLine)
    }

    pub fn list(&self, id: BlockId) -> Option<&ListData> {
        match &self.node(id).data {
            BlockData::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn list_mut(&mut self, id: BlockId) -> Option<&mut ListData> {
        match &mut self.node_mut(id).data {
            BlockData::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn list_item(&self, id: BlockId) -> Option<&ListItemData> {
        match &self.node(id).data {
            BlockData::ListItem(item) => Some(item),
            _ => None,
        }
    }

    pub fn list_item_mut(&mut self, id: BlockId) -> Option<&mut ListItemData> {
        match &mut self.node_mut(id).data {
            BlockData::ListItem(item) => Some(item),
            _ => None,
        }
    }
}

impl Default for BlockTree {
    fn default() -> Self {
        Self::new()
    }
}
