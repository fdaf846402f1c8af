/// AST node types for list-structured documents
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Document(Vec<Node>),
    /// Raw paragraph text; inline parsing belongs to a later stage
    Paragraph(String),
    ThematicBreak,
    CodeBlock {
        info: String,
        literal: String,
    },
    UnorderedList {
        bullet: char,
        tight: bool,         // Tight lists render items without paragraph spacing
        children: Vec<Node>, // Contains ListItem nodes
    },
    OrderedList {
        start: u32,
        delimiter: char,
        tight: bool,
        children: Vec<Node>, // Contains ListItem nodes
    },
    ListItem(Vec<Node>), // Contains block-level content
}

impl Node {
    /// Child nodes, for the variants that have them.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document(children)
            | Node::UnorderedList { children, .. }
            | Node::OrderedList { children, .. }
            | Node::ListItem(children) => children,
            _ => &[],
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Node::UnorderedList { .. } | Node::OrderedList { .. })
    }
}
