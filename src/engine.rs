/// Line-driven block engine
///
/// Feeds one line at a time through two phases: first each open block
/// gets a chance to continue, outermost first; then new blocks are
/// opened at the cursor. Paragraphs, thematic breaks, and code blocks
/// are supported just far enough to host list structure; lists
/// themselves are owned by the `ListBlockController`.
use crate::ast::Node;
use crate::list::{BlockContinue, BlockStart, ListBlockController, finish_list};
use crate::marker::ListShape;
use crate::scan::{CODE_INDENT, LineScanner, ScanState};
use crate::thematic::ThematicBreakRecognizer;
use crate::tree::{
    BlockData, BlockId, BlockTree, FencedCodeData, IndentedCodeData, ParagraphData,
};
use tracing::trace;

/// Shared per-line state, passed by reference to block recognizers for
/// the duration of one line and never retained.
pub struct BlockContext<'t, 'l> {
    tree: &'t mut BlockTree,
    open_stack: &'t mut Vec<BlockId>,
    scanner: LineScanner<'l>,
    new_blocks: Vec<BlockData>,
    next_continue: Option<BlockId>,
    innermost_breakable: bool,
}

impl<'t, 'l> BlockContext<'t, 'l> {
    pub fn current_char(&self) -> Option<char> {
        self.scanner.current_char()
    }

    pub fn advance(&mut self) -> Option<char> {
        self.scanner.advance()
    }

    pub fn column(&self) -> usize {
        self.scanner.column()
    }

    pub fn column_before_indent(&self) -> usize {
        self.scanner.column_before_indent()
    }

    pub fn indent(&self) -> usize {
        self.scanner.indent()
    }

    pub fn is_code_indent(&self) -> bool {
        self.scanner.is_code_indent()
    }

    pub fn is_blank_line(&self) -> bool {
        self.scanner.is_blank_line()
    }

    pub fn rest(&self) -> &'l str {
        self.scanner.rest()
    }

    pub fn rest_from_column(&self, column: usize) -> String {
        self.scanner.rest_from_column(column)
    }

    pub fn restart_indent(&mut self) {
        self.scanner.restart_indent();
    }

    pub fn restart_indent_at(&mut self, column: usize) {
        self.scanner.restart_indent_at(column);
    }

    pub fn parse_indent(&mut self) {
        self.scanner.parse_indent();
    }

    pub fn go_to_column(&mut self, column: usize) {
        self.scanner.go_to_column(column);
    }

    pub fn skip_to_end_of_line(&mut self) {
        while self.scanner.current_char().is_some() {
            self.scanner.advance();
        }
    }

    pub fn save(&self) -> ScanState {
        self.scanner.save()
    }

    pub fn restore(&mut self, state: ScanState) {
        self.scanner.restore(state);
    }

    pub fn scanner_mut(&mut self) -> &mut LineScanner<'l> {
        &mut self.scanner
    }

    pub fn tree(&self) -> &BlockTree {
        self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BlockTree {
        self.tree
    }

    /// The next deeper open block that will be offered the line after
    /// the one currently being continued.
    pub fn next_continue(&self) -> Option<BlockId> {
        self.next_continue
    }

    /// Whether the innermost open block at the start of this line is
    /// broken by blank lines.
    pub fn innermost_breakable(&self) -> bool {
        self.innermost_breakable
    }

    /// The innermost open block.
    pub fn innermost(&self) -> BlockId {
        self.open_stack
            .last()
            .copied()
            .unwrap_or_else(|| self.tree.root())
    }

    /// Queue a newly opened block; the engine attaches queued blocks in
    /// order once the recognizer commits to the line.
    pub fn push_new(&mut self, data: BlockData) {
        self.new_blocks.push(data);
    }

    /// Drop speculatively created blocks after a precedence probe.
    pub fn discard_new_blocks(&mut self) {
        self.new_blocks.clear();
    }

    /// Close `id` and any open blocks nested inside it, innermost first.
    pub fn close_block(&mut self, id: BlockId) {
        close_block(self.tree, self.open_stack, id);
    }
}

fn close_block(tree: &mut BlockTree, open_stack: &mut Vec<BlockId>, id: BlockId) {
    if !open_stack.contains(&id) {
        return;
    }
    while let Some(top) = open_stack.pop() {
        tree.node_mut(top).is_open = false;
        if tree.is_list(top) {
            finish_list(tree, top);
        }
        if top == id {
            break;
        }
    }
}

pub struct BlockParser {
    tree: BlockTree,
    open_stack: Vec<BlockId>,
    lists: ListBlockController,
    thematic: ThematicBreakRecognizer,
}

impl BlockParser {
    pub fn new() -> Self {
        Self::with_lists(ListBlockController::new())
    }

    /// Build a parser around a list controller with custom recognizers.
    pub fn with_lists(lists: ListBlockController) -> Self {
        let tree = BlockTree::new();
        let open_stack = vec![tree.root()];
        BlockParser {
            tree,
            open_stack,
            lists,
            thematic: ThematicBreakRecognizer::default(),
        }
    }

    pub fn process_line(&mut self, line: &str) {
        trace!(line, "processing line");
        let mut scanner = LineScanner::new(line);
        scanner.parse_indent();
        let innermost_breakable = self
            .open_stack
            .last()
            .map(|&id| self.tree.node(id).breakable)
            .unwrap_or(true);
        let mut ctx = BlockContext {
            tree: &mut self.tree,
            open_stack: &mut self.open_stack,
            scanner,
            new_blocks: Vec::new(),
            next_continue: None,
            innermost_breakable,
        };
        let lists = &self.lists;
        let thematic = &self.thematic;

        // Phase 1: offer the line to each open block, outermost first
        let snapshot: Vec<BlockId> = ctx.open_stack.clone();
        let mut unmatched: Option<BlockId> = None;
        for depth in 1..snapshot.len() {
            let block = snapshot[depth];
            if !ctx.tree.node(block).is_open {
                // The structure changed under us mid-line
                break;
            }
            ctx.next_continue = snapshot
                .get(depth + 1)
                .copied()
                .filter(|&id| ctx.tree.node(id).is_open);
            let result = if ctx.tree.is_list(block) || ctx.tree.is_list_item(block) {
                lists.try_continue(&mut ctx, block)
            } else if ctx.tree.is_paragraph(block) {
                if ctx.is_blank_line() {
                    BlockContinue::NoMatch
                } else {
                    BlockContinue::Continue
                }
            } else if ctx.tree.is_fenced_code(block) {
                continue_fenced(&mut ctx, block)
            } else if ctx.tree.is_indented_code(block) {
                continue_indented(&mut ctx, block)
            } else {
                BlockContinue::Terminate
            };
            match result {
                BlockContinue::Continue | BlockContinue::Skip => {
                    if !ctx.new_blocks.is_empty() {
                        // A new marker replaced part of the open structure
                        commit_new_blocks(&mut ctx);
                        ctx.restart_indent();
                        ctx.parse_indent();
                        break;
                    }
                    // Code content consumes the whole line
                    if ctx.tree.is_fenced_code(block) || ctx.tree.is_indented_code(block) {
                        return;
                    }
                    if ctx.tree.is_list_item(block) {
                        ctx.parse_indent();
                    }
                }
                BlockContinue::NoMatch => {
                    unmatched = Some(block);
                    break;
                }
                BlockContinue::Terminate => {
                    ctx.close_block(block);
                    break;
                }
                BlockContinue::TerminateDiscard => {
                    if ctx.tree.node(block).is_open {
                        ctx.close_block(block);
                    }
                    return;
                }
            }
        }

        if ctx.is_blank_line() {
            if let Some(block) = unmatched
                && ctx.tree.node(block).is_open
            {
                ctx.close_block(block);
            }
            return;
        }

        // Phase 2: open new blocks at the cursor; a line can open several
        // nested blocks ("- - a")
        loop {
            if !try_open_block(lists, thematic, &mut ctx) {
                break;
            }
            if let Some(block) = unmatched.take()
                && ctx.tree.node(block).is_open
            {
                ctx.close_block(block);
            }
            let last = commit_new_blocks(&mut ctx);
            ctx.restart_indent();
            ctx.parse_indent();
            if let Some(last) = last {
                // These consume the rest of the line when they open
                if ctx.tree.is_fenced_code(last) || ctx.tree.is_indented_code(last) {
                    return;
                }
                if ctx.tree.is_thematic_break(last) {
                    ctx.close_block(last);
                    return;
                }
            }
        }

        // Phase 3: whatever remains is paragraph text
        let text = ctx.rest().trim().to_string();
        if text.is_empty() {
            if let Some(block) = unmatched
                && ctx.tree.node(block).is_open
            {
                ctx.close_block(block);
            }
            return;
        }
        let top = ctx.innermost();
        if ctx.tree.is_paragraph(top) {
            // Direct continuation, or lazy continuation when an enclosing
            // block did not match this line
            if let BlockData::Paragraph(paragraph) = &mut ctx.tree.node_mut(top).data {
                paragraph.lines.push(text);
            }
            return;
        }
        if let Some(block) = unmatched
            && ctx.tree.node(block).is_open
        {
            ctx.close_block(block);
        }
        ctx.push_new(BlockData::Paragraph(ParagraphData { lines: vec![text] }));
        commit_new_blocks(&mut ctx);
    }

    /// Close everything still open and produce the final tree.
    pub fn finish(mut self) -> Node {
        while self.open_stack.len() > 1 {
            let top = self.open_stack[self.open_stack.len() - 1];
            close_block(&mut self.tree, &mut self.open_stack, top);
        }
        let root = self.tree.root();
        block_to_node(&self.tree, root).unwrap_or(Node::Document(Vec::new()))
    }
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach queued blocks under the innermost open block that can hold
/// them, closing leaves and mismatched lists on the way.
fn commit_new_blocks(ctx: &mut BlockContext) -> Option<BlockId> {
    let mut last = None;
    for data in std::mem::take(&mut ctx.new_blocks) {
        loop {
            let top = ctx.innermost();
            if ctx.tree.is_paragraph(top) {
                // A paragraph never contains other blocks
                ctx.close_block(top);
            } else if ctx.tree.is_list(top) && !matches!(data, BlockData::ListItem(_)) {
                // A list holds only items; anything else ends it
                ctx.close_block(top);
            } else {
                break;
            }
        }
        let parent = ctx.innermost();
        let id = ctx.tree.push_block(parent, data);
        ctx.open_stack.push(id);
        last = Some(id);
    }
    last
}

fn try_open_block(
    lists: &ListBlockController,
    thematic: &ThematicBreakRecognizer,
    ctx: &mut BlockContext,
) -> bool {
    if ctx.current_char().is_none() {
        return false;
    }
    // The list controller consults the thematic-break recognizer itself,
    // so trying it first still lets a break win the tie
    if matches!(lists.try_open(ctx), BlockStart::Continue) {
        return true;
    }
    if thematic.try_open(ctx) {
        return true;
    }
    if try_open_fenced(ctx) {
        return true;
    }
    try_open_indented(ctx)
}

fn try_open_fenced(ctx: &mut BlockContext) -> bool {
    if ctx.is_code_indent() {
        return false;
    }
    let Some(fence_char) = ctx.current_char() else {
        return false;
    };
    if fence_char != '`' && fence_char != '~' {
        return false;
    }
    let rest = ctx.rest();
    let fence_length = rest.chars().take_while(|&ch| ch == fence_char).count();
    if fence_length < 3 {
        return false;
    }
    let info = rest[fence_length..].trim();
    if fence_char == '`' && info.contains('`') {
        return false;
    }
    let info = info.to_string();
    ctx.skip_to_end_of_line();
    ctx.push_new(BlockData::FencedCode(FencedCodeData {
        fence_char,
        fence_length,
        info,
        lines: Vec::new(),
    }));
    true
}

fn continue_fenced(ctx: &mut BlockContext, block: BlockId) -> BlockContinue {
    let (fence_char, fence_length) = match &ctx.tree.node(block).data {
        BlockData::FencedCode(fence) => (fence.fence_char, fence.fence_length),
        _ => return BlockContinue::NoMatch,
    };
    if !ctx.is_code_indent() && ctx.current_char() == Some(fence_char) {
        let rest = ctx.rest();
        let run = rest.chars().take_while(|&ch| ch == fence_char).count();
        if run >= fence_length && rest[run..].trim().is_empty() {
            return BlockContinue::TerminateDiscard;
        }
    }
    let content = if ctx.is_blank_line() {
        String::new()
    } else {
        ctx.rest_from_column(ctx.column_before_indent())
    };
    if let BlockData::FencedCode(fence) = &mut ctx.tree.node_mut(block).data {
        fence.lines.push(content);
    }
    BlockContinue::Continue
}

fn try_open_indented(ctx: &mut BlockContext) -> bool {
    if !ctx.is_code_indent() || ctx.is_blank_line() {
        return false;
    }
    // Indented code cannot interrupt a paragraph
    if ctx.tree.is_paragraph(ctx.innermost()) {
        return false;
    }
    let content = ctx.rest_from_column(ctx.column_before_indent() + CODE_INDENT);
    ctx.skip_to_end_of_line();
    ctx.push_new(BlockData::IndentedCode(IndentedCodeData {
        lines: vec![content],
    }));
    true
}

fn continue_indented(ctx: &mut BlockContext, block: BlockId) -> BlockContinue {
    let content = if ctx.is_blank_line() {
        String::new()
    } else if ctx.indent() >= CODE_INDENT {
        ctx.rest_from_column(ctx.column_before_indent() + CODE_INDENT)
    } else {
        return BlockContinue::NoMatch;
    };
    if let BlockData::IndentedCode(code) = &mut ctx.tree.node_mut(block).data {
        code.lines.push(content);
    }
    BlockContinue::Continue
}

fn convert_children(tree: &BlockTree, children: &[BlockId]) -> Vec<Node> {
    children
        .iter()
        .filter_map(|&child| block_to_node(tree, child))
        .collect()
}

fn code_literal(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        let mut literal = lines.join("\n");
        literal.push('\n');
        literal
    }
}

fn block_to_node(tree: &BlockTree, id: BlockId) -> Option<Node> {
    let node = tree.node(id);
    match &node.data {
        BlockData::Document => Some(Node::Document(convert_children(tree, &node.children))),
        BlockData::List(list) => {
            let children = convert_children(tree, &node.children);
            let tight = !list.is_loose;
            match list.shape {
                ListShape::Bulleted(bullet) => Some(Node::UnorderedList {
                    bullet,
                    tight,
                    children,
                }),
                ListShape::Ordered(delimiter) => {
                    let start = list
                        .ordered_start
                        .as_deref()
                        .unwrap_or("1")
                        .parse()
                        .unwrap_or(1);
                    Some(Node::OrderedList {
                        start,
                        delimiter,
                        tight,
                        children,
                    })
                }
            }
        }
        BlockData::ListItem(_) => Some(Node::ListItem(convert_children(tree, &node.children))),
        BlockData::Paragraph(paragraph) => Some(Node::Paragraph(paragraph.lines.join("\n"))),
        BlockData::FencedCode(fence) => Some(Node::CodeBlock {
            info: fence.info.clone(),
            literal: code_literal(&fence.lines),
        }),
        BlockData::IndentedCode(code) => {
            // Trailing blank lines belong to whatever follows the block
            let mut lines = code.lines.clone();
            while lines.last().is_some_and(|line| line.is_empty()) {
                lines.pop();
            }
            Some(Node::CodeBlock {
                info: String::new(),
                literal: code_literal(&lines),
            })
        }
        BlockData::ThematicBreak => Some(Node::ThematicBreak),
        BlockData::BlankLine => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> Node {
        let mut parser = BlockParser::new();
        for line in lines {
            parser.process_line(line);
        }
        parser.finish()
    }

    #[test]
    fn test_two_items_stay_tight() {
        let ast = parse(&["- a", "- b"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        assert_eq!(children.len(), 1);
        let Node::UnorderedList {
            bullet,
            tight,
            children,
        } = &children[0]
        else {
            panic!("expected an unordered list, got {:?}", children[0]);
        };
        assert_eq!(*bullet, '-');
        assert!(*tight);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_blank_between_items_makes_list_loose() {
        let ast = parse(&["- a", "", "- b"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        let Node::UnorderedList { tight, children, .. } = &children[0] else {
            panic!("expected an unordered list, got {:?}", children[0]);
        };
        assert!(!*tight);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_two_blank_lines_terminate_the_list() {
        let ast = parse(&["- a", "", "", "- b"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        // Two sibling lists, not one
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], Node::UnorderedList { .. }));
        assert!(matches!(children[1], Node::UnorderedList { .. }));
    }

    #[test]
    fn test_thematic_break_wins_over_bullet() {
        let ast = parse(&["- a", "***"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], Node::UnorderedList { .. }));
        assert!(matches!(children[1], Node::ThematicBreak));
    }

    #[test]
    fn test_break_on_marker_line_lands_inside_item() {
        let ast = parse(&["- ***"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        let Node::UnorderedList { children, .. } = &children[0] else {
            panic!("expected an unordered list, got {:?}", children[0]);
        };
        let Node::ListItem(item_children) = &children[0] else {
            panic!("expected a list item");
        };
        assert_eq!(item_children, &vec![Node::ThematicBreak]);
    }

    #[test]
    fn test_fenced_code_absorbs_interior_blanks() {
        let ast = parse(&["- ```", "  code", "", "  more", "  ```", "- b"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        assert_eq!(children.len(), 1, "the list must survive the blank line");
        let Node::UnorderedList { tight, children, .. } = &children[0] else {
            panic!("expected an unordered list, got {:?}", children[0]);
        };
        assert!(*tight, "blanks inside fenced code are not loose evidence");
        assert_eq!(children.len(), 2);
        let Node::ListItem(item_children) = &children[0] else {
            panic!("expected a list item");
        };
        assert_eq!(
            item_children,
            &vec![Node::CodeBlock {
                info: String::new(),
                literal: "code\n\nmore\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_surplus_indent_becomes_nested_code() {
        let ast = parse(&["- a", "", "      code"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        let Node::UnorderedList { children, .. } = &children[0] else {
            panic!("expected an unordered list, got {:?}", children[0]);
        };
        let Node::ListItem(item_children) = &children[0] else {
            panic!("expected a list item");
        };
        assert_eq!(
            item_children,
            &vec![
                Node::Paragraph("a".to_string()),
                Node::CodeBlock {
                    info: String::new(),
                    literal: "code\n".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_lazy_paragraph_continuation() {
        let ast = parse(&["- a", "b"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        let Node::UnorderedList { children, .. } = &children[0] else {
            panic!("expected an unordered list, got {:?}", children[0]);
        };
        let Node::ListItem(item_children) = &children[0] else {
            panic!("expected a list item");
        };
        assert_eq!(item_children, &vec![Node::Paragraph("a\nb".to_string())]);
    }

    #[test]
    fn test_nested_blank_propagates_once_per_close() {
        let ast = parse(&["- a", "  - b", "", "- c"]);
        let Node::Document(children) = &ast else {
            panic!("expected a document");
        };
        assert_eq!(children.len(), 1);
        let Node::UnorderedList { tight, children, .. } = &children[0] else {
            panic!("expected an unordered list, got {:?}", children[0]);
        };
        // The inner list's trailing blank becomes the outer list's
        // evidence: outer loose, inner tight
        assert!(!*tight);
        let Node::ListItem(first_item) = &children[0] else {
            panic!("expected a list item");
        };
        let Node::UnorderedList {
            tight: inner_tight, ..
        } = &first_item[1]
        else {
            panic!("expected a nested list, got {:?}", first_item[1]);
        };
        assert!(*inner_tight);
    }
}
