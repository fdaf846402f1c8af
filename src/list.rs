/// List block recognition: open, continue, and the loose/tight close pass
use crate::dispatch::{ConfigError, MarkerDispatch};
use crate::engine::BlockContext;
use crate::marker::{ListMarker, MarkerRecognizer};
use crate::scan::CODE_INDENT;
use crate::thematic::ThematicBreakRecognizer;
use crate::tree::{BlockData, BlockId, BlockTree, ListData, ListItemData};
use tracing::{debug, trace};

/// Outcome of an attempt to open a list item at the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStart {
    NoMatch,
    Continue,
}

/// Outcome of an attempt to extend or restructure an open list block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    /// The line does not extend this block; the engine tries other
    /// interpretations.
    NoMatch,
    /// The block absorbed the line (possibly opening new child blocks).
    Continue,
    /// Do not re-test this line against sibling recognizers; a nested
    /// open block will claim it.
    Skip,
    /// The block is closed; the line still needs processing.
    Terminate,
    /// The block is closed and the line is consumed.
    TerminateDiscard,
}

pub struct ListBlockController {
    dispatch: MarkerDispatch,
    thematic: ThematicBreakRecognizer,
}

impl ListBlockController {
    pub fn new() -> Self {
        Self::with_recognizers(vec![
            MarkerRecognizer::bulleted(),
            MarkerRecognizer::ordered(),
        ])
        .expect("built-in recognizers have disjoint trigger characters")
    }

    /// Build a controller over a custom recognizer set. Fails if two
    /// recognizers claim the same leading character.
    pub fn with_recognizers(recognizers: Vec<MarkerRecognizer>) -> Result<Self, ConfigError> {
        Ok(ListBlockController {
            dispatch: MarkerDispatch::build(recognizers)?,
            thematic: ThematicBreakRecognizer::default(),
        })
    }

    /// Try to start a list item at the current position.
    pub fn try_open(&self, ctx: &mut BlockContext) -> BlockStart {
        // A code-indented line can continue item content but can never
        // start a new list
        if ctx.is_code_indent() {
            return BlockStart::NoMatch;
        }
        if self.thematic_break_wins(ctx) {
            return BlockStart::NoMatch;
        }
        match self.parse_item(ctx, None) {
            BlockContinue::Continue => BlockStart::Continue,
            _ => BlockStart::NoMatch,
        }
    }

    /// Try to extend the open list or list item with the current line.
    pub fn try_continue(&self, ctx: &mut BlockContext, block: BlockId) -> BlockContinue {
        // An open list defers to its open item
        if ctx.tree().is_list(block)
            && let Some(next) = ctx.next_continue()
            && ctx.tree().is_list_item(next)
        {
            return BlockContinue::Skip;
        }
        // Thematic break takes precedence over any list interpretation;
        // the engine rebuilds it as a sibling of the list
        if self.thematic_break_wins(ctx) {
            return BlockContinue::NoMatch;
        }
        if ctx.tree().is_list_item(block) {
            self.continue_item(ctx, block)
        } else {
            // A list with no open item: only a sibling marker can extend it
            self.parse_item(ctx, Some(block))
        }
    }

    /// Run the loose/tight pass on a list that the engine is closing.
    pub fn close(&self, ctx: &mut BlockContext, block: BlockId) {
        finish_list(ctx.tree_mut(), block);
    }

    /// Probe for a thematic break at the cursor, discarding the
    /// speculative block it creates on success.
    fn thematic_break_wins(&self, ctx: &mut BlockContext) -> bool {
        let Some(ch) = ctx.current_char() else {
            return false;
        };
        if !self.thematic.has_opening_character(ch) {
            return false;
        }
        let saved = ctx.save();
        if self.thematic.try_open(ctx) {
            ctx.discard_new_blocks();
            ctx.restore(saved);
            true
        } else {
            ctx.restore(saved);
            false
        }
    }

    fn continue_item(&self, ctx: &mut BlockContext, item_id: BlockId) -> BlockContinue {
        let Some(list_id) = ctx.tree().parent(item_id) else {
            return BlockContinue::NoMatch;
        };
        if ctx.is_blank_line() {
            return self.continue_item_blank(ctx, item_id, list_id);
        }

        if let Some(list) = ctx.tree_mut().list_mut(list_id) {
            list.count_blank_lines_reset = 0;
        }
        let Some(item) = ctx.tree().list_item(item_id) else {
            return BlockContinue::NoMatch;
        };
        let width = item.required_columns;
        if ctx.indent() >= width {
            let content_column = ctx.column_before_indent() + width;
            if ctx.indent() > width && ctx.indent() - width >= CODE_INDENT {
                // The surplus is code-indentation-sized; leave it for the
                // content, e.g. a nested code block
                ctx.go_to_column(content_column);
            }
            ctx.restart_indent_at(content_column);
            if let Some(item) = ctx.tree_mut().list_item_mut(item_id)
                && item.pending_resolution
            {
                item.pending_resolution = false;
            }
            trace!(width, "list item continues");
            return BlockContinue::Continue;
        }

        // The line does not satisfy this item's indentation; it may still
        // be a new marker for this list or a sibling
        self.parse_item(ctx, Some(item_id))
    }

    fn continue_item_blank(
        &self,
        ctx: &mut BlockContext,
        item_id: BlockId,
        list_id: BlockId,
    ) -> BlockContinue {
        if ctx.innermost_breakable() {
            let next_is_list = ctx
                .next_continue()
                .is_some_and(|id| ctx.tree().is_list(id));
            if !next_is_list {
                // Record the blank as loose/tight evidence on the item;
                // when a nested list is about to take the line it records
                // the blank itself
                let marker = ctx.tree_mut().push_block(item_id, BlockData::BlankLine);
                ctx.tree_mut().node_mut(marker).is_open = false;
                if let Some(list) = ctx.tree_mut().list_mut(list_id) {
                    list.count_all_blank_lines += 1;
                }
            }
            if let Some(list) = ctx.tree_mut().list_mut(list_id) {
                list.count_blank_lines_reset += 1;
            }
        }

        let reset = match ctx.tree().list(list_id) {
            Some(list) => list.count_blank_lines_reset,
            None => return BlockContinue::NoMatch,
        };
        if reset > 1 {
            // Second consecutive blank line: the whole list terminates
            debug!("list terminated by two consecutive blank lines");
            ctx.close_block(list_id);
            return BlockContinue::TerminateDiscard;
        }
        let pending = ctx
            .tree()
            .list_item(item_id)
            .is_some_and(|item| item.pending_resolution);
        if reset == 1 && pending {
            // A blank right after a blank-start marker closes the item
            // but leaves the list open for a possible sibling
            ctx.close_block(item_id);
            return BlockContinue::Continue;
        }
        BlockContinue::Continue
    }

    /// The open algorithm: recognize a marker at the cursor and decide
    /// whether it extends the enclosing list or heads a sibling list.
    /// `open_block` is the list or list item currently open at this
    /// position, if any.
    fn parse_item(&self, ctx: &mut BlockContext, open_block: Option<BlockId>) -> BlockContinue {
        let saved = ctx.save();
        let initial_column = ctx.column();
        let column_before_indent = ctx.column_before_indent();

        let Some(first) = ctx.current_char() else {
            return BlockContinue::NoMatch;
        };
        let Some(recognizer) = self.dispatch.lookup(first) else {
            return BlockContinue::NoMatch;
        };
        let Some(marker) = recognizer.try_parse(ctx.scanner_mut()) else {
            ctx.restore(saved);
            return BlockContinue::NoMatch;
        };

        // Consume the bullet or delimiter character itself
        let after = ctx.advance();
        let item = match after {
            None => {
                // Marker at end of line: the true width stays unknown
                // until the next non-blank line
                ListItemData {
                    column: initial_column,
                    required_columns: ctx.column() - column_before_indent + 1,
                    pending_resolution: true,
                }
            }
            Some(ch) if ch == ' ' || ch == '\t' => {
                // Exactly one whitespace column belongs to the marker
                let content_start = ctx.column() + 1;
                ctx.go_to_column(content_start);
                ctx.restart_indent_at(content_start);
                ctx.parse_indent();
                if ctx.indent() >= CODE_INDENT {
                    // Indentation past the threshold belongs to the
                    // content, e.g. a code block on the item's first line
                    ctx.go_to_column(content_start);
                }
                ListItemData {
                    column: initial_column,
                    required_columns: ctx.column() - column_before_indent,
                    pending_resolution: false,
                }
            }
            Some(_) => {
                // A marker must be followed by whitespace or end of line
                ctx.restore(saved);
                return BlockContinue::NoMatch;
            }
        };

        // Decide whether the marker continues the enclosing list or
        // starts a sibling
        let mut parent_list: Option<BlockId> = None;
        if let Some(open) = open_block {
            let (open_item, enclosing_list) = if ctx.tree().is_list_item(open) {
                (Some(open), ctx.tree().parent(open))
            } else {
                (None, Some(open))
            };
            if let Some(open_item) = open_item {
                ctx.close_block(open_item);
            }
            if let Some(list_id) = enclosing_list {
                let same_shape = ctx
                    .tree()
                    .list(list_id)
                    .is_some_and(|list| list.shape == marker.shape());
                if same_shape {
                    parent_list = Some(list_id);
                } else {
                    // A different marker shape ends the current list; the
                    // new item heads a fresh sibling list
                    ctx.close_block(list_id);
                }
            }
        }

        if parent_list.is_none() {
            let (ordered_start, default_ordered_start) = match &marker {
                ListMarker::Ordered { start, .. } => {
                    (Some(start.clone()), Some("1".to_string()))
                }
                ListMarker::Bulleted { .. } => (None, None),
            };
            debug!(column = initial_column, ?marker, "opening list");
            ctx.push_new(BlockData::List(ListData {
                shape: marker.shape(),
                ordered_start,
                default_ordered_start,
                column: initial_column,
                is_loose: false,
                count_all_blank_lines: 0,
                count_blank_lines_reset: 0,
            }));
        }
        ctx.push_new(BlockData::ListItem(item));
        BlockContinue::Continue
    }
}

impl Default for ListBlockController {
    fn default() -> Self {
        Self::new()
    }
}

/// The loose/tight pass, run when a list is closed. Walks items and
/// their children in reverse document order, consuming the recorded
/// Blank-Line markers: a blank at the end of a non-final item, or a
/// strictly interior blank in an item with more than two children,
/// makes the list loose. The very last blank of the whole list is
/// handed up to the ancestor list item, if there is one, so the
/// ancestor's own close pass can account for it.
pub(crate) fn finish_list(tree: &mut BlockTree, list_id: BlockId) {
    let Some(list) = tree.list(list_id) else {
        return;
    };
    let mut remaining = list.count_all_blank_lines;
    if remaining == 0 {
        return;
    }
    let mut is_loose = false;
    let mut propagate = false;

    let items = tree.node(list_id).children.clone();
    let item_count = items.len();
    'items: for (item_index, &item_id) in items.iter().enumerate().rev() {
        let children = tree.node(item_id).children.clone();
        let child_count = children.len();
        // Accumulate removals and flags first, then commit the filtered
        // child sequence in one step
        let mut keep = vec![true; child_count];
        for child_index in (0..child_count).rev() {
            if !tree.is_blank_line(children[child_index]) {
                continue;
            }
            let last_child = child_index == child_count - 1;
            let interior = child_index > 0 && child_index < child_count - 1;
            if (last_child && item_index < item_count - 1) || (interior && child_count > 2) {
                is_loose = true;
            }
            if last_child && item_index == item_count - 1 {
                propagate = true;
            }
            keep[child_index] = false;
            remaining -= 1;
            if remaining == 0 {
                commit_children(tree, item_id, &children, &keep);
                break 'items;
            }
        }
        commit_children(tree, item_id, &children, &keep);
    }

    if let Some(list) = tree.list_mut(list_id) {
        if is_loose {
            list.is_loose = true;
        }
        list.count_all_blank_lines = remaining;
        debug!(loose = list.is_loose, "closed list");
    }

    if propagate
        && let Some(parent_item) = tree.parent(list_id).filter(|&id| tree.is_list_item(id))
        && let Some(parent_list) = tree.parent(parent_item).filter(|&id| tree.is_list(id))
    {
        // One blank line moves up one nesting level per close; chained
        // closes carry it the rest of the way
        let marker = tree.push_block(parent_item, BlockData::BlankLine);
        tree.node_mut(marker).is_open = false;
        if let Some(parent) = tree.list_mut(parent_list) {
            parent.count_all_blank_lines += 1;
        }
    }
}

fn commit_children(tree: &mut BlockTree, item_id: BlockId, children: &[BlockId], keep: &[bool]) {
    if keep.iter().all(|&k| k) {
        return;
    }
    let filtered = children
        .iter()
        .zip(keep.iter())
        .filter_map(|(&child, &k)| k.then_some(child))
        .collect();
    tree.node_mut(item_id).children = filtered;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::ListShape;
    use crate::tree::ParagraphData;

    fn new_list(tree: &mut BlockTree, parent: BlockId) -> BlockId {
        tree.push_block(
            parent,
            BlockData::List(ListData {
                shape: ListShape::Bulleted('-'),
                ordered_start: None,
                default_ordered_start: None,
                column: 0,
                is_loose: false,
                count_all_blank_lines: 0,
                count_blank_lines_reset: 0,
            }),
        )
    }

    fn new_item(tree: &mut BlockTree, list: BlockId) -> BlockId {
        tree.push_block(
            list,
            BlockData::ListItem(ListItemData {
                column: 0,
                required_columns: 2,
                pending_resolution: false,
            }),
        )
    }

    fn add_paragraph(tree: &mut BlockTree, item: BlockId) {
        tree.push_block(item, BlockData::Paragraph(ParagraphData::default()));
    }

    fn add_blank(tree: &mut BlockTree, list: BlockId, item: BlockId) {
        tree.push_block(item, BlockData::BlankLine);
        if let Some(list) = tree.list_mut(list) {
            list.count_all_blank_lines += 1;
        }
    }

    #[test]
    fn test_close_without_blank_lines_stays_tight() {
        let mut tree = BlockTree::new();
        let root = tree.root();
        let list = new_list(&mut tree, root);
        for _ in 0..2 {
            let item = new_item(&mut tree, list);
            add_paragraph(&mut tree, item);
        }
        finish_list(&mut tree, list);
        assert!(!tree.list(list).unwrap().is_loose);
    }

    #[test]
    fn test_blank_after_non_final_item_makes_list_loose() {
        let mut tree = BlockTree::new();
        let root = tree.root();
        let list = new_list(&mut tree, root);
        let first = new_item(&mut tree, list);
        add_paragraph(&mut tree, first);
        add_blank(&mut tree, list, first);
        let second = new_item(&mut tree, list);
        add_paragraph(&mut tree, second);

        finish_list(&mut tree, list);
        let data = tree.list(list).unwrap();
        assert!(data.is_loose);
        assert_eq!(data.count_all_blank_lines, 0);
        // The marker is consumed by the pass
        assert_eq!(tree.node(first).children.len(), 1);
    }

    #[test]
    fn test_interior_blank_with_multiple_blocks_makes_list_loose() {
        let mut tree = BlockTree::new();
        let root = tree.root();
        let list = new_list(&mut tree, root);
        let item = new_item(&mut tree, list);
        add_paragraph(&mut tree, item);
        add_blank(&mut tree, list, item);
        add_paragraph(&mut tree, item);

        finish_list(&mut tree, list);
        assert!(tree.list(list).unwrap().is_loose);
    }

    #[test]
    fn test_trailing_blank_of_last_item_does_not_make_list_loose() {
        let mut tree = BlockTree::new();
        let root = tree.root();
        let list = new_list(&mut tree, root);
        let item = new_item(&mut tree, list);
        add_paragraph(&mut tree, item);
        add_blank(&mut tree, list, item);

        finish_list(&mut tree, list);
        assert!(!tree.list(list).unwrap().is_loose);
    }

    #[test]
    fn test_trailing_blank_of_nested_list_moves_to_ancestor() {
        let mut tree = BlockTree::new();
        let root = tree.root();
        let outer = new_list(&mut tree, root);
        let outer_item = new_item(&mut tree, outer);
        add_paragraph(&mut tree, outer_item);
        let inner = new_list(&mut tree, outer_item);
        let inner_item = new_item(&mut tree, inner);
        add_paragraph(&mut tree, inner_item);
        add_blank(&mut tree, inner, inner_item);

        finish_list(&mut tree, inner);
        assert!(!tree.list(inner).unwrap().is_loose);
        // The blank line is now the outer item's evidence
        assert_eq!(tree.list(outer).unwrap().count_all_blank_lines, 1);
        let last = *tree.node(outer_item).children.last().unwrap();
        assert!(tree.is_blank_line(last));

        // The outer close pass consumes it in turn; the blank sits at the
        // end of the outer list's last item, so the outer list stays tight
        finish_list(&mut tree, outer);
        assert!(!tree.list(outer).unwrap().is_loose);
        assert_eq!(tree.list(outer).unwrap().count_all_blank_lines, 0);
    }
}
