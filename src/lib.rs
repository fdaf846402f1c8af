/// Incremental list-block recognition for line-oriented block parsers
pub mod ast;
pub mod dispatch;
pub mod engine;
pub mod list;
pub mod marker;
pub mod scan;
pub mod thematic;
pub mod tree;

pub use ast::Node;
pub use dispatch::ConfigError;
pub use engine::BlockParser;
pub use list::{BlockContinue, BlockStart, ListBlockController};
pub use marker::{ListMarker, MarkerRecognizer};

/// Parse input into its block structure, one line at a time.
pub fn parse_blocks(input: &str) -> Node {
    let mut parser = BlockParser::new();
    for line in input.lines() {
        parser.process_line(line);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_blocks(""), Node::Document(vec![]));
    }

    #[test]
    fn test_basic_list() {
        let ast = parse_blocks("- a\n- b\n");
        assert_eq!(
            ast,
            Node::Document(vec![Node::UnorderedList {
                bullet: '-',
                tight: true,
                children: vec![
                    Node::ListItem(vec![Node::Paragraph("a".to_string())]),
                    Node::ListItem(vec![Node::Paragraph("b".to_string())]),
                ],
            }])
        );
    }

    #[test]
    fn test_ordered_list_keeps_start_and_delimiter() {
        let ast = parse_blocks("7) seven\n8) eight\n");
        assert_eq!(
            ast,
            Node::Document(vec![Node::OrderedList {
                start: 7,
                delimiter: ')',
                tight: true,
                children: vec![
                    Node::ListItem(vec![Node::Paragraph("seven".to_string())]),
                    Node::ListItem(vec![Node::Paragraph("eight".to_string())]),
                ],
            }])
        );
    }
}
