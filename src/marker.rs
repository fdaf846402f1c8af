/// List marker recognition: bullets and ordered-list numbers
use crate::scan::LineScanner;

/// Ordered-list start numbers are at most 9 digits (CommonMark constraint).
const MAX_ORDERED_DIGITS: usize = 9;

/// The shape of a list, used to decide whether a new marker continues the
/// current list or starts a sibling. Carries the bullet character for
/// bulleted lists and the delimiter character for ordered lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    Bulleted(char),
    Ordered(char),
}

/// A successfully recognized marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMarker {
    Bulleted {
        bullet: char,
    },
    Ordered {
        /// Literal start value, leading zeros trimmed ("007" -> "7",
        /// "0000" -> "0").
        start: String,
        delimiter: char,
    },
}

impl ListMarker {
    pub fn shape(&self) -> ListShape {
        match self {
            ListMarker::Bulleted { bullet } => ListShape::Bulleted(*bullet),
            ListMarker::Ordered { delimiter, .. } => ListShape::Ordered(*delimiter),
        }
    }
}

/// Recognizes a single bullet character from a fixed alphabet.
#[derive(Debug, Clone)]
pub struct BulletedMarker {
    bullets: Vec<char>,
}

impl Default for BulletedMarker {
    fn default() -> Self {
        BulletedMarker {
            bullets: vec!['-', '+', '*'],
        }
    }
}

/// Recognizes a run of decimal digits followed by a delimiter.
#[derive(Debug, Clone)]
pub struct OrderedMarker {
    delimiters: Vec<char>,
}

impl Default for OrderedMarker {
    fn default() -> Self {
        OrderedMarker {
            delimiters: vec!['.', ')'],
        }
    }
}

/// The two built-in marker recognizers as a closed set. Each variant
/// carries its own character alphabet.
#[derive(Debug, Clone)]
pub enum MarkerRecognizer {
    Bulleted(BulletedMarker),
    Ordered(OrderedMarker),
}

impl MarkerRecognizer {
    pub fn bulleted() -> Self {
        MarkerRecognizer::Bulleted(BulletedMarker::default())
    }

    pub fn ordered() -> Self {
        MarkerRecognizer::Ordered(OrderedMarker::default())
    }

    /// The leading characters this recognizer claims ownership of.
    pub fn trigger_chars(&self) -> Vec<char> {
        match self {
            MarkerRecognizer::Bulleted(b) => b.bullets.clone(),
            MarkerRecognizer::Ordered(_) => ('0'..='9').collect(),
        }
    }

    /// Try to recognize a marker at the cursor. On success the cursor is
    /// left on the bullet or delimiter character, which the caller
    /// consumes. On failure the cursor is left wherever the attempt
    /// stopped; the caller must restore it.
    pub fn try_parse(&self, scan: &mut LineScanner) -> Option<ListMarker> {
        match self {
            MarkerRecognizer::Bulleted(b) => b.try_parse(scan),
            MarkerRecognizer::Ordered(o) => o.try_parse(scan),
        }
    }
}

impl BulletedMarker {
    fn try_parse(&self, scan: &mut LineScanner) -> Option<ListMarker> {
        let ch = scan.current_char()?;
        if self.bullets.contains(&ch) {
            Some(ListMarker::Bulleted { bullet: ch })
        } else {
            None
        }
    }
}

impl OrderedMarker {
    fn try_parse(&self, scan: &mut LineScanner) -> Option<ListMarker> {
        let mut digits = String::new();
        // Byte offset within `digits` of the first non-zero digit
        let mut start_char: Option<usize> = None;

        while let Some(ch) = scan.current_char() {
            if !ch.is_ascii_digit() {
                break;
            }
            if ch != '0' && start_char.is_none() {
                start_char = Some(digits.len());
            }
            digits.push(ch);
            if digits.len() > MAX_ORDERED_DIGITS {
                return None;
            }
            scan.advance();
        }
        if digits.is_empty() {
            return None;
        }

        // The digit run must be followed by one of the configured delimiters
        let delimiter = scan.current_char()?;
        if !self.delimiters.contains(&delimiter) {
            return None;
        }

        // Trim leading zeros; an all-zero run keeps its last digit
        let start = match start_char {
            Some(offset) => digits[offset..].to_string(),
            None => digits[digits.len() - 1..].to_string(),
        };
        Some(ListMarker::Ordered { start, delimiter })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn parse_ordered(input: &str) -> Option<ListMarker> {
        let mut scan = LineScanner::new(input);
        MarkerRecognizer::ordered().try_parse(&mut scan)
    }

    #[rstest]
    #[case('-')]
    #[case('+')]
    #[case('*')]
    fn test_bullet_characters(#[case] bullet: char) {
        let line = format!("{} item", bullet);
        let mut scan = LineScanner::new(&line);
        let marker = MarkerRecognizer::bulleted().try_parse(&mut scan);
        assert_eq!(marker, Some(ListMarker::Bulleted { bullet }));
        // Cursor stays on the bullet; the caller consumes it
        assert_eq!(scan.current_char(), Some(bullet));
    }

    #[test]
    fn test_bullet_rejects_other_characters() {
        let mut scan = LineScanner::new("> quote");
        assert_eq!(MarkerRecognizer::bulleted().try_parse(&mut scan), None);
    }

    #[rstest]
    #[case("1. x", "1", '.')]
    #[case("7) x", "7", ')')]
    #[case("007. x", "7", '.')]
    #[case("0000. x", "0", '.')]
    #[case("123456789. x", "123456789", '.')]
    fn test_ordered_markers(#[case] input: &str, #[case] start: &str, #[case] delimiter: char) {
        assert_eq!(
            parse_ordered(input),
            Some(ListMarker::Ordered {
                start: start.to_string(),
                delimiter,
            })
        );
    }

    #[test]
    fn test_ordered_cursor_left_on_delimiter() {
        let mut scan = LineScanner::new("12. x");
        MarkerRecognizer::ordered().try_parse(&mut scan);
        assert_eq!(scan.current_char(), Some('.'));
        assert_eq!(scan.column(), 2);
    }

    #[test]
    fn test_ten_digits_fail() {
        assert_eq!(parse_ordered("1234567890. x"), None);
    }

    #[test]
    fn test_missing_delimiter_fails() {
        assert_eq!(parse_ordered("12 x"), None);
        assert_eq!(parse_ordered("12"), None);
    }

    #[test]
    fn test_shape_equality() {
        let dot = parse_ordered("3. x").unwrap();
        let paren = parse_ordered("3) x").unwrap();
        assert_ne!(dot.shape(), paren.shape());
        assert_ne!(
            dot.shape(),
            ListMarker::Bulleted { bullet: '-' }.shape()
        );
    }

    proptest! {
        #[test]
        fn prop_digit_runs_up_to_nine_succeed(value in "[0-9]{1,9}") {
            let line = format!("{}. x", value);
            let marker = parse_ordered(&line).expect("digit runs of 1-9 must parse");
            let expected = match value.find(|c| c != '0') {
                Some(offset) => &value[offset..],
                None => "0",
            };
            prop_assert_eq!(
                marker,
                ListMarker::Ordered { start: expected.to_string(), delimiter: '.' }
            );
        }

        #[test]
        fn prop_digit_runs_of_ten_or_more_fail(value in "[0-9]{10,12}", delim in "[.)]") {
            let line = format!("{}{} x", value, delim);
            prop_assert_eq!(parse_ordered(&line), None);
        }
    }
}
