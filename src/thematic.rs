/// Thematic break recognition
///
/// Lists consult this recognizer before claiming a line, because `-` and
/// `*` can open either construct; a valid thematic break always wins.
use crate::engine::BlockContext;
use crate::tree::BlockData;

pub struct ThematicBreakRecognizer {
    break_chars: Vec<char>,
}

impl Default for ThematicBreakRecognizer {
    fn default() -> Self {
        ThematicBreakRecognizer {
            break_chars: vec!['-', '_', '*'],
        }
    }
}

impl ThematicBreakRecognizer {
    pub fn has_opening_character(&self, ch: char) -> bool {
        self.break_chars.contains(&ch)
    }

    /// Try to open a thematic break at the cursor. On success the rest of
    /// the line is consumed and a speculative block is pushed; a caller
    /// running this purely as a precedence check discards that block and
    /// restores the cursor.
    pub fn try_open(&self, ctx: &mut BlockContext) -> bool {
        if ctx.is_code_indent() {
            return false;
        }
        let Some(first) = ctx.current_char() else {
            return false;
        };
        if !self.has_opening_character(first) {
            return false;
        }

        // Three or more of the same character, with only spaces and tabs
        // in between, through the end of the line
        let mut count = 0;
        for ch in ctx.rest().chars() {
            if ch == first {
                count += 1;
            } else if ch != ' ' && ch != '\t' {
                return false;
            }
        }
        if count < 3 {
            return false;
        }

        ctx.skip_to_end_of_line();
        ctx.push_new(BlockData::ThematicBreak);
        true
    }
}
