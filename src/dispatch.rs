/// Dispatch table mapping a line's first character to a marker recognizer
use crate::marker::MarkerRecognizer;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("marker character '{0}' is claimed by more than one recognizer")]
    DuplicateTrigger(char),
}

/// Built once from the registered recognizers; lookup by first character
/// is a single hash probe.
pub struct MarkerDispatch {
    recognizers: Vec<MarkerRecognizer>,
    by_char: HashMap<char, usize>,
}

impl MarkerDispatch {
    pub fn build(recognizers: Vec<MarkerRecognizer>) -> Result<Self, ConfigError> {
        let mut by_char = HashMap::new();
        for (index, recognizer) in recognizers.iter().enumerate() {
            for ch in recognizer.trigger_chars() {
                if by_char.insert(ch, index).is_some() {
                    return Err(ConfigError::DuplicateTrigger(ch));
                }
            }
        }
        Ok(MarkerDispatch {
            recognizers,
            by_char,
        })
    }

    pub fn lookup(&self, ch: char) -> Option<&MarkerRecognizer> {
        self.by_char.get(&ch).map(|&index| &self.recognizers[index])
    }
}
