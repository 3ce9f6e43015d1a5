//! UI language and the fixed phrases the core needs.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Vi,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
        }
    }

    /// Parse a language code. Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "vi" => Language::Vi,
            _ => Language::En,
        }
    }

    /// Phrase a user must retype to pass a typing challenge.
    pub fn typing_phrase(self) -> &'static str {
        match self {
            Language::Vi => "Tôi chọn sự xao nhãng thay vì mục tiêu của mình",
            Language::En => "I choose distraction over my goals",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Vi
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
