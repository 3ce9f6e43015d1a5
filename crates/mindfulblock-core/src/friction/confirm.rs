//! Typed confirmation for destructive rule/group changes.
//!
//! The user must type a sentence naming the exact domain or group. Only
//! keystrokes count: pasted text is refused and leaves the field as it was.

use serde::{Deserialize, Serialize};

use crate::language::Language;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DestructiveAction {
    DeleteRule { domain: String },
    DisableRule { domain: String },
    DeleteGroup { name: String },
    DisableGroup { name: String },
}

impl DestructiveAction {
    /// The sentence the user has to reproduce.
    pub fn sentence(&self, language: Language) -> String {
        match (self, language) {
            (DestructiveAction::DeleteRule { domain }, Language::En) => {
                format!("I confirm deleting the rule for {domain}")
            }
            (DestructiveAction::DeleteRule { domain }, Language::Vi) => {
                format!("Tôi xác nhận xóa quy tắc chặn {domain}")
            }
            (DestructiveAction::DisableRule { domain }, Language::En) => {
                format!("I confirm disabling the rule for {domain}")
            }
            (DestructiveAction::DisableRule { domain }, Language::Vi) => {
                format!("Tôi xác nhận tắt quy tắc chặn {domain}")
            }
            (DestructiveAction::DeleteGroup { name }, Language::En) => {
                format!("I confirm deleting the group {name} and all its rules")
            }
            (DestructiveAction::DeleteGroup { name }, Language::Vi) => {
                format!("Tôi xác nhận xóa nhóm {name} và toàn bộ quy tắc")
            }
            (DestructiveAction::DisableGroup { name }, Language::En) => {
                format!("I confirm disabling the group {name}")
            }
            (DestructiveAction::DisableGroup { name }, Language::Vi) => {
                format!("Tôi xác nhận tắt nhóm {name}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    Typed,
    Pasted,
}

#[derive(Debug, Clone)]
pub struct ConfirmationPrompt {
    action: DestructiveAction,
    sentence: String,
    input: String,
}

impl ConfirmationPrompt {
    pub fn new(action: DestructiveAction, language: Language) -> Self {
        let sentence = action.sentence(language);
        Self {
            action,
            sentence,
            input: String::new(),
        }
    }

    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    pub fn action(&self) -> &DestructiveAction {
        &self.action
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the field contents. Returns false (and keeps the old
    /// contents) when the change came from a paste.
    pub fn set_input(&mut self, text: &str, method: InputMethod) -> bool {
        match method {
            InputMethod::Pasted => false,
            InputMethod::Typed => {
                self.input = text.to_string();
                true
            }
        }
    }

    /// Exact, case-sensitive match with no trimming.
    pub fn can_confirm(&self) -> bool {
        self.input == self.sentence
    }

    /// Consume the prompt, yielding the action if the sentence matches.
    pub fn confirm(self) -> Option<DestructiveAction> {
        if self.can_confirm() {
            Some(self.action)
        } else {
            None
        }
    }
}
