//! Non-owning references to UI text boxes
//!
//! The visualization layer owns its text boxes. Session state only remembers
//! the id of the one the user focused, and asks the layer whether it still
//! exists before trusting it.

use std::collections::HashSet;
use std::fmt;

/// Id the visualization layer assigned to a text box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextBoxId(pub u64);

impl fmt::Display for TextBoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextBox#{}", self.0)
    }
}

/// Lookup into whatever owns the text boxes
pub trait TextBoxRegistry {
    fn contains_text_box(&self, id: TextBoxId) -> bool;
}

impl TextBoxRegistry for HashSet<TextBoxId> {
    fn contains_text_box(&self, id: TextBoxId) -> bool {
        self.contains(&id)
    }
}
