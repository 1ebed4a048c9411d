//! Fixtures shared by unit tests across the crate

use crate::models::{Item, Question};

pub fn item(name: &str, checked: bool, note: &str) -> Item {
    Item {
        name: name.to_string(),
        checked,
        note: note.to_string(),
        ..Item::default()
    }
}

pub fn question(text: &str, items: Vec<Item>) -> Question {
    Question {
        text: text.to_string(),
        items,
        ..Question::default()
    }
}
