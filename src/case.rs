//! Naming conventions: default collection/item names and hook setter names.

use crate::hooks::{Operation, Phase};

/// Upper-case the first character, leave the rest untouched.
/// e.g. "books" -> "Books", "bookCase" -> "BookCase"
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Default item name: the model name lower-cased. e.g. "Book" -> "book"
pub fn default_item_name(model_name: &str) -> String {
    model_name.to_lowercase()
}

/// Default collection name: the model name lower-cased plus "s". e.g. "Book" -> "books"
pub fn default_collection_name(model_name: &str) -> String {
    format!("{}s", model_name.to_lowercase())
}

/// Conventional setter name for one (phase, operation) pair.
/// The collection listing uses the collection name, every other operation the item name.
/// e.g. (Before, GetCollection) on books/book -> "beforeGetBooks"
pub fn hook_setter_name(phase: Phase, operation: Operation, collection_name: &str, item_name: &str) -> String {
    let noun = match operation {
        Operation::GetCollection => collection_name,
        _ => item_name,
    };
    format!("{}{}{}", phase.as_str(), operation.verb(), capitalize(noun))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_handles_empty_and_unicode() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("books"), "Books");
        assert_eq!(capitalize("éclair"), "Éclair");
    }

    #[test]
    fn defaults_lower_case_the_model_name() {
        assert_eq!(default_collection_name("BookCase"), "bookcases");
        assert_eq!(default_item_name("BookCase"), "bookcase");
    }

    #[test]
    fn setter_names_follow_convention() {
        assert_eq!(
            hook_setter_name(Phase::Before, Operation::GetCollection, "books", "book"),
            "beforeGetBooks"
        );
        assert_eq!(hook_setter_name(Phase::After, Operation::GetItem, "books", "book"), "afterGetBook");
        assert_eq!(
            hook_setter_name(Phase::Before, Operation::CreateItem, "books", "book"),
            "beforeCreateBook"
        );
        assert_eq!(
            hook_setter_name(Phase::After, Operation::UpdateItem, "books", "book"),
            "afterUpdateBook"
        );
        assert_eq!(
            hook_setter_name(Phase::Before, Operation::DeleteItem, "people", "person"),
            "beforeDeletePerson"
        );
    }
}
