//! Collection names, field names and the value types derived from them.

use serde_json::Value;

use crate::document_store::Document;

pub const USERS_COLLECTION: &str = "users";
pub const MESSAGES_COLLECTION: &str = "messages";

/// Boolean read flag on message documents.
pub const READ_FIELD: &str = "read";
/// Message body on message documents.
pub const TEXT_FIELD: &str = "message";
/// Decoration preference on user documents.
pub const SUFFIX_FIELD: &str = "suffixType";

/// Read state of a message, derived from its `read` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// No `read` field yet. Predates read tracking.
    Unset,
    Unread,
    Read,
}

impl ReadState {
    /// Anything other than a literal `true` counts as unread, matching the
    /// not-equal-to-true selection.
    pub fn of(doc: &Document) -> Self {
        match doc.field(READ_FIELD) {
            None => ReadState::Unset,
            Some(Value::Bool(true)) => ReadState::Read,
            Some(_) => ReadState::Unread,
        }
    }
}

/// A user's decoration preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixCode {
    Cat,
    Dog,
    Character,
}

impl SuffixCode {
    pub const ALL: [SuffixCode; 3] = [SuffixCode::Cat, SuffixCode::Dog, SuffixCode::Character];

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "cat" => Some(SuffixCode::Cat),
            "dog" => Some(SuffixCode::Dog),
            "character" => Some(SuffixCode::Character),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SuffixCode::Cat => "cat",
            SuffixCode::Dog => "dog",
            SuffixCode::Character => "character",
        }
    }

    /// Text appended to every message delivered to a user with this code.
    pub fn suffix(self) -> &'static str {
        match self {
            SuffixCode::Cat => "nyan",
            SuffixCode::Dog => "woof",
            SuffixCode::Character => "yo",
        }
    }
}

/// Message body, if present and a string.
pub fn message_text(doc: &Document) -> Option<&str> {
    doc.field(TEXT_FIELD).and_then(Value::as_str)
}
