//! Documents and collaborators as exchanged with the document store

use serde::{Deserialize, Serialize};

use super::codec::{self, Decoded};

/// Identifier of a stored document
pub type DocumentId = String;

/// Title used when a document has none
pub const UNTITLED: &str = "Untitled Document";

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Serialized content; empty for a freshly created document
    #[serde(default)]
    pub content: String,
    /// Seconds since the epoch
    #[serde(default)]
    pub created_at: f64,
    /// Seconds since the epoch
    #[serde(default)]
    pub updated_at: f64,
    /// Number of collaborators on the document
    #[serde(default)]
    pub collaborators: usize,
}

impl Document {
    /// Create a new empty document
    pub fn new(id: impl Into<DocumentId>, title: impl Into<String>, timestamp: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            created_at: timestamp,
            updated_at: timestamp,
            collaborators: 0,
        }
    }

    /// Get the document title, falling back to a placeholder
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// Decode the stored content
    pub fn decode_content(&self) -> Decoded {
        codec::decode(&self.content)
    }

    /// Overwrite this document with a newer copy from the store. The last
    /// copy applied wins; nothing is merged field by field.
    pub fn apply_response(&mut self, newer: &Document) {
        if self.id != newer.id {
            return;
        }
        *self = newer.clone();
    }
}

/// Partial update sent to the store. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DocumentUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            title: None,
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            content: None,
            title: Some(title.into()),
        }
    }
}

/// A user present on a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: u32,
    pub name: String,
    /// CSS hex color, e.g. `#FF6B6B`
    pub color: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<usize>,
}

impl Collaborator {
    pub fn new(id: u32, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            active: false,
            cursor_position: None,
        }
    }
}

/// A link granting access to a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    #[serde(rename = "share_link")]
    pub url: String,
    pub document_id: DocumentId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_serializes_only_present_fields() {
        let json = serde_json::to_string(&DocumentUpdate::title("Notes")).unwrap();
        assert_eq!(json, r#"{"title":"Notes"}"#);
    }

    #[test]
    fn test_document_from_store_json() {
        let json = r#"{"id":"abc","title":"","content":"","created_at":1.5,"updated_at":2.5}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.display_title(), UNTITLED);
        assert_eq!(doc.collaborators, 0);
        let decoded = doc.decode_content();
        assert!(decoded.warning.is_none());
    }

    #[test]
    fn test_apply_response_ignores_other_documents() {
        let mut doc = Document::new("a", "First", 1.0);
        let mut other = Document::new("b", "Second", 2.0);
        doc.apply_response(&other);
        assert_eq!(doc.title, "First");

        other.id = "a".to_string();
        doc.apply_response(&other);
        assert_eq!(doc.title, "Second");
        assert_eq!(doc.updated_at, 2.0);
    }

    #[test]
    fn test_share_link_wire_name() {
        let link: ShareLink =
            serde_json::from_str(r#"{"share_link":"http://host/document/a","document_id":"a"}"#).unwrap();
        assert_eq!(link.url, "http://host/document/a");
    }
}
