//! Document extraction
//!
//! Each archive entry is expected to look like:
//!
//! ```xml
//! <root>
//!   <var name="id" value="..."/>
//!   <var name="level" value="..."/>
//!   <objects>
//!     <object name="..."/>
//!   </objects>
//! </root>
//! ```

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an entry could not be turned into a document tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid UTF-8: {0}")]
    Encoding(String),

    #[error("{0}")]
    Malformed(String),
}

/// Fields extracted from one XML entry of an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Archive-internal path of the entry
    pub entry_name: String,
    pub id: Option<String>,
    pub level: Option<String>,
    /// Names of all `<object>` elements, in document order
    pub object_ids: Vec<String>,
}

impl DocumentResult {
    pub fn new(entry_name: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            id: None,
            level: None,
            object_ids: Vec::new(),
        }
    }

    /// A document is valid when id, level and object list are all non-empty.
    ///
    /// A document without objects is invalid.
    pub fn is_valid(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
            && self.level.as_deref().is_some_and(|level| !level.is_empty())
            && !self.object_ids.is_empty()
    }
}

/// Parse one archive entry.
///
/// Returns `Err` only when the payload is not a well-formed XML tree. Missing
/// fields produce a `DocumentResult` that fails `is_valid`.
pub fn extract_document(entry_name: &str, bytes: &[u8]) -> Result<DocumentResult, ExtractError> {
    let xml = std::str::from_utf8(bytes).map_err(|e| ExtractError::Encoding(e.to_string()))?;
    let document = Document::parse(xml).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let root = document.root_element();
    let mut result = DocumentResult::new(entry_name);
    result.id = var_value(root, "id");
    result.level = var_value(root, "level");
    result.object_ids = root
        .descendants()
        .filter(|node| node.has_tag_name("object"))
        // Nameless objects yield no row at all, not an `id;None` placeholder row
        .filter_map(|node| node.attribute("name"))
        .map(str::to_string)
        .collect();

    Ok(result)
}

/// Value of the first `<var name="{name}">` below `root`
fn var_value(root: Node<'_, '_>, name: &str) -> Option<String> {
    root.descendants()
        .find(|node| node.has_tag_name("var") && node.attribute("name") == Some(name))
        .and_then(|node| node.attribute("value"))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
