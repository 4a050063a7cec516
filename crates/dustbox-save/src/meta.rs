//! Save metadata: online session info, origin stamps, and the authorship
//! tree.
//!
//! Authorship provenance travels with every save as a nested tree. Its
//! external representation is `serde_json::Value`; the codec converts it
//! to and from the document payload with depth and fan-out bounds so a
//! deeply nested remix chain cannot balloon the save.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::{Document, Node};

/// Online metadata for the currently open save, replaced only when the
/// caller asks for full session replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveInfo {
    pub save_opened: bool,
    pub file_opened: bool,
    pub save_name: String,
    pub file_name: String,
    pub published: bool,
    pub id: String,
    pub description: String,
    pub author: String,
    pub tags: String,
    pub my_vote: i32,
}

impl SaveInfo {
    pub(crate) fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.push_int("saveOpened", self.save_opened as i32);
        doc.push_int("fileOpened", self.file_opened as i32);
        doc.push_str("saveName", &self.save_name);
        doc.push_str("fileName", &self.file_name);
        doc.push_int("published", self.published as i32);
        doc.push_str("ID", &self.id);
        doc.push_str("description", &self.description);
        doc.push_str("author", &self.author);
        doc.push_str("tags", &self.tags);
        doc.push_int("myVote", self.my_vote);
        doc
    }

    pub(crate) fn from_document(doc: &Document) -> SaveInfo {
        SaveInfo {
            save_opened: doc.int_of("saveOpened").unwrap_or(0) != 0,
            file_opened: doc.int_of("fileOpened").unwrap_or(0) != 0,
            save_name: doc.str_of("saveName").unwrap_or("").to_string(),
            file_name: doc.str_of("fileName").unwrap_or("").to_string(),
            published: doc.int_of("published").unwrap_or(0) != 0,
            id: doc.str_of("ID").unwrap_or("").to_string(),
            description: doc.str_of("description").unwrap_or("").to_string(),
            author: doc.str_of("author").unwrap_or("").to_string(),
            tags: doc.str_of("tags").unwrap_or("").to_string(),
            my_vote: doc.int_of("myVote").unwrap_or(0),
        }
    }
}

/// Fan-out cap per nesting level of the authors tree.
fn link_cap(depth: u32) -> usize {
    (40 / ((depth + 1) * (depth + 1))) as usize
}

/// Collect every save ID reachable in a JSON subtree: `id` members plus
/// integer array elements.
fn nested_save_ids(value: &Value, out: &mut BTreeSet<i64>) {
    let Value::Object(map) = value else { return };
    for (key, member) in map {
        if key == "id" {
            if let Some(id) = member.as_i64() {
                out.insert(id);
            }
        } else if let Value::Array(items) = member {
            for item in items {
                match item {
                    Value::Number(n) => {
                        if let Some(id) = n.as_i64() {
                            out.insert(id);
                        }
                    }
                    Value::Object(_) => nested_save_ids(item, out),
                    _ => {}
                }
            }
        }
    }
}

/// Convert the external authors tree to document form.
pub fn authors_to_document(value: &Value) -> Document {
    authors_to_document_inner(value, 0)
}

fn authors_to_document_inner(value: &Value, depth: u32) -> Document {
    let mut doc = Document::new();
    let Value::Object(map) = value else {
        return doc;
    };
    for (key, member) in map {
        match member {
            Value::String(s) => doc.push_str(key, s),
            Value::Bool(b) => doc.push_bool(key, *b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if let Ok(small) = i32::try_from(i) {
                        doc.push_int(key, small);
                    } else {
                        doc.push_long(key, i);
                    }
                }
            }
            Value::Array(items) => {
                let mut arr = Document::new();
                let mut save_ids = BTreeSet::new();
                let mut length = 0usize;
                for item in items {
                    match item {
                        Value::Number(n) => {
                            if let Some(id) = n.as_i64() {
                                save_ids.insert(id);
                            }
                        }
                        Value::Object(_) => {
                            // Past the caps, flatten a remix subtree to
                            // its bare save IDs.
                            if depth > 4 || length > link_cap(depth) {
                                nested_save_ids(item, &mut save_ids);
                            } else {
                                arr.push(
                                    "part",
                                    Node::Object(authors_to_document_inner(item, depth + 1)),
                                );
                            }
                            length += 1;
                        }
                        _ => {}
                    }
                }
                for id in save_ids {
                    if let Ok(small) = i32::try_from(id) {
                        arr.push_int("saveID", small);
                    }
                }
                doc.push(key, Node::Array(arr));
            }
            _ => {}
        }
    }
    doc
}

/// Convert a decoded authors document back to the external tree.
pub fn document_to_authors(doc: &Document) -> Value {
    document_to_authors_inner(doc, 0)
}

fn document_to_authors_inner(doc: &Document, depth: u32) -> Value {
    let mut map = serde_json::Map::new();
    for (key, node) in doc.entries() {
        match node {
            Node::Str(s) => {
                map.insert(key.to_string(), Value::String(s.clone()));
            }
            Node::Bool(b) => {
                map.insert(key.to_string(), Value::Bool(*b));
            }
            Node::Int(i) => {
                map.insert(key.to_string(), Value::from(*i));
            }
            Node::Long(l) => {
                map.insert(key.to_string(), Value::from(*l));
            }
            Node::Array(arr) if depth < 5 => {
                let mut links = Vec::new();
                let mut length = 0usize;
                let mut total = 0usize;
                for (akey, anode) in arr.entries() {
                    match anode {
                        Node::Object(part) if akey == "part" => {
                            links.push(document_to_authors_inner(part, depth + 1));
                            length += 1;
                        }
                        Node::Int(id) if akey == "saveID" => {
                            links.push(Value::from(*id));
                        }
                        _ => {}
                    }
                    total += 1;
                    if length > link_cap(depth) || total > 50 {
                        break;
                    }
                }
                map.insert("links".to_string(), Value::Array(links));
            }
            _ => {}
        }
    }
    Value::Object(map)
}
