//! Ordered nested-document binary encoding.
//!
//! The self-describing container stores its payload as a flat ordered list
//! of key -> node entries, where a node is a scalar leaf (bool, 32-bit
//! int, 64-bit long, string, binary blob) or a nested ordered list
//! (object or array). Every entry is framed as
//!
//! ```text
//! tag (1) | key length (1) | key bytes | payload length (4, LE) | payload
//! ```
//!
//! so readers skip unknown tags cleanly -- the basis of the format's
//! forward compatibility.

use crate::cursor::{Reader, Writer};
use crate::error::DecodeError;

const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_LONG: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_BINARY: u8 = 0x05;
const TAG_OBJECT: u8 = 0x06;
const TAG_ARRAY: u8 = 0x07;

/// Nesting depth cap. Deeper structures are treated as corrupt.
const MAX_DEPTH: u32 = 32;

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Bool(bool),
    Int(i32),
    Long(i64),
    Str(String),
    Binary(Vec<u8>),
    Object(Document),
    Array(Document),
}

/// An ordered list of key -> node entries. Duplicate keys are allowed
/// (arrays use the key as an element label).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Node)>,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    /// First entry with the given key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, n)| n)
    }

    pub fn push(&mut self, key: &str, node: Node) {
        self.entries.push((key.to_string(), node));
    }

    pub fn push_bool(&mut self, key: &str, v: bool) {
        self.push(key, Node::Bool(v));
    }

    pub fn push_int(&mut self, key: &str, v: i32) {
        self.push(key, Node::Int(v));
    }

    pub fn push_long(&mut self, key: &str, v: i64) {
        self.push(key, Node::Long(v));
    }

    pub fn push_str(&mut self, key: &str, v: &str) {
        self.push(key, Node::Str(v.to_string()));
    }

    pub fn push_binary(&mut self, key: &str, v: Vec<u8>) {
        self.push(key, Node::Binary(v));
    }

    // -- Typed getters. A key of the wrong type reads as absent; callers
    // -- substitute defaults per the leniency policy.

    pub fn bool_of(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(Node::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int_of(&self, key: &str) -> Option<i32> {
        match self.get(key) {
            Some(Node::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str_of(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Node::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn binary_of(&self, key: &str) -> Option<&[u8]> {
        match self.get(key) {
            Some(Node::Binary(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn object_of(&self, key: &str) -> Option<&Document> {
        match self.get(key) {
            Some(Node::Object(v)) => Some(v),
            _ => None,
        }
    }

    pub fn array_of(&self, key: &str) -> Option<&Document> {
        match self.get(key) {
            Some(Node::Array(v)) => Some(v),
            _ => None,
        }
    }

    // -- Wire form --

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode_into(&mut w);
        w.into_vec()
    }

    fn encode_into(&self, w: &mut Writer) {
        for (key, node) in &self.entries {
            // Keys longer than a length byte are truncated, not rejected.
            let key_bytes = &key.as_bytes()[..key.len().min(255)];
            let (tag, payload) = encode_node(node);
            w.push_u8(tag);
            w.push_u8(key_bytes.len() as u8);
            w.extend(key_bytes);
            w.push_u32le(payload.len() as u32);
            w.extend(&payload);
        }
    }

    pub fn decode(data: &[u8]) -> Result<Document, DecodeError> {
        let mut r = Reader::new(data);
        Self::decode_entries(&mut r, data.len(), 0)
    }

    fn decode_entries(
        r: &mut Reader<'_>,
        end: usize,
        depth: u32,
    ) -> Result<Document, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::Truncated);
        }
        let mut doc = Document::new();
        while r.pos() < end {
            let tag = r.read_u8()?;
            let key_len = r.read_u8()? as usize;
            let key = String::from_utf8_lossy(r.take(key_len)?).into_owned();
            let payload_len = r.read_u32le()? as usize;
            let payload_end = r
                .pos()
                .checked_add(payload_len)
                .ok_or(DecodeError::Truncated)?;
            if payload_end > end {
                return Err(DecodeError::Truncated);
            }
            let node = match tag {
                TAG_BOOL => {
                    if payload_len != 1 {
                        return Err(DecodeError::Truncated);
                    }
                    Some(Node::Bool(r.read_u8()? != 0))
                }
                TAG_INT => {
                    if payload_len != 4 {
                        return Err(DecodeError::Truncated);
                    }
                    Some(Node::Int(r.read_u32le()? as i32))
                }
                TAG_LONG => {
                    if payload_len != 8 {
                        return Err(DecodeError::Truncated);
                    }
                    let lo = r.read_u32le()? as u64;
                    let hi = r.read_u32le()? as u64;
                    Some(Node::Long((lo | (hi << 32)) as i64))
                }
                TAG_STRING => Some(Node::Str(
                    String::from_utf8_lossy(r.take(payload_len)?).into_owned(),
                )),
                TAG_BINARY => Some(Node::Binary(r.take(payload_len)?.to_vec())),
                TAG_OBJECT => Some(Node::Object(Self::decode_entries(
                    r,
                    payload_end,
                    depth + 1,
                )?)),
                TAG_ARRAY => Some(Node::Array(Self::decode_entries(
                    r,
                    payload_end,
                    depth + 1,
                )?)),
                other => {
                    log::debug!("skipping unknown document node tag {other:#04x} ({key})");
                    r.skip(payload_len)?;
                    None
                }
            };
            if let Some(node) = node {
                if r.pos() != payload_end {
                    return Err(DecodeError::Truncated);
                }
                doc.push(&key, node);
            }
        }
        Ok(doc)
    }
}

fn encode_node(node: &Node) -> (u8, Vec<u8>) {
    match node {
        Node::Bool(v) => (TAG_BOOL, vec![*v as u8]),
        Node::Int(v) => (TAG_INT, v.to_le_bytes().to_vec()),
        Node::Long(v) => (TAG_LONG, v.to_le_bytes().to_vec()),
        Node::Str(v) => (TAG_STRING, v.as_bytes().to_vec()),
        Node::Binary(v) => (TAG_BINARY, v.clone()),
        Node::Object(doc) | Node::Array(doc) => {
            let tag = if matches!(node, Node::Object(_)) {
                TAG_OBJECT
            } else {
                TAG_ARRAY
            };
            let mut w = Writer::new();
            doc.encode_into(&mut w);
            (tag, w.into_vec())
        }
    }
}
