//! Node - the RDF term model and its binary codec
//!
//! A `Node` is an IRI, a blank node label, or a literal (lexical form
//! plus an optional language tag or datatype IRI). Fields use
//! `Arc<str>` so clones are cheap; terms are shared between caches and
//! bindings freely.
//!
//! ## Binary codec
//!
//! Terms serialize to a kind tag byte followed by `u32`-length-prefixed
//! UTF-8 segments. The encoding round-trips byte-for-byte and is the
//! input to the 128-bit content hash used by the node table's reverse
//! index.
//!
//! ## Inlining
//!
//! Canonical `xsd:boolean` and `xsd:integer` literals within the
//! 56-bit signed range encode directly into the [`NodeId`] bits and
//! never touch the object file. Non-canonical lexical forms (e.g.
//! `"+5"`, `"007"`) are stored as ordinary terms so that
//! resolve-after-allocate reproduces the original bytes exactly.

use crate::error::{Error, Result};
use crate::node_id::NodeId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// XSD datatype IRIs the engine knows about.
pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
}

/// Width of the node content hash in bytes (truncated SHA-256).
pub const NODE_HASH_SIZE: usize = 16;

const TAG_IRI: u8 = 0x01;
const TAG_BLANK: u8 = 0x02;
const TAG_LITERAL: u8 = 0x03;
const TAG_LANG_LITERAL: u8 = 0x04;
const TAG_TYPED_LITERAL: u8 = 0x05;

/// An RDF term.
///
/// A language-tagged literal carries no separate datatype; the
/// constructors keep `lang` and `datatype` mutually exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    /// IRI reference
    Iri(Arc<str>),
    /// Blank node label
    Blank(Arc<str>),
    /// Literal: lexical form plus optional language tag or datatype IRI
    Literal {
        lexical: Arc<str>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<Arc<str>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<Arc<str>>,
    },
}

impl Node {
    /// Create an IRI node
    pub fn iri(iri: impl AsRef<str>) -> Self {
        Node::Iri(Arc::from(iri.as_ref()))
    }

    /// Create a blank node with the given label
    pub fn blank(label: impl AsRef<str>) -> Self {
        Node::Blank(Arc::from(label.as_ref()))
    }

    /// Create a plain literal (no language tag, no datatype)
    pub fn literal(lexical: impl AsRef<str>) -> Self {
        Node::Literal {
            lexical: Arc::from(lexical.as_ref()),
            lang: None,
            datatype: None,
        }
    }

    /// Create a language-tagged literal
    pub fn lang_literal(lexical: impl AsRef<str>, lang: impl AsRef<str>) -> Self {
        Node::Literal {
            lexical: Arc::from(lexical.as_ref()),
            lang: Some(Arc::from(lang.as_ref())),
            datatype: None,
        }
    }

    /// Create a typed literal
    pub fn typed_literal(lexical: impl AsRef<str>, datatype: impl AsRef<str>) -> Self {
        Node::Literal {
            lexical: Arc::from(lexical.as_ref()),
            lang: None,
            datatype: Some(Arc::from(datatype.as_ref())),
        }
    }

    /// Create the canonical `xsd:integer` literal for a value
    pub fn integer(value: i64) -> Self {
        Self::typed_literal(value.to_string(), xsd::INTEGER)
    }

    /// Create the canonical `xsd:boolean` literal for a value
    pub fn boolean(value: bool) -> Self {
        Self::typed_literal(if value { "true" } else { "false" }, xsd::BOOLEAN)
    }

    /// Returns `true` if this is a literal term
    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal { .. })
    }

    /// Serialize to the binary wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        match self {
            Node::Iri(iri) => {
                out.push(TAG_IRI);
                write_segment(&mut out, iri);
            }
            Node::Blank(label) => {
                out.push(TAG_BLANK);
                write_segment(&mut out, label);
            }
            Node::Literal {
                lexical,
                lang: Some(lang),
                ..
            } => {
                out.push(TAG_LANG_LITERAL);
                write_segment(&mut out, lexical);
                write_segment(&mut out, lang);
            }
            Node::Literal {
                lexical,
                lang: None,
                datatype: Some(datatype),
            } => {
                out.push(TAG_TYPED_LITERAL);
                write_segment(&mut out, lexical);
                write_segment(&mut out, datatype);
            }
            Node::Literal {
                lexical,
                lang: None,
                datatype: None,
            } => {
                out.push(TAG_LITERAL);
                write_segment(&mut out, lexical);
            }
        }
        out
    }

    fn encoded_len(&self) -> usize {
        match self {
            Node::Iri(s) | Node::Blank(s) => 1 + 4 + s.len(),
            Node::Literal {
                lexical,
                lang,
                datatype,
            } => {
                let extra = lang
                    .as_deref()
                    .or(datatype.as_deref())
                    .map_or(0, |s| 4 + s.len());
                1 + 4 + lexical.len() + extra
            }
        }
    }

    /// Deserialize from the binary wire form.
    ///
    /// The whole slice must be consumed; trailing bytes are corruption.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::corruption("empty node record"))?;
        let mut pos = 0usize;
        let node = match tag {
            TAG_IRI => Node::Iri(read_segment(rest, &mut pos)?),
            TAG_BLANK => Node::Blank(read_segment(rest, &mut pos)?),
            TAG_LITERAL => Node::Literal {
                lexical: read_segment(rest, &mut pos)?,
                lang: None,
                datatype: None,
            },
            TAG_LANG_LITERAL => {
                let lexical = read_segment(rest, &mut pos)?;
                let lang = read_segment(rest, &mut pos)?;
                Node::Literal {
                    lexical,
                    lang: Some(lang),
                    datatype: None,
                }
            }
            TAG_TYPED_LITERAL => {
                let lexical = read_segment(rest, &mut pos)?;
                let datatype = read_segment(rest, &mut pos)?;
                Node::Literal {
                    lexical,
                    lang: None,
                    datatype: Some(datatype),
                }
            }
            other => {
                return Err(Error::corruption(format!(
                    "unknown node record tag {other:#04x}"
                )))
            }
        };
        if pos != rest.len() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after node record",
                rest.len() - pos
            )));
        }
        Ok(node)
    }

    /// 128-bit content hash over the encoded form.
    ///
    /// Used as the key of the node table's reverse index. As in the
    /// original TDB design, the truncated hash is treated as
    /// collision-free for distinct terms.
    pub fn hash128(&self) -> [u8; NODE_HASH_SIZE] {
        let digest = Sha256::digest(self.encode());
        let mut hash = [0u8; NODE_HASH_SIZE];
        hash.copy_from_slice(&digest[..NODE_HASH_SIZE]);
        hash
    }

    /// Inline this term into a [`NodeId`], if it has an inline encoding.
    ///
    /// Only canonical lexical forms inline, so that id-to-term
    /// resolution reproduces the original term exactly.
    pub fn try_inline(&self) -> Option<NodeId> {
        let Node::Literal {
            lexical,
            lang: None,
            datatype: Some(datatype),
        } = self
        else {
            return None;
        };
        match datatype.as_ref() {
            xsd::BOOLEAN => match lexical.as_ref() {
                "true" => Some(NodeId::inline_boolean(true)),
                "false" => Some(NodeId::inline_boolean(false)),
                _ => None,
            },
            xsd::INTEGER => {
                let value: i64 = lexical.parse().ok()?;
                if value.to_string() != lexical.as_ref() {
                    return None;
                }
                NodeId::inline_integer(value)
            }
            _ => None,
        }
    }

    /// Reconstruct the term held inline in a [`NodeId`].
    ///
    /// Returns `None` for pointer ids and sentinels.
    pub fn from_inline(id: NodeId) -> Option<Self> {
        if let Some(value) = id.as_inline_integer() {
            return Some(Node::integer(value));
        }
        if let Some(value) = id.as_inline_boolean() {
            return Some(Node::boolean(value));
        }
        None
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => write!(f, "<{iri}>"),
            Node::Blank(label) => write!(f, "_:{label}"),
            Node::Literal {
                lexical,
                lang: Some(lang),
                ..
            } => write!(f, "{lexical:?}@{lang}"),
            Node::Literal {
                lexical,
                lang: None,
                datatype: Some(datatype),
            } => write!(f, "{lexical:?}^^<{datatype}>"),
            Node::Literal { lexical, .. } => write!(f, "{lexical:?}"),
        }
    }
}

fn write_segment(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn read_segment(bytes: &[u8], pos: &mut usize) -> Result<Arc<str>> {
    let len_end = pos
        .checked_add(4)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| Error::corruption("truncated segment length"))?;
    let len = u32::from_be_bytes(bytes[*pos..len_end].try_into().expect("4-byte slice")) as usize;
    let end = len_end
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| Error::corruption("truncated segment payload"))?;
    let s = std::str::from_utf8(&bytes[len_end..end])
        .map_err(|e| Error::corruption(format!("segment is not UTF-8: {e}")))?;
    *pos = end;
    Ok(Arc::from(s))
}
