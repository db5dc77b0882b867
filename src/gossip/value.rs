//! Opaque payload values carried in gossip
//!
//! The store never interprets payloads; it only moves them between nodes
//! and hands them back to callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::types::StoreKey;

/// Opaque value published under a [`StoreKey`]
///
/// Supports:
/// - Bytes
/// - String
/// - Integer (i64)
/// - Boolean
/// - List (Vec<StoreValue>)
/// - Map (HashMap<String, StoreValue>)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreValue {
    Bytes(Vec<u8>),
    String(String),
    Integer(i64),
    Boolean(bool),
    List(Vec<StoreValue>),
    Map(HashMap<String, StoreValue>),
}

impl StoreValue {
    /// Get raw bytes if this is a bytes value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StoreValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            StoreValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StoreValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            StoreValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get list value if this is a list
    pub fn as_list(&self) -> Option<&Vec<StoreValue>> {
        match self {
            StoreValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get map value if this is a map
    pub fn as_map(&self) -> Option<&HashMap<String, StoreValue>> {
        match self {
            StoreValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreValue::Bytes(_) => "Bytes",
            StoreValue::String(_) => "String",
            StoreValue::Integer(_) => "Integer",
            StoreValue::Boolean(_) => "Boolean",
            StoreValue::List(_) => "List",
            StoreValue::Map(_) => "Map",
        }
    }
}

impl fmt::Display for StoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            StoreValue::String(s) => write!(f, "\"{}\"", s),
            StoreValue::Integer(i) => write!(f, "{}", i),
            StoreValue::Boolean(b) => write!(f, "{}", b),
            StoreValue::List(list) => {
                write!(f, "[")?;
                for (i, val) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            StoreValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenience conversions
impl From<String> for StoreValue {
    fn from(s: String) -> Self {
        StoreValue::String(s)
    }
}

impl From<&str> for StoreValue {
    fn from(s: &str) -> Self {
        StoreValue::String(s.to_string())
    }
}

impl From<i64> for StoreValue {
    fn from(i: i64) -> Self {
        StoreValue::Integer(i)
    }
}

impl From<bool> for StoreValue {
    fn from(b: bool) -> Self {
        StoreValue::Boolean(b)
    }
}

impl From<Vec<u8>> for StoreValue {
    fn from(b: Vec<u8>) -> Self {
        StoreValue::Bytes(b)
    }
}

impl From<Vec<StoreValue>> for StoreValue {
    fn from(list: Vec<StoreValue>) -> Self {
        StoreValue::List(list)
    }
}

impl From<HashMap<String, StoreValue>> for StoreValue {
    fn from(map: HashMap<String, StoreValue>) -> Self {
        StoreValue::Map(map)
    }
}

/// Per-node payload: the keys a node publishes and their values
pub type ValueMap = HashMap<StoreKey, StoreValue>;
