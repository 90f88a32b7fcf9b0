//! Image metadata attributes.
//!
//! A small typed key/value store carried alongside an [`Image`](crate::Image)
//! through read and write. Codec backends persist what their container can
//! hold and ignore the rest.

use std::collections::BTreeMap;
use std::fmt;

/// Name of the program that wrote the file.
pub const SOFTWARE: &str = "software";
/// Creator of the image.
pub const AUTHOR: &str = "author";
/// Free-form description.
pub const COMMENT: &str = "comment";
/// Color encoding of the stored RGB values (`"sRGB"` or `"linear"`).
pub const COLOR_SPACE: &str = "color_space";
/// Display gamma.
pub const GAMMA: &str = "gamma";
/// Exposure multiplier.
pub const EXPOSURE: &str = "exposure";

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// UTF-8 string value.
    Str(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
}

impl AttrValue {
    /// Returns string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the integer if this is an Int value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a float for Float and Int values.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Str(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(v) => f.write_str(v),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

/// Attribute container, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAttributes {
    map: BTreeMap<String, AttrValue>,
}

impl ImageAttributes {
    /// Creates an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.map.insert(key.into(), value.into());
    }

    /// Returns a reference to a value by key.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.map.get(key)
    }

    /// Returns a string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_str)
    }

    /// Returns a numeric value by key.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AttrValue::as_float)
    }

    /// Removes a value by key.
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.map.remove(key)
    }

    /// Returns true if the key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Iterates over key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Copies every attribute of `other` into `self`, replacing duplicates.
    pub fn merge(&mut self, other: &ImageAttributes) {
        for (k, v) in &other.map {
            self.map.insert(k.clone(), v.clone());
        }
    }
}

/// Attributes every writer starts from: the software name and version.
pub fn create_default_attributes() -> ImageAttributes {
    let mut attrs = ImageAttributes::new();
    attrs.insert(
        SOFTWARE,
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    );
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut attrs = ImageAttributes::new();
        attrs.insert(AUTHOR, "someone");
        attrs.insert(GAMMA, 2.2);
        attrs.insert("frame", 12i64);

        assert_eq!(attrs.get_str(AUTHOR), Some("someone"));
        assert_eq!(attrs.get_float(GAMMA), Some(2.2));
        assert_eq!(attrs.get_float("frame"), Some(12.0));
        assert_eq!(attrs.get_str(GAMMA), None);
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn test_ordered_iteration() {
        let mut attrs = ImageAttributes::new();
        attrs.insert("b", "2");
        attrs.insert("a", "1");
        attrs.insert("c", "3");
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_default_attributes() {
        let attrs = create_default_attributes();
        let software = attrs.get_str(SOFTWARE).unwrap();
        assert!(software.starts_with("imagefile-core"));
    }

    #[test]
    fn test_merge_replaces() {
        let mut a = create_default_attributes();
        let mut b = ImageAttributes::new();
        b.insert(SOFTWARE, "other");
        b.insert(COMMENT, "hello");
        a.merge(&b);
        assert_eq!(a.get_str(SOFTWARE), Some("other"));
        assert_eq!(a.get_str(COMMENT), Some("hello"));
    }
}
