//! Dotted-path addressing into dynamically shaped records.
//!
//! A path such as `formCustomFields.outer.1.name` is a list of segments. A
//! segment addresses an array element when the container at that point is an
//! array and the segment is a non-negative integer; otherwise it is an object
//! key. The empty path addresses the record itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Maps a path that lived under `array.<n>` to where it lives after the
    /// element at `removed` was taken out of `array`. Paths inside the removed
    /// element map to `None`; paths outside the array are returned unchanged.
    pub fn reindex_after_removal(&self, array: &FieldPath, removed: usize) -> Option<FieldPath> {
        if !self.starts_with(array) || self.segments.len() == array.segments.len() {
            return Some(self.clone());
        }
        let position = array.segments.len();
        let Ok(current) = self.segments[position].parse::<usize>() else {
            return Some(self.clone());
        };
        if current == removed {
            return None;
        }
        if current < removed {
            return Some(self.clone());
        }
        let mut segments = self.segments.clone();
        segments[position] = (current - 1).to_string();
        Some(Self { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FieldPath::parse(s))
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        FieldPath::parse(value)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldPath::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPathError {
    #[error("cannot write '{path}': '{at}' does not exist")]
    Missing { path: String, at: String },
    #[error("cannot write '{path}': '{segment}' is not an array index")]
    NotAnIndex { path: String, segment: String },
    #[error("cannot write '{path}': index {index} is out of bounds (length {len})")]
    OutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
    #[error("cannot write '{path}': '{at}' is neither an object nor an array")]
    NotAContainer { path: String, at: String },
}

/// Result of reading a path: an absent location is reported apart from a
/// location holding `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Missing,
    Found(&'a Value),
}

impl<'a> Lookup<'a> {
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Lookup::Missing => None,
            Lookup::Found(value) => Some(value),
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Lookup::Missing)
    }

    pub fn is_null(self) -> bool {
        matches!(self, Lookup::Found(Value::Null))
    }
}

pub fn get<'a>(record: &'a Value, path: &FieldPath) -> Lookup<'a> {
    let mut current = record;
    for segment in &path.segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Lookup::Missing,
        }
    }
    Lookup::Found(current)
}

pub fn get_mut<'a>(record: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    let mut current = record;
    for segment in &path.segments {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Copy-on-write write: returns a new record with `value` stored at `path`.
pub fn set(record: &Value, path: &FieldPath, value: Value) -> Result<Value, InvalidPathError> {
    let mut updated = record.clone();
    set_in_place(&mut updated, path, value)?;
    Ok(updated)
}

pub fn set_in_place(
    record: &mut Value,
    path: &FieldPath,
    value: Value,
) -> Result<(), InvalidPathError> {
    let Some((last, parents)) = path.segments.split_last() else {
        *record = value;
        return Ok(());
    };

    let mut current = record;
    for (depth, segment) in parents.iter().enumerate() {
        current = match current {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| InvalidPathError::Missing {
                    path: path.to_string(),
                    at: prefix(path, depth + 1),
                })?,
            Value::Array(items) => {
                let index = parse_index(path, segment)?;
                let len = items.len();
                items
                    .get_mut(index)
                    .ok_or_else(|| InvalidPathError::OutOfBounds {
                        path: path.to_string(),
                        index,
                        len,
                    })?
            }
            _ => {
                return Err(InvalidPathError::NotAContainer {
                    path: path.to_string(),
                    at: prefix(path, depth),
                });
            }
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(path, last)?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => {
                    items[index] = value;
                    Ok(())
                }
                std::cmp::Ordering::Equal => {
                    items.push(value);
                    Ok(())
                }
                std::cmp::Ordering::Greater => Err(InvalidPathError::OutOfBounds {
                    path: path.to_string(),
                    index,
                    len: items.len(),
                }),
            }
        }
        _ => Err(InvalidPathError::NotAContainer {
            path: path.to_string(),
            at: prefix(path, path.segments.len() - 1),
        }),
    }
}

/// Removes the value at `path`. Object members are dropped, array slots are
/// nulled so sibling indices stay stable. Missing paths are ignored.
pub fn remove_in_place(record: &mut Value, path: &FieldPath) -> Option<Value> {
    let (last, parents) = path.segments.split_last()?;
    let mut current = record;
    for segment in parents {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.shift_remove(last),
        Value::Array(items) => {
            let slot = items.get_mut(last.parse::<usize>().ok()?)?;
            Some(std::mem::replace(slot, Value::Null))
        }
        _ => None,
    }
}

/// Makes sure an object exists at `path`, creating empty objects for every
/// missing segment. Used when seeding a record that has no custom-field
/// region yet.
pub fn ensure_object(record: &mut Value, path: &FieldPath) -> Result<(), InvalidPathError> {
    let mut current = record;
    for (depth, segment) in path.segments.iter().enumerate() {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => {
                return Err(InvalidPathError::NotAContainer {
                    path: path.to_string(),
                    at: prefix(path, depth),
                });
            }
        };
    }
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    if current.is_object() {
        Ok(())
    } else {
        Err(InvalidPathError::NotAContainer {
            path: path.to_string(),
            at: path.to_string(),
        })
    }
}

fn parse_index(path: &FieldPath, segment: &str) -> Result<usize, InvalidPathError> {
    segment
        .parse::<usize>()
        .map_err(|_| InvalidPathError::NotAnIndex {
            path: path.to_string(),
            segment: segment.to_string(),
        })
}

fn prefix(path: &FieldPath, len: usize) -> String {
    path.segments[..len].join(".")
}
