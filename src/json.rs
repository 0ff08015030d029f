//! Field extraction from raw JSON buffers.
//!
//! Every lookup degrades to `None`: a missing key, an out of range index, a
//! type mismatch and malformed JSON are all reported the same way. Callers
//! decide whether absence means zero (numeric stats) or a failed cycle
//! (query values and labels).

use crate::error::ExporterError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a [`JsonPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// A sequence of object keys and array indices.
///
/// Parsed from dotted strings where `.` separates keys and `[n]` selects an
/// array element: `Results[0].Name`, `Items.[2]`, `Matrix[1][0]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JsonPath {
    steps: Vec<PathStep>,
}

impl JsonPath {
    /// Path made only of object keys.
    #[must_use]
    pub fn keys(keys: &[&str]) -> Self {
        Self {
            steps: keys.iter().map(|k| PathStep::Key((*k).to_string())).collect(),
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }
}

impl FromStr for JsonPath {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ExporterError::config("empty JSON path"));
        }

        let mut steps = Vec::new();
        for segment in s.split('.') {
            let (key, mut rest) = segment
                .find('[')
                .map_or((segment, ""), |pos| segment.split_at(pos));

            if key.is_empty() && rest.is_empty() {
                return Err(ExporterError::config(format!(
                    "empty segment in JSON path '{s}'"
                )));
            }
            if !key.is_empty() {
                if key.contains(']') {
                    return Err(ExporterError::config(format!(
                        "unexpected ']' in JSON path '{s}'"
                    )));
                }
                steps.push(PathStep::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let (digits, tail) = rest
                    .strip_prefix('[')
                    .and_then(|r| r.split_once(']'))
                    .ok_or_else(|| {
                        ExporterError::config(format!("unterminated index in JSON path '{s}'"))
                    })?;
                let index = digits.parse::<usize>().map_err(|_| {
                    ExporterError::config(format!(
                        "invalid array index '{digits}' in JSON path '{s}'"
                    ))
                })?;
                steps.push(PathStep::Index(index));
                rest = tail;
            }
        }

        Ok(Self { steps })
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(key) if i == 0 => write!(f, "{key}")?,
                PathStep::Key(key) => write!(f, ".{key}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Scalar types that can be read out of a JSON value.
pub trait JsonScalar: Sized {
    fn from_json(value: &Value) -> Option<Self>;
}

impl JsonScalar for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl JsonScalar for String {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(ToString::to_string)
    }
}

impl JsonScalar for bool {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

/// Decode a buffer, `None` if it is not valid JSON.
#[must_use]
pub fn parse(buffer: &[u8]) -> Option<Value> {
    serde_json::from_slice(buffer).ok()
}

/// Walk `path` from `value`. An empty path returns `value` itself.
#[must_use]
pub fn lookup<'v>(value: &'v Value, path: &JsonPath) -> Option<&'v Value> {
    path.steps.iter().try_fold(value, |current, step| match step {
        PathStep::Key(key) => current.as_object()?.get(key),
        PathStep::Index(index) => current.as_array()?.get(*index),
    })
}

/// Extract a typed scalar from a raw buffer.
#[must_use]
pub fn extract<T: JsonScalar>(buffer: &[u8], path: &JsonPath) -> Option<T> {
    extract_value(&parse(buffer)?, path)
}

/// Extract a typed scalar from an already decoded document.
#[must_use]
pub fn extract_value<T: JsonScalar>(value: &Value, path: &JsonPath) -> Option<T> {
    lookup(value, path).and_then(T::from_json)
}

/// Visit every element of the array at `path`. Nothing is visited when the
/// buffer is malformed or the path does not lead to an array.
pub fn for_each_in_array<F>(buffer: &[u8], path: &JsonPath, f: F)
where
    F: FnMut(&Value),
{
    let Some(doc) = parse(buffer) else {
        return;
    };
    if let Some(items) = lookup(&doc, path).and_then(Value::as_array) {
        items.iter().for_each(f);
    }
}
