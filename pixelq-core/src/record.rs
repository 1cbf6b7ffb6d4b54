//! Types and traits for recording training metrics.
//!
//! A [`Record`] is a flexible container of key-value pairs produced during
//! training and evaluation. Records are handed to a [`Recorder`], which is
//! the boundary towards whatever sink the application wires up; the crate
//! itself ships [`NullRecorder`] and [`BufferedRecorder`].
use crate::error::PixelqError;
use chrono::prelude::{DateTime, Local};
use std::collections::{hash_map::Iter, HashMap};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating-point value, typically used for metrics.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array of floating-point values.
    Array1(Vec<f32>),

    /// A text value, useful for labels or descriptions.
    String(String),
}

/// A container for storing key-value pairs of various data types.
#[derive(Debug, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns the value for the given key, if it exists.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Returns `true` if the record contains no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges the entries of another record into this one.
    pub fn merge(mut self, record: Record) -> Self {
        self.0.extend(record.0);
        self
    }

    /// Returns the scalar value for the given key.
    pub fn get_scalar(&self, k: &str) -> Result<f32, PixelqError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(PixelqError::RecordValueTypeError(k.to_string())),
            None => Err(PixelqError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the string value for the given key.
    pub fn get_string(&self, k: &str) -> Result<String, PixelqError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(PixelqError::RecordValueTypeError(k.to_string())),
            None => Err(PixelqError::RecordKeyError(k.to_string())),
        }
    }
}

/// Writes a record to an output destination with [`Recorder::write`].
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);
}

/// A recorder that ignores any record. This struct is used just for debugging.
pub struct NullRecorder {}

impl Recorder for NullRecorder {
    /// Discard the given record.
    fn write(&mut self, _record: Record) {}
}

/// Buffered recorder.
///
/// This is used for keeping records in memory, e.g. during tests or
/// evaluation runs.
#[derive(Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
}

impl BufferedRecorder {
    /// Construct the recorder.
    pub fn new() -> Self {
        Self { buf: Vec::default() }
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.buf.iter()
    }

    /// Returns the number of buffered records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if no record has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Recorder for BufferedRecorder {
    /// Write a [`Record`] to the buffer.
    fn write(&mut self, record: Record) {
        self.buf.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_scalar() {
        let mut record = Record::from_scalar("loss", 0.5);
        record.insert("mode", RecordValue::String("train".into()));

        assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
        assert!(matches!(
            record.get_scalar("mode"),
            Err(PixelqError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            record.get_scalar("missing"),
            Err(PixelqError::RecordKeyError(_))
        ));
    }

    #[test]
    fn test_merge() {
        let a = Record::from_scalar("a", 1.0);
        let b = Record::from_scalar("b", 2.0);
        let merged = a.merge(b);
        assert_eq!(merged.get_scalar("a").unwrap(), 1.0);
        assert_eq!(merged.get_scalar("b").unwrap(), 2.0);
    }
}
