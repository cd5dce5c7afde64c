use mongodb::bson::{doc, Bson, Document};
use service_core::error::AppError;

/// The single persisted visitor-count record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDocument {
    pub id: String,
    pub count: i64,
    pub partition_key: String,
}

impl CounterDocument {
    /// A fresh zero-valued counter.
    pub fn new(id: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            count: 0,
            partition_key: partition_key.into(),
        }
    }

    /// Build the fixed-shape record from whatever the store returned.
    ///
    /// Identity comes from the configured values: the raw record was located
    /// by them, so they are authoritative. `count` goes through
    /// [`normalize_count`].
    pub fn from_stored(raw: &Document, id: &str, partition_key: &str) -> Self {
        let stored = raw.get("count");
        let count = normalize_count(stored);

        if !matches!(stored, Some(Bson::Int32(_)) | Some(Bson::Int64(_))) {
            tracing::warn!(
                counter_id = %id,
                stored = ?stored,
                normalized = count,
                "Counter document has a non-integer count; normalizing"
            );
        }

        Self {
            id: id.to_string(),
            count,
            partition_key: partition_key.to_string(),
        }
    }

    /// Bump the count by one and return the new value. At `i64::MAX` the
    /// count is left untouched and the increment fails.
    pub fn increment(&mut self) -> Result<i64, AppError> {
        self.count = self.count.checked_add(1).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "counter {} is at its maximum value and cannot be incremented",
                self.id
            ))
        })?;
        Ok(self.count)
    }

    pub fn to_document(&self) -> Document {
        doc! {
            "_id": self.id.as_str(),
            "count": self.count,
            "partitionKey": self.partition_key.as_str(),
        }
    }
}

/// Coerce a stored `count` to a non-negative integer.
///
/// Integers pass through, finite doubles truncate toward zero, and strings
/// holding an integer are parsed. Everything else, including a missing field,
/// is zero. Negative values clamp to zero.
pub fn normalize_count(value: Option<&Bson>) -> i64 {
    let count = match value {
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Double(f)) if f.is_finite() => f.trunc() as i64,
        Some(Bson::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    count.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_counts_pass_through() {
        assert_eq!(normalize_count(Some(&Bson::Int32(7))), 7);
        assert_eq!(normalize_count(Some(&Bson::Int64(42))), 42);
    }

    #[test]
    fn non_numeric_counts_become_zero() {
        assert_eq!(normalize_count(None), 0);
        assert_eq!(normalize_count(Some(&Bson::Null)), 0);
        assert_eq!(normalize_count(Some(&Bson::String("abc".into()))), 0);
        assert_eq!(normalize_count(Some(&Bson::Boolean(true))), 0);
        assert_eq!(normalize_count(Some(&Bson::Array(vec![]))), 0);
        assert_eq!(normalize_count(Some(&Bson::Double(f64::NAN))), 0);
    }

    #[test]
    fn numeric_strings_and_doubles_are_coerced() {
        assert_eq!(normalize_count(Some(&Bson::String(" 12 ".into()))), 12);
        assert_eq!(normalize_count(Some(&Bson::Double(3.9))), 3);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(normalize_count(Some(&Bson::Int64(-5))), 0);
        assert_eq!(normalize_count(Some(&Bson::String("-3".into()))), 0);
    }

    #[test]
    fn from_stored_keeps_configured_identity() {
        let raw = doc! { "_id": "1", "count": "abc", "partitionKey": "1", "_etag": "x" };
        let counter = CounterDocument::from_stored(&raw, "1", "1");
        assert_eq!(counter, CounterDocument::new("1", "1"));
    }

    #[test]
    fn increment_adds_exactly_one() {
        let mut counter = CounterDocument::new("1", "1");
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment().unwrap(), 2);
    }

    #[test]
    fn increment_at_maximum_fails_without_changing_count() {
        let mut counter = CounterDocument::new("1", "1");
        counter.count = i64::MAX;

        let err = counter.increment().unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
        assert_eq!(counter.count, i64::MAX);
    }

    #[test]
    fn document_uses_store_field_names() {
        let d = CounterDocument::new("visits", "pk").to_document();
        assert_eq!(d.get_str("_id").unwrap(), "visits");
        assert_eq!(d.get_str("partitionKey").unwrap(), "pk");
        assert_eq!(d.get_i64("count").unwrap(), 0);
    }
}
