//! Validation engine
//!
//! Evaluates the [`RecordSchema`] against one field, one record or the whole
//! collection. Whole-collection validation produces the normalized
//! [`ValidatedSnapshot`] that is handed to persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::collection::CollectionState;
use crate::error::{FieldError, ValidationErrors};
use crate::models::AccountRecord;
use crate::schema::{FieldPath, RecordField, RecordSchema};

/// Immutable, normalized copy of a fully valid collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSnapshot {
    records: Arc<[AccountRecord]>,
    taken_at: DateTime<Utc>,
}

impl ValidatedSnapshot {
    /// Records in collection order
    #[must_use]
    pub fn records(&self) -> &[AccountRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the snapshot holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the validation pass completed
    #[must_use]
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

/// Evaluates record rules over a collection
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    schema: RecordSchema,
}

impl ValidationEngine {
    /// Creates an engine using the default schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with a custom schema
    #[must_use]
    pub const fn with_schema(schema: RecordSchema) -> Self {
        Self { schema }
    }

    /// The schema in use
    #[must_use]
    pub const fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Validates a single field of the record at `index`.
    ///
    /// A position that holds no record fails with a message at that path.
    ///
    /// # Errors
    ///
    /// Returns the field's first failing rule.
    pub fn validate_field(
        &self,
        collection: &CollectionState,
        index: usize,
        field: RecordField,
    ) -> Result<(), FieldError> {
        let path = FieldPath::new(index, field);
        let record = collection
            .get(index)
            .ok_or_else(|| FieldError::new(path, "record does not exist"))?;
        self.schema
            .check_field(record, field)
            .map_err(|message| FieldError::new(path, message))
    }

    /// Validates every field of one record placed at `index`
    ///
    /// # Errors
    ///
    /// Returns one error per failing field.
    pub fn validate_record(
        &self,
        index: usize,
        record: &AccountRecord,
    ) -> Result<(), ValidationErrors> {
        let errors = self.record_errors(index, record);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn record_errors(&self, index: usize, record: &AccountRecord) -> ValidationErrors {
        RecordField::all()
            .iter()
            .filter_map(|field| {
                self.schema
                    .check_field(record, *field)
                    .err()
                    .map(|message| FieldError::new(FieldPath::new(index, *field), message))
            })
            .collect()
    }

    /// Validates the whole collection.
    ///
    /// Succeeds only if every record passes every rule; the snapshot has
    /// missing ids filled and directory passwords nulled.
    ///
    /// # Errors
    ///
    /// Returns every failing field, keyed by path.
    pub fn validate_all(
        &self,
        collection: &CollectionState,
    ) -> Result<ValidatedSnapshot, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (index, record) in collection.records().enumerate() {
            for (path, message) in self.record_errors(index, record).iter() {
                errors.insert(FieldError::new(*path, message));
            }
        }

        if !errors.is_empty() {
            tracing::debug!(
                record_count = collection.len(),
                error_count = errors.len(),
                "Collection failed validation"
            );
            return Err(errors);
        }

        let records: Arc<[AccountRecord]> =
            collection.records().map(AccountRecord::normalized).collect();
        Ok(ValidatedSnapshot {
            records,
            taken_at: Utc::now(),
        })
    }
}
