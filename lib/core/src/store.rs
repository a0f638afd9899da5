use crate::{AccidentRecord, Error, Result};
use parking_lot::RwLock;

/// Append-only, in-memory set of embedded accident records.
///
/// All records share one embedding dimension, fixed by the first append.
/// Scans take a shared lock and appends an exclusive one, so a scan never
/// sees a half-written record and duplicate checks always see the latest
/// contents.
#[derive(Default)]
pub struct RecordStore {
    records: RwLock<Vec<AccidentRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Embedding dimension shared by the stored records, if any.
    pub fn dimension(&self) -> Option<usize> {
        Self::dimension_of(&self.records.read())
    }

    /// Append a record unconditionally.
    pub fn append(&self, record: AccidentRecord) -> Result<()> {
        let mut records = self.records.write();
        Self::check_dimension(&records, &record)?;
        records.push(record);
        Ok(())
    }

    /// Append every record of a batch, or none of them.
    pub fn append_batch(&self, batch: Vec<AccidentRecord>) -> Result<usize> {
        let mut records = self.records.write();
        let mut expected = Self::dimension_of(&records);
        for record in &batch {
            let actual = Self::embedding_dim(record)?;
            match expected {
                Some(dim) if dim != actual => {
                    return Err(Error::InvalidDimension { expected: dim, actual });
                }
                _ => expected = Some(actual),
            }
        }
        let added = batch.len();
        records.extend(batch);
        Ok(added)
    }

    /// Append unless a record for the same accident is already stored.
    ///
    /// Returns `false` when the record was skipped as a duplicate.
    pub fn append_unique(&self, record: AccidentRecord) -> Result<bool> {
        let mut records = self.records.write();
        if records.iter().any(|existing| existing.same_accident(&record)) {
            return Ok(false);
        }
        Self::check_dimension(&records, &record)?;
        records.push(record);
        Ok(true)
    }

    /// Visit every record under the shared lock.
    pub fn scan<F: FnMut(&AccidentRecord)>(&self, mut visit: F) {
        for record in self.records.read().iter() {
            visit(record);
        }
    }

    /// Run `f` over the records under the shared lock.
    pub fn with_records<R>(&self, f: impl FnOnce(&[AccidentRecord]) -> R) -> R {
        f(&self.records.read())
    }

    fn embedding_dim(record: &AccidentRecord) -> Result<usize> {
        record
            .embedding
            .as_ref()
            .map(|e| e.dim())
            .ok_or_else(|| Error::InvalidArgument("stored records require an embedding".to_string()))
    }

    fn dimension_of(records: &[AccidentRecord]) -> Option<usize> {
        records
            .first()
            .and_then(|r| r.embedding.as_ref())
            .map(|e| e.dim())
    }

    fn check_dimension(records: &[AccidentRecord], record: &AccidentRecord) -> Result<()> {
        let actual = Self::embedding_dim(record)?;
        match Self::dimension_of(records) {
            Some(expected) if expected != actual => {
                Err(Error::InvalidDimension { expected, actual })
            }
            _ => Ok(()),
        }
    }
}
