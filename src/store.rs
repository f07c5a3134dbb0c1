use std::sync::Arc;

use tracing::info;

use crate::record::Record;

/// Holds the original snapshot and the current display order over it.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    original: Arc<Vec<Record>>,
    rows: Vec<usize>, // Mapping of display row to index in `original`
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        let mut store = Self::default();
        store.replace(records);
        store
    }

    /// Installs a new snapshot. Display order becomes the snapshot order.
    pub fn replace(&mut self, records: Vec<Record>) {
        info!("Replacing snapshot with {} records", records.len());
        self.rows = (0..records.len()).collect();
        self.original = Arc::new(records);
    }

    pub fn original(&self) -> &[Record] {
        &self.original
    }

    pub fn order(&self) -> &[usize] {
        &self.rows
    }

    /// Sets the display order. `rows` must be a permutation of the snapshot indices.
    pub fn set_order(&mut self, rows: Vec<usize>) {
        debug_assert_eq!(rows.len(), self.original.len());
        self.rows = rows;
    }

    pub fn revert(&mut self) {
        self.rows = (0..self.original.len()).collect();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Record shown at display position `idx`.
    pub fn get(&self, idx: usize) -> Option<&Record> {
        self.rows.get(idx).and_then(|&r| self.original.get(r))
    }

    pub fn rows(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter().filter_map(|&r| self.original.get(r))
    }
}
