use std::borrow::Cow;

use tracing::debug;

use crate::record::{Record, Value, compare};
use crate::store::RecordStore;

/// Column whose values are flag image names like `Flag_of_Alabama.png`.
pub const FLAG_COLUMN: &str = "flag";
const FLAG_TOKEN: &str = "of_";

/// Sort cycle of the active column: `Ascending` means the rows are currently
/// sorted ascending and the next click on the same column descends.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SortState {
    #[default]
    Unsorted,
    Ascending(String),
    Descending(String),
}

/// Marker drawn next to the active column header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortIndicator {
    /// Sorted ascending, the next click descends.
    DescendingReady,
    /// Sorted descending, the next click reverts.
    AscendingReady,
}

impl SortIndicator {
    pub fn symbol(&self) -> &'static str {
        match self {
            SortIndicator::DescendingReady => "⬇",
            SortIndicator::AscendingReady => "⬆",
        }
    }
}

impl SortState {
    pub fn active(&self) -> Option<&str> {
        match self {
            SortState::Unsorted => None,
            SortState::Ascending(c) | SortState::Descending(c) => Some(c),
        }
    }

    pub fn indicator(&self, key: &str) -> Option<SortIndicator> {
        match self {
            SortState::Ascending(c) if c == key => Some(SortIndicator::DescendingReady),
            SortState::Descending(c) if c == key => Some(SortIndicator::AscendingReady),
            _ => None,
        }
    }

    /// Advances the cycle for a click on `key` and reorders the store accordingly.
    pub fn advance(self, key: &str, store: &mut RecordStore) -> SortState {
        let next = match self {
            SortState::Ascending(c) if c == key => {
                let mut rows = store.order().to_vec();
                rows.reverse();
                store.set_order(rows);
                SortState::Descending(c)
            }
            SortState::Descending(c) if c == key => {
                store.revert();
                SortState::Unsorted
            }
            previous => {
                if previous != SortState::Unsorted {
                    store.revert();
                }
                store.set_order(ascending_order(store.original(), key));
                SortState::Ascending(key.to_string())
            }
        };
        debug!("Sort on \"{key}\": {next:?}");
        next
    }
}

/// Value a row is sorted by for the given column.
pub fn sort_key<'a>(record: &'a Record, key: &str) -> Option<Cow<'a, Value>> {
    let value = record.get(key)?;
    if key == FLAG_COLUMN
        && let Some(name) = value.as_str().and_then(|s| s.split(FLAG_TOKEN).nth(1))
    {
        return Some(Cow::Owned(Value::Text(name.to_string())));
    }
    Some(Cow::Borrowed(value))
}

/// Stable ascending order of the snapshot indices by the given column.
pub fn ascending_order(records: &[Record], key: &str) -> Vec<usize> {
    let mut indexed_rows: Vec<(usize, Option<Cow<Value>>)> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (idx, sort_key(record, key)))
        .collect();
    indexed_rows.sort_by(|(_, a), (_, b)| compare(a.as_deref(), b.as_deref()));
    indexed_rows.into_iter().map(|(idx, _)| idx).collect()
}
