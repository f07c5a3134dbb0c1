use indexmap::IndexSet;

use crate::record::{Record, is_private};

/// Union of the record keys, first-seen order, private fields dropped.
pub fn derive_columns(records: &[Record]) -> Vec<String> {
    let mut columns: IndexSet<&str> = IndexSet::new();
    for record in records {
        for key in record.keys() {
            if !is_private(key) {
                columns.insert(key.as_str());
            }
        }
    }
    columns.into_iter().map(|c| c.to_string()).collect()
}

/// Header label for a column key: first letter upper case, the rest lower case.
pub fn label(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Rendered column order. `Derived` follows the records, `Manual` is set by pinning.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOrder {
    Derived(Vec<String>),
    Manual(Vec<String>),
}

impl Default for ColumnOrder {
    fn default() -> Self {
        ColumnOrder::Derived(Vec::new())
    }
}

impl ColumnOrder {
    pub fn columns(&self) -> &[String] {
        match self {
            ColumnOrder::Derived(c) | ColumnOrder::Manual(c) => c,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, ColumnOrder::Manual(_))
    }

    /// Reconciles with a freshly derived column set. A manual order wins as long as
    /// it still covers exactly the derived columns.
    pub fn reconcile(self, derived: Vec<String>) -> ColumnOrder {
        match self {
            ColumnOrder::Manual(manual)
                if manual.len() == derived.len() && manual.iter().all(|c| derived.contains(c)) =>
            {
                ColumnOrder::Manual(manual)
            }
            _ => ColumnOrder::Derived(derived),
        }
    }
}
