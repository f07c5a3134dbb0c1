use tracing::debug;

use crate::columns::ColumnOrder;

/// Pinned columns and the column order they impose.
#[derive(Debug, Default, Clone)]
pub struct PinManager {
    pinned: Vec<String>,
    order: ColumnOrder,
}

impl PinManager {
    pub fn pinned(&self) -> &[String] {
        &self.pinned
    }

    pub fn is_pinned(&self, key: &str) -> bool {
        self.pinned.iter().any(|p| p == key)
    }

    pub fn columns(&self) -> &[String] {
        self.order.columns()
    }

    pub fn order(&self) -> &ColumnOrder {
        &self.order
    }

    /// Pins an unpinned column to the end of the pinned block, or moves a pinned
    /// column to the very end of the order.
    pub fn toggle_pin(&mut self, key: &str) {
        let current = self.order.columns();
        if !current.iter().any(|c| c == key) {
            debug!("Ignoring pin toggle for unknown column \"{key}\"");
            return;
        }

        let next = if let Some(pos) = self.pinned.iter().position(|p| p == key) {
            self.pinned.remove(pos);
            let mut next: Vec<String> = current.iter().filter(|c| *c != key).cloned().collect();
            next.push(key.to_string());
            debug!("Unpinned \"{key}\"");
            next
        } else {
            self.pinned.push(key.to_string());
            let rest = current.iter().filter(|c| !self.pinned.contains(c)).cloned();
            debug!("Pinned \"{key}\", pinned: {:?}", self.pinned);
            self.pinned.iter().cloned().chain(rest).collect()
        };
        self.order = ColumnOrder::Manual(next);
    }

    /// Adopts a freshly derived column set after the records changed.
    pub fn refresh(&mut self, derived: Vec<String>) {
        self.pinned.retain(|p| derived.contains(p));
        let order = std::mem::take(&mut self.order).reconcile(derived);
        self.order = match order {
            ColumnOrder::Derived(columns) if !self.pinned.is_empty() => {
                let rest = columns.into_iter().filter(|c| !self.pinned.contains(c));
                ColumnOrder::Manual(self.pinned.iter().cloned().chain(rest).collect())
            }
            order => order,
        };
    }
}
