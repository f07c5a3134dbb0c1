use std::ops::Range;

use tracing::{debug, info};

use crate::columns::{derive_columns, label};
use crate::format::CellContent;
use crate::pin::PinManager;
use crate::record::Record;
use crate::sort::{SortIndicator, SortState};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    pub indicator: Option<SortIndicator>,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyCell {
    pub content: CellContent,
    pub pinned: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridView {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<Vec<BodyCell>>,
}

/// Records, sort cycle and pins of one grid.
#[derive(Debug, Default)]
pub struct Grid {
    store: RecordStore,
    sort: SortState,
    pins: PinManager,
}

impl Grid {
    pub fn new(records: Vec<Record>) -> Self {
        let mut grid = Self::default();
        grid.replace_records(records);
        grid
    }

    /// Installs a newly loaded snapshot. Any sort is dropped; pins on columns that
    /// still exist are kept.
    pub fn replace_records(&mut self, records: Vec<Record>) {
        self.store.replace(records);
        self.sort = SortState::Unsorted;
        self.pins.refresh(derive_columns(self.store.original()));
        info!(
            "Grid has {} rows and {} columns",
            self.store.len(),
            self.pins.columns().len()
        );
    }

    /// Header activation: with the modifier held the column is pinned or unpinned,
    /// otherwise its sort cycle advances.
    pub fn activate_header(&mut self, key: &str, modifier: bool) {
        debug!("Activate header \"{key}\", modifier: {modifier}");
        if modifier {
            self.pins.toggle_pin(key);
        } else {
            let sort = std::mem::take(&mut self.sort);
            self.sort = sort.advance(key, &mut self.store);
        }
    }

    pub fn columns(&self) -> &[String] {
        self.pins.columns()
    }

    pub fn pinned(&self) -> &[String] {
        self.pins.pinned()
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn nrows(&self) -> usize {
        self.store.len()
    }

    pub fn view(&self, rows: Range<usize>) -> GridView {
        build_view(self.columns(), &self.store, &self.pins, &self.sort, rows)
    }
}

/// Pure projection of grid state into header and body cells for the given display rows.
pub fn build_view(
    columns: &[String],
    store: &RecordStore,
    pins: &PinManager,
    sort: &SortState,
    rows: Range<usize>,
) -> GridView {
    let pinned: Vec<bool> = columns.iter().map(|c| pins.is_pinned(c)).collect();

    let headers = columns
        .iter()
        .zip(pinned.iter())
        .map(|(key, &pinned)| HeaderCell {
            key: key.clone(),
            label: label(key),
            indicator: sort.indicator(key),
            pinned,
        })
        .collect();

    let end = rows.end.min(store.len());
    let rows = (rows.start.min(end)..end)
        .filter_map(|idx| store.get(idx))
        .map(|record| {
            columns
                .iter()
                .zip(pinned.iter())
                .map(|(key, &pinned)| BodyCell {
                    content: CellContent::from_value(record.get(key.as_str())),
                    pinned,
                })
                .collect()
        })
        .collect();

    GridView { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Value, fallback_records};

    fn column_order(grid: &Grid) -> Vec<&str> {
        grid.columns().iter().map(|c| c.as_str()).collect()
    }

    fn first_column_values(grid: &Grid, key: &str) -> Vec<String> {
        grid.store()
            .rows()
            .map(|r| r.get(key).map(Value::raw).unwrap_or_default())
            .collect()
    }

    #[test]
    fn modifier_pins_without_sorting() {
        let mut grid = Grid::new(fallback_records());
        grid.activate_header("population", true);
        assert_eq!(grid.pinned(), ["population"]);
        assert_eq!(grid.sort_state(), &SortState::Unsorted);
        assert_eq!(first_column_values(&grid, "state"), vec!["Alabama", "Alaska"]);
    }

    #[test]
    fn plain_click_sorts_without_pinning() {
        let mut grid = Grid::new(fallback_records());
        grid.activate_header("population", false);
        assert!(grid.pinned().is_empty());
        assert_eq!(first_column_values(&grid, "state"), vec!["Alaska", "Alabama"]);
        assert_eq!(column_order(&grid), vec!["state", "abbreviation", "population", "size"]);
    }

    #[test]
    fn pin_state_then_population() {
        let mut grid = Grid::new(fallback_records());
        grid.activate_header("state", true);
        grid.activate_header("population", true);
        assert_eq!(column_order(&grid), vec!["state", "population", "abbreviation", "size"]);
    }

    #[test]
    fn view_carries_labels_indicators_and_pins() {
        let mut grid = Grid::new(fallback_records());
        grid.activate_header("size", true);
        grid.activate_header("population", false);
        let view = grid.view(0..10);

        let labels: Vec<&str> = view.headers.iter().map(|h| h.label.as_str()).collect();
        assert_eq!(labels, vec!["Size", "State", "Abbreviation", "Population"]);
        assert!(view.headers[0].pinned);
        assert_eq!(view.headers[3].indicator, Some(SortIndicator::DescendingReady));
        assert!(view.headers.iter().take(3).all(|h| h.indicator.is_none()));

        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0][1].content, CellContent::Text("Alaska".into()));
        assert_eq!(view.rows[0][3].content, CellContent::Number("731,158".into()));
        assert!(view.rows[0][0].pinned && !view.rows[0][1].pinned);
    }

    #[test]
    fn missing_field_renders_empty_cell() {
        let mut records = fallback_records();
        records[1].shift_remove("size");
        records[1].insert("_id".into(), Value::Number(7.0));
        let grid = Grid::new(records);
        let view = grid.view(0..2);
        assert_eq!(view.headers.len(), 4);
        assert_eq!(view.rows[1][3].content, CellContent::Empty);
    }

    #[test]
    fn view_window_is_clamped() {
        let grid = Grid::new(fallback_records());
        assert_eq!(grid.view(1..50).rows.len(), 1);
        assert!(grid.view(5..9).rows.is_empty());
        assert!(Grid::new(Vec::new()).view(0..10).headers.is_empty());
    }

    #[test]
    fn reload_resets_sort_and_keeps_pins() {
        let mut grid = Grid::new(fallback_records());
        grid.activate_header("abbreviation", true);
        grid.activate_header("population", false);
        grid.replace_records(fallback_records());
        assert_eq!(grid.sort_state(), &SortState::Unsorted);
        assert_eq!(first_column_values(&grid, "state"), vec!["Alabama", "Alaska"]);
        assert_eq!(column_order(&grid)[0], "abbreviation");
    }
}
