use arboard::Clipboard;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};
use unicode_width::UnicodeWidthStr;

use crate::columns::label;
use crate::domain::{DataSource, GridConfig, GridError, HELP_TEXT, Message};
use crate::format::CellContent;
use crate::grid::{BodyCell, Grid, HeaderCell};
use crate::record::{Record, fallback_records};
use crate::sort::SortState;
use crate::source::{self, LoadResult};
use crate::ui::{COLUMN_SPACING, SORT_INDICATOR_WIDTH, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    LOADING,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
}

pub struct UIData {
    pub name: String,
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<Vec<BodyCell>>,
    pub widths: Vec<u16>,
    pub nrows: usize, // Total number of rows in the grid
    pub selected_row: Option<usize>, // Relative to the first rendered row
    pub selected_column: Option<usize>, // Index into `headers`
    pub abs_selected_row: usize,
    pub sort_description: String,
    pub pinned: Vec<String>,
    pub show_popup: bool,
    pub popup_message: String,
    pub loading: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            widths: Vec::new(),
            nrows: 0,
            selected_row: None,
            selected_column: None,
            abs_selected_row: 0,
            sort_description: String::new(),
            pinned: Vec::new(),
            show_popup: false,
            popup_message: String::new(),
            loading: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width,
            table_height: ui_height.saturating_sub(STATUSLINE_HEIGHT + TABLE_HEADER_HEIGHT),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: GridConfig,
    pub status: Status,
    modus: Modus,
    grid: Grid,
    name: String,
    loader: Option<Receiver<LoadResult>>,
    column_widths: HashMap<String, usize>,
    cursor_row: usize, // Absolute display row
    offset_row: usize,
    cursor_column: usize, // Index into the grid's column order
    offset_column: usize, // Scroll position inside the unpinned block
    visible_columns: Vec<(usize, u16)>, // Column index and render width
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &GridConfig, ui_width: usize, ui_height: usize) -> Result<Self, GridError> {
        let loader = source::spawn_load(&config.source);
        let status = if loader.is_some() {
            Status::LOADING
        } else {
            Status::READY
        };
        let mut model = Self {
            config: config.clone(),
            status,
            modus: Modus::TABLE,
            grid: Grid::new(fallback_records()),
            name: Self::source_name(&config.source),
            loader,
            column_widths: HashMap::new(),
            cursor_row: 0,
            offset_row: 0,
            cursor_column: 0,
            offset_column: 0,
            visible_columns: Vec::new(),
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.calculate_column_widths();
        if model.status == Status::LOADING {
            model.set_status_message("Loading ...");
        } else {
            model.set_status_message("Showing built-in sample rows");
        }
        model.update_table_data();
        Ok(model)
    }

    fn source_name(source: &DataSource) -> String {
        match source {
            DataSource::Url(url) => url.rsplit('/').next().unwrap_or(url).to_string(),
            DataSource::File(path) => path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("???")
                .to_string(),
            DataSource::Offline => "sample".to_string(),
        }
    }

    /// Applies a finished load, if any. Called once per event loop tick.
    pub fn poll_loader(&mut self) {
        let Some(loader) = &self.loader else {
            return;
        };
        match loader.try_recv() {
            Ok(result) => {
                self.loader = None;
                self.apply_load(result);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                error!("Loader stopped without a result");
                self.loader = None;
                self.status = Status::READY;
                self.set_status_message("Loading stopped, keeping current rows");
                self.update_table_data();
            }
        }
    }

    fn apply_load(&mut self, result: LoadResult) {
        self.status = Status::READY;
        match result {
            Ok(records) => self.load_records(records),
            Err(e) => {
                if let GridError::Fetch { trace, .. } = &e {
                    warn!("Loading failed: {e}\n{trace}");
                } else {
                    warn!("Loading failed: {e}");
                }
                self.set_status_message(format!(
                    "Loading failed ({e}), showing {} rows",
                    self.grid.nrows()
                ));
                self.update_table_data();
            }
        }
    }

    pub fn load_records(&mut self, records: Vec<Record>) {
        let nrecords = records.len();
        self.grid.replace_records(records);
        self.calculate_column_widths();
        self.cursor_row = 0;
        self.offset_row = 0;
        self.cursor_column = 0;
        self.offset_column = 0;
        info!("Loaded {nrecords} records");
        self.set_status_message(format!("Loaded {nrecords} records"));
        self.update_table_data();
    }

    /// Render width of each column: widest cell or label, capped by the config.
    fn calculate_column_widths(&mut self) {
        let store = self.grid.store();
        let max_column_width = self.config.max_column_width;
        self.column_widths = self
            .grid
            .columns()
            .par_iter()
            .map(|key| {
                let label_width = label(key).width() + SORT_INDICATOR_WIDTH;
                let data_width = store
                    .original()
                    .iter()
                    .map(|r| CellContent::from_value(r.get(key.as_str())).display().width())
                    .max()
                    .unwrap_or(0);
                let width = std::cmp::max(label_width, data_width).min(max_column_width);
                (key.clone(), width.max(1))
            })
            .collect();
        debug!("Column widths: {:?}", self.column_widths);
    }

    fn column_width(&self, key: &str) -> usize {
        self.column_widths.get(key).copied().unwrap_or(1)
    }

    /// Columns that fit on screen: the pinned block, then unpinned ones from the scroll offset.
    fn fit_columns(&self, offset_column: usize) -> Vec<(usize, u16)> {
        let columns = self.grid.columns();
        let npinned = self.grid.pinned().len().min(columns.len());
        let table_width = self.uilayout.table_width;

        let mut visible = Vec::new();
        let mut used = 0;
        for idx in (0..npinned).chain(npinned + offset_column..columns.len()) {
            let width = self.column_width(&columns[idx]);
            if used + width <= table_width {
                visible.push((idx, width as u16));
                used += width + COLUMN_SPACING;
            } else {
                // Add the last partially visible column
                if used < table_width {
                    visible.push((idx, (table_width - used) as u16));
                }
                break;
            }
        }
        visible
    }

    fn update_table_data(&mut self) {
        let ncolumns = self.grid.columns().len();
        let npinned = self.grid.pinned().len();
        let nrows = self.grid.nrows();

        self.cursor_column = self.cursor_column.min(ncolumns.saturating_sub(1));
        self.cursor_row = self.cursor_row.min(nrows.saturating_sub(1));

        // Keep the cursor row on screen
        let height = self.uilayout.table_height.max(1);
        if self.cursor_row < self.offset_row {
            self.offset_row = self.cursor_row;
        } else if self.cursor_row >= self.offset_row + height {
            self.offset_row = self.cursor_row + 1 - height;
        }

        // Keep the cursor column on screen. Pinned columns always are.
        let unpinned = ncolumns.saturating_sub(npinned);
        self.offset_column = self.offset_column.min(unpinned.saturating_sub(1));
        if self.cursor_column >= npinned {
            self.offset_column = self.offset_column.min(self.cursor_column - npinned);
        }
        let mut visible = self.fit_columns(self.offset_column);
        while self.cursor_column >= npinned
            && !visible.iter().any(|&(idx, _)| idx == self.cursor_column)
            && self.offset_column + 1 < unpinned
        {
            self.offset_column += 1;
            visible = self.fit_columns(self.offset_column);
        }
        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, visible {:?}",
            self.cursor_row, self.cursor_column, self.offset_row, self.offset_column, visible
        );
        self.visible_columns = visible;
        self.update_uidata_for_table();
    }

    fn update_uidata_for_table(&mut self) {
        let view = self
            .grid
            .view(self.offset_row..self.offset_row + self.uilayout.table_height);
        let headers = self
            .visible_columns
            .iter()
            .filter_map(|&(idx, _)| view.headers.get(idx).cloned())
            .collect();
        let rows = view
            .rows
            .iter()
            .map(|row| {
                self.visible_columns
                    .iter()
                    .filter_map(|&(idx, _)| row.get(idx).cloned())
                    .collect()
            })
            .collect();
        let nrows = self.grid.nrows();

        self.uidata = UIData {
            name: self.name.clone(),
            headers,
            rows,
            widths: self.visible_columns.iter().map(|&(_, w)| w).collect(),
            nrows,
            selected_row: (nrows > 0).then(|| self.cursor_row - self.offset_row),
            selected_column: self
                .visible_columns
                .iter()
                .position(|&(idx, _)| idx == self.cursor_column),
            abs_selected_row: self.cursor_row,
            sort_description: Self::describe_sort(self.grid.sort_state()),
            pinned: self.grid.pinned().to_vec(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: if self.modus == Modus::POPUP {
                HELP_TEXT.to_string()
            } else {
                String::new()
            },
            loading: self.status == Status::LOADING,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }

    fn describe_sort(sort: &SortState) -> String {
        match sort {
            SortState::Unsorted => String::new(),
            SortState::Ascending(c) => format!("{} ascending", label(c)),
            SortState::Descending(c) => format!("{} descending", label(c)),
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.update_table_data();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), GridError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::Help => self.show_help(),
                    Message::MoveUp => self.move_rows(-1),
                    Message::MoveDown => self.move_rows(1),
                    Message::MovePageUp => self.move_rows(-(self.uilayout.table_height as isize)),
                    Message::MovePageDown => self.move_rows(self.uilayout.table_height as isize),
                    Message::MoveBeginning => self.move_rows(isize::MIN),
                    Message::MoveEnd => self.move_rows(isize::MAX),
                    Message::MoveLeft => self.move_column(-1),
                    Message::MoveRight => self.move_column(1),
                    Message::ActivateFocused(modifier) => self.activate_focused(modifier),
                    Message::Click(x, y, modifier) => self.click(x, y, modifier),
                    Message::CopyCell => self.copy_cell(),
                    Message::CopyRow => self.copy_row(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Help | Message::Click(..) => self.exit_popup(),
                    _ => (),
                },
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn show_help(&mut self) {
        self.modus = Modus::POPUP;
        self.update_uidata_for_table();
    }

    fn exit_popup(&mut self) {
        self.modus = Modus::TABLE;
        self.update_uidata_for_table();
    }

    fn move_rows(&mut self, delta: isize) {
        let last = self.grid.nrows().saturating_sub(1);
        self.cursor_row = self.cursor_row.saturating_add_signed(delta).min(last);
        self.update_table_data();
    }

    fn move_column(&mut self, delta: isize) {
        let last = self.grid.columns().len().saturating_sub(1);
        self.cursor_column = self.cursor_column.saturating_add_signed(delta).min(last);
        self.update_table_data();
    }

    fn focused_column(&self) -> Option<String> {
        self.grid.columns().get(self.cursor_column).cloned()
    }

    fn activate_focused(&mut self, modifier: bool) {
        if let Some(key) = self.focused_column() {
            self.activate(&key, modifier);
        }
    }

    fn activate(&mut self, key: &str, modifier: bool) {
        self.grid.activate_header(key, modifier);
        // The focus follows the column when pinning moves it.
        if let Some(pos) = self.grid.columns().iter().position(|c| c == key) {
            self.cursor_column = pos;
        }
        if modifier {
            let verb = if self.grid.pinned().iter().any(|p| p == key) {
                "Pinned"
            } else {
                "Unpinned"
            };
            self.set_status_message(format!("{verb} {}", label(key)));
        } else {
            let description = Self::describe_sort(self.grid.sort_state());
            if description.is_empty() {
                self.set_status_message("Original order");
            } else {
                self.set_status_message(format!("Sorted by {description}"));
            }
        }
        self.update_table_data();
    }

    /// Visible column under the terminal x coordinate.
    fn column_at(&self, x: u16) -> Option<usize> {
        let mut start = 0u16;
        for &(idx, width) in self.visible_columns.iter() {
            let end = start.saturating_add(width);
            if x >= start && x < end {
                return Some(idx);
            }
            start = end.saturating_add(COLUMN_SPACING as u16);
        }
        None
    }

    fn click(&mut self, x: u16, y: u16, modifier: bool) {
        let Some(idx) = self.column_at(x) else {
            trace!("Click at {x}:{y} outside of any column");
            return;
        };
        let header_rows = TABLE_HEADER_HEIGHT as u16;
        if y < header_rows {
            if let Some(key) = self.grid.columns().get(idx).cloned() {
                self.activate(&key, modifier);
            }
        } else if ((y - header_rows) as usize) < self.uilayout.table_height {
            let row = self.offset_row + (y - header_rows) as usize;
            if row < self.grid.nrows() {
                self.cursor_row = row;
                self.cursor_column = idx;
                self.update_table_data();
            }
        }
    }

    fn focused_record(&self) -> Option<&Record> {
        self.grid.store().get(self.cursor_row)
    }

    fn copy_to_clipboard(&mut self, content: String, what: &str) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Clipboard unavailable: {e}");
                    self.set_status_message(format!("Clipboard unavailable: {e}"));
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(()) => self.set_status_message(format!("Copied {what}")),
                Err(e) => {
                    error!("Copy failed: {e}");
                    self.set_status_message(format!("Copy failed: {e}"));
                }
            }
        }
    }

    fn copy_cell(&mut self) {
        let value = match (self.focused_record(), self.focused_column()) {
            (Some(record), Some(key)) => record.get(&key).map(|v| v.raw()).unwrap_or_default(),
            _ => return,
        };
        self.copy_to_clipboard(value, "cell");
    }

    fn copy_row(&mut self) {
        let Some(record) = self.focused_record() else {
            return;
        };
        let row = self
            .grid
            .columns()
            .iter()
            .map(|key| record.get(key).map(|v| v.raw()).unwrap_or_default())
            .collect::<Vec<String>>()
            .join("\t");
        self.copy_to_clipboard(row, "row");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use crate::sort::SortIndicator;

    fn model() -> Model {
        let config = GridConfig::default().source(DataSource::Offline);
        Model::init(&config, 80, 10).unwrap()
    }

    fn labels(model: &Model) -> Vec<String> {
        model.get_uidata().headers.iter().map(|h| h.label.clone()).collect()
    }

    fn first_cells(model: &Model) -> Vec<CellContent> {
        model
            .get_uidata()
            .rows
            .iter()
            .map(|r| r[0].content.clone())
            .collect()
    }

    #[test]
    fn starts_with_sample_rows() {
        let m = model();
        assert_eq!(m.status, Status::READY);
        assert_eq!(labels(&m), vec!["State", "Abbreviation", "Population", "Size"]);
        assert_eq!(m.get_uidata().nrows, 2);
        assert_eq!(m.get_uidata().selected_column, Some(0));
    }

    #[test]
    fn keyboard_sort_cycle_on_focused_column() {
        let mut m = model();
        m.update(Some(Message::MoveRight)).unwrap();
        m.update(Some(Message::MoveRight)).unwrap();
        m.update(Some(Message::ActivateFocused(false))).unwrap();
        assert_eq!(
            first_cells(&m),
            vec![CellContent::Text("Alaska".into()), CellContent::Text("Alabama".into())]
        );
        assert_eq!(
            m.get_uidata().headers[2].indicator,
            Some(SortIndicator::DescendingReady)
        );
        assert_eq!(m.get_uidata().sort_description, "Population ascending");

        m.update(Some(Message::ActivateFocused(false))).unwrap();
        m.update(Some(Message::ActivateFocused(false))).unwrap();
        assert_eq!(m.get_uidata().sort_description, "");
        assert!(m.get_uidata().headers.iter().all(|h| h.indicator.is_none()));
    }

    #[test]
    fn modifier_click_on_header_pins() {
        let mut m = model();
        // Columns are 7, 14, 12 and 10 wide with one space between them.
        let population_x = 7 + 1 + 14 + 1 + 2;
        m.update(Some(Message::Click(population_x, 0, true))).unwrap();
        assert_eq!(labels(&m), vec!["Population", "State", "Abbreviation", "Size"]);
        assert!(m.get_uidata().headers[0].pinned);
        assert_eq!(m.get_uidata().selected_column, Some(0));
        assert_eq!(m.get_uidata().status_message, "Pinned Population");
    }

    #[test]
    fn plain_click_on_header_sorts() {
        let mut m = model();
        m.update(Some(Message::Click(1, 0, false))).unwrap();
        assert_eq!(m.get_uidata().sort_description, "State ascending");
        assert!(m.get_uidata().pinned.is_empty());
    }

    #[test]
    fn click_on_body_selects_row() {
        let mut m = model();
        m.update(Some(Message::Click(1, 2, false))).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 1);
        m.update(Some(Message::Click(1, 7, false))).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 1);
    }

    #[test]
    fn row_cursor_is_clamped() {
        let mut m = model();
        m.update(Some(Message::MoveEnd)).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 1);
        m.update(Some(Message::MovePageDown)).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 1);
        m.update(Some(Message::MoveBeginning)).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn narrow_terminal_scrolls_unpinned_columns() {
        let config = GridConfig::default().source(DataSource::Offline);
        let mut m = Model::init(&config, 30, 10).unwrap();
        m.update(Some(Message::ActivateFocused(true))).unwrap();
        for _ in 0..3 {
            m.update(Some(Message::MoveRight)).unwrap();
        }
        let headers = labels(&m);
        assert_eq!(headers.first().map(|s| s.as_str()), Some("State"));
        assert!(headers.iter().any(|h| h == "Size"));
        assert_eq!(m.get_uidata().selected_column, Some(headers.len() - 1));
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut m = model();
        m.update(Some(Message::Help)).unwrap();
        assert!(m.get_uidata().show_popup);
        m.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(m.get_uidata().abs_selected_row, 0);
        m.update(Some(Message::Exit)).unwrap();
        assert!(!m.get_uidata().show_popup);
        m.update(Some(Message::Quit)).unwrap();
        assert_eq!(m.status, Status::QUITTING);
    }

    #[test]
    fn loaded_records_replace_the_sample() {
        let mut m = model();
        m.update(Some(Message::ActivateFocused(false))).unwrap();
        let mut record = Record::new();
        record.insert("name".into(), Value::Text("Ohio".into()));
        record.insert("_id".into(), Value::Number(1.0));
        m.load_records(vec![record]);
        assert_eq!(labels(&m), vec!["Name"]);
        assert_eq!(m.get_uidata().sort_description, "");
        assert_eq!(m.get_uidata().status_message, "Loaded 1 records");
    }

    #[test]
    fn failed_load_keeps_rows() {
        let mut m = model();
        m.apply_load(Err(GridError::fetch("timeout")));
        assert_eq!(m.get_uidata().nrows, 2);
        assert!(m.get_uidata().status_message.starts_with("Loading failed"));
    }

    #[test]
    fn file_source_is_loaded_in_the_background() {
        let path = std::env::temp_dir().join(format!("tg-{}-model.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"name": "Ohio", "population": 1}, {"name": "Utah", "population": 2}]"#,
        )
        .unwrap();
        let config = GridConfig::default().source(DataSource::File(path.clone()));
        let mut m = Model::init(&config, 80, 10).unwrap();
        assert_eq!(m.status, Status::LOADING);
        m.update(Some(Message::ActivateFocused(false))).unwrap();
        assert_eq!(m.get_uidata().sort_description, "State ascending");

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while m.status != Status::READY && Instant::now() < deadline {
            m.poll_loader();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        std::fs::remove_file(path).ok();

        assert_eq!(m.status, Status::READY);
        assert_eq!(labels(&m), vec!["Name", "Population"]);
        assert_eq!(m.get_uidata().nrows, 2);
        assert_eq!(m.get_uidata().sort_description, "");
        assert_eq!(m.get_uidata().status_message, "Loaded 2 records");
    }

    #[test]
    fn vanished_loader_keeps_rows() {
        let mut m = model();
        let (tx, rx) = std::sync::mpsc::channel();
        drop(tx);
        m.loader = Some(rx);
        m.status = Status::LOADING;
        m.poll_loader();
        assert_eq!(m.status, Status::READY);
        assert!(m.loader.is_none());
        assert_eq!(m.get_uidata().nrows, 2);
        assert_eq!(
            m.get_uidata().status_message,
            "Loading stopped, keeping current rows"
        );
    }
}
