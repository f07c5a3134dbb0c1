use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use crate::columns::label;
use crate::format::{CellContent, visible_name};
use crate::grid::{BodyCell, HeaderCell};
use crate::model::{Model, UIData};

pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const COLUMN_SPACING: usize = 1;
/// Room reserved next to a header label for the sort marker.
pub const SORT_INDICATOR_WIDTH: usize = 2;

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const PINNED_COLOR: Color = Color::Yellow;
const IMAGE_COLOR: Color = Color::Cyan;

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        if uidata.headers.is_empty() {
            let text = if uidata.loading { "Loading ..." } else { "No data" };
            frame.render_widget(Paragraph::new(text).centered(), table_area);
        } else {
            frame.render_widget(Self::build_table(uidata), table_area);
        }
        frame.render_widget(Self::build_statusline(uidata), status_area);

        if uidata.show_popup {
            Self::draw_popup(frame, &uidata.popup_message);
        }
    }

    fn header_cell(header: &HeaderCell, width: usize, selected: bool) -> Cell<'static> {
        let label_width = match header.indicator {
            Some(_) => width.saturating_sub(SORT_INDICATOR_WIDTH),
            None => width,
        };
        let mut spans = vec![Span::raw(visible_name(&header.label, label_width))];
        if let Some(indicator) = header.indicator {
            spans.push(Span::raw(" "));
            spans.push(indicator.symbol().bold());
        }
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if header.pinned {
            style = style.fg(PINNED_COLOR);
        }
        if selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(Line::from(spans)).style(style)
    }

    fn body_cell(cell: &BodyCell, width: usize, selected: bool) -> Cell<'static> {
        let text = visible_name(&cell.content.display(), width);
        let line = match cell.content {
            CellContent::Number(_) => Line::from(text).right_aligned(),
            CellContent::Image(_) => Line::from(text.fg(IMAGE_COLOR)),
            CellContent::Text(_) | CellContent::Empty => Line::from(text),
        };
        let mut style = Style::default();
        if cell.pinned {
            style = style.fg(PINNED_COLOR);
        }
        if selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(line).style(style)
    }

    fn build_table(uidata: &UIData) -> Table<'static> {
        let width = |c: usize| uidata.widths.get(c).copied().unwrap_or_default() as usize;
        let header = Row::new(
            uidata
                .headers
                .iter()
                .enumerate()
                .map(|(i, h)| Self::header_cell(h, width(i), uidata.selected_column == Some(i))),
        )
        .height(TABLE_HEADER_HEIGHT as u16);

        let rows = uidata.rows.iter().enumerate().map(|(r, row)| {
            let selected_row = uidata.selected_row == Some(r);
            let cells = row.iter().enumerate().map(|(c, cell)| {
                Self::body_cell(cell, width(c), selected_row && uidata.selected_column == Some(c))
            });
            let style = if selected_row {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(cells).style(style)
        });

        let widths = uidata.widths.iter().map(|&w| Constraint::Length(w));
        Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING as u16)
            .flex(Flex::Start)
    }

    fn build_statusline(uidata: &UIData) -> Paragraph<'static> {
        let mut spans = vec![
            format!(" {} ", uidata.name).black().on_blue().bold(),
            Span::raw(format!(
                " {}/{} ",
                (uidata.abs_selected_row + 1).min(uidata.nrows),
                uidata.nrows
            )),
        ];
        if !uidata.sort_description.is_empty() {
            spans.push(format!("| sorted: {} ", uidata.sort_description).into());
        }
        if !uidata.pinned.is_empty() {
            let pinned: Vec<String> = uidata.pinned.iter().map(|k| label(k)).collect();
            spans.push(format!("| pinned: {} ", pinned.join(", ")).fg(PINNED_COLOR));
        }
        if uidata.loading || uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT {
            spans.push(format!("| {}", uidata.status_message).italic());
        }
        Paragraph::new(Line::from(spans))
    }

    fn draw_popup(frame: &mut Frame, message: &str) {
        let area = Self::popup_area(frame.area(), 60, 80);
        let popup = Paragraph::new(message.to_string())
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(" Help ".bold()));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }

    fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
        let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
            .flex(Flex::Center)
            .areas(area);
        area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataSource, GridConfig, Message};
    use ratatui::{Terminal, backend::TestBackend};

    fn render(model: &Model, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        let mut ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| (0..width).map(|x| buffer[(x, y)].symbol()).collect())
            .collect()
    }

    fn model() -> Model {
        let config = GridConfig::default().source(DataSource::Offline);
        Model::init(&config, 80, 8).unwrap()
    }

    #[test]
    fn draws_headers_rows_and_statusline() {
        let lines = render(&model(), 80, 8);
        assert!(lines[0].starts_with("State"));
        assert!(lines[0].contains("Abbreviation"));
        assert!(lines[0].contains("Population"));
        assert!(lines[1].contains("Alabama"));
        assert!(lines[1].contains("4,921,532"));
        assert!(lines[2].contains("665,384.04"));
        assert!(lines[7].contains("sample"));
        assert!(lines[7].contains("1/2"));
    }

    #[test]
    fn active_column_shows_indicator() {
        let mut m = model();
        m.update(Some(Message::ActivateFocused(false))).unwrap();
        let lines = render(&m, 80, 8);
        assert!(lines[0].contains("⬇"));
        assert!(lines[7].contains("sorted: State ascending"));

        m.update(Some(Message::ActivateFocused(false))).unwrap();
        let lines = render(&m, 80, 8);
        assert!(lines[0].contains("⬆"));
        assert!(!lines[0].contains("⬇"));
    }

    #[test]
    fn pinned_columns_are_listed() {
        let mut m = model();
        m.update(Some(Message::MoveRight)).unwrap();
        m.update(Some(Message::ActivateFocused(true))).unwrap();
        let lines = render(&m, 80, 8);
        assert!(lines[0].starts_with("Abbreviation"));
        assert!(lines[7].contains("pinned: Abbreviation"));
    }

    #[test]
    fn wide_labels_and_cells_are_cut() {
        use crate::record::Record;

        let config = GridConfig::default()
            .source(DataSource::Offline)
            .max_column_width(8);
        let mut m = Model::init(&config, 80, 8).unwrap();
        let mut record = Record::new();
        record.insert("verylongcolumnname".into(), "abcdefghijkl".into());
        record.insert("id".into(), "x".into());
        m.load_records(vec![record]);
        let lines = render(&m, 80, 8);
        assert!(lines[0].starts_with("Veryl..."));
        assert!(lines[0].contains("Id"));
        assert!(lines[1].starts_with("abcde..."));
    }

    #[test]
    fn help_popup_is_drawn() {
        let mut m = model();
        m.update(Some(Message::Help)).unwrap();
        let lines = render(&m, 80, 24);
        assert!(lines.iter().any(|l| l.contains("Help")));
    }
}
