use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::domain::{GridConfig, GridError, Message};

/// Any of these held during a click pins instead of sorting.
const PIN_MODIFIERS: KeyModifiers = KeyModifiers::ALT
    .union(KeyModifiers::CONTROL)
    .union(KeyModifiers::SUPER)
    .union(KeyModifiers::META);

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &GridConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self) -> Result<Option<Message>, GridError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(self.map_event(event::read()?));
        }
        Ok(None)
    }

    fn map_event(&self, event: Event) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let pin = key.modifiers.intersects(PIN_MODIFIERS);
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Enter => Some(Message::ActivateFocused(pin)),
            KeyCode::Char('s') => Some(Message::ActivateFocused(false)),
            KeyCode::Char('p') => Some(Message::ActivateFocused(true)),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Option<Message> {
        let message = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Message::Click(
                mouse.column,
                mouse.row,
                mouse.modifiers.intersects(PIN_MODIFIERS),
            )),
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            _ => None,
        };
        if message.is_some() {
            trace!("Mapped: {mouse:?} => {message:?}");
        }
        message
    }
}
