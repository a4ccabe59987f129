use std::time::Duration;

use bitflags::bitflags;
use crossterm::event::{
    Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};

use crate::error::Result;
use crate::geometry::Size;
use crate::surface::CellBuffer;

mod term;

pub use term::TermBackend;
pub use test::TestBackend;

bitflags! {
    /// Mouse button/state mask delivered with every mouse event, so a widget
    /// can match press and release in a single dispatch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MouseButtons: u16 {
        const LEFT_PRESSED = 1 << 0;
        const LEFT_RELEASED = 1 << 1;
        const MIDDLE_PRESSED = 1 << 2;
        const MIDDLE_RELEASED = 1 << 3;
        const RIGHT_PRESSED = 1 << 4;
        const RIGHT_RELEASED = 1 << 5;
        const DRAG = 1 << 6;
        const MOTION = 1 << 7;
        const SCROLL_UP = 1 << 8;
        const SCROLL_DOWN = 1 << 9;
    }
}

/// Input delivered by a backend to the panel stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse {
        x: u16,
        y: u16,
        buttons: MouseButtons,
    },
    Resize(Size),
}

/// Terminal capability consumed by the runtime: size queries, non-blocking
/// input, and frame presentation.
pub trait Backend {
    fn size(&self) -> Size;

    /// Poll for the next input event, waiting at most `timeout`. Returns
    /// `None` once no event is pending. Undecodable input is dropped
    /// without ending the poll.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>>;

    /// Present a composited screen buffer. Called at most once per frame.
    fn present(&mut self, screen: &CellBuffer) -> Result<()>;

    fn enter(&mut self) -> Result<()> {
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Map a raw crossterm event onto the runtime's input model. Events with no
/// mapping (focus changes, key releases, paste chunks) decode to `None` and
/// are dropped by the caller.
pub(crate) fn map_event(event: CrosstermEvent) -> Option<InputEvent> {
    match event {
        CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => {
            Some(InputEvent::Key(key))
        }
        CrosstermEvent::Mouse(mouse) => map_mouse(mouse),
        CrosstermEvent::Resize(width, height) => Some(InputEvent::Resize(Size::new(width, height))),
        _ => None,
    }
}

fn map_mouse(mouse: MouseEvent) -> Option<InputEvent> {
    let buttons = match mouse.kind {
        MouseEventKind::Down(button) => press_mask(button),
        MouseEventKind::Up(button) => release_mask(button),
        MouseEventKind::Drag(_) => MouseButtons::DRAG,
        MouseEventKind::Moved => MouseButtons::MOTION,
        MouseEventKind::ScrollUp => MouseButtons::SCROLL_UP,
        MouseEventKind::ScrollDown => MouseButtons::SCROLL_DOWN,
        _ => return None,
    };
    Some(InputEvent::Mouse {
        x: mouse.column,
        y: mouse.row,
        buttons,
    })
}

fn press_mask(button: MouseButton) -> MouseButtons {
    match button {
        MouseButton::Left => MouseButtons::LEFT_PRESSED,
        MouseButton::Middle => MouseButtons::MIDDLE_PRESSED,
        MouseButton::Right => MouseButtons::RIGHT_PRESSED,
    }
}

fn release_mask(button: MouseButton) -> MouseButtons {
    match button {
        MouseButton::Left => MouseButtons::LEFT_RELEASED,
        MouseButton::Middle => MouseButtons::MIDDLE_RELEASED,
        MouseButton::Right => MouseButtons::RIGHT_RELEASED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn key_press_maps_and_release_is_dropped() {
        let press = CrosstermEvent::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        assert!(matches!(map_event(press), Some(InputEvent::Key(_))));

        let mut release = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_event(CrosstermEvent::Key(release)), None);
    }

    #[test]
    fn mouse_down_carries_press_mask_and_position() {
        let event = CrosstermEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 7,
            row: 3,
            modifiers: KeyModifiers::NONE,
        });
        let mapped = map_event(event).unwrap();
        assert_eq!(
            mapped,
            InputEvent::Mouse {
                x: 7,
                y: 3,
                buttons: MouseButtons::LEFT_PRESSED,
            }
        );
    }

    #[test]
    fn resize_maps_to_new_size() {
        assert_eq!(
            map_event(CrosstermEvent::Resize(80, 24)),
            Some(InputEvent::Resize(Size::new(80, 24)))
        );
    }

    #[test]
    fn focus_events_are_dropped() {
        assert_eq!(map_event(CrosstermEvent::FocusGained), None);
        assert_eq!(map_event(CrosstermEvent::FocusLost), None);
    }
}
