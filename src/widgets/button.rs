use std::any::Any;

use crossterm::event::{KeyCode, KeyEvent};
use crossterm::style::Color;

use crate::backend::MouseButtons;
use crate::geometry::Rect;
use crate::style::{self, Style, TextAttr};
use crate::surface::Surface;
use crate::widget::{Widget, WidgetBase};
use crate::width::center;

type Callback = Box<dyn FnMut()>;

/// A clickable push button.
///
/// Mouse interaction is a two-state machine: a left press inside the rect
/// arms the button, the matching release fires `on_release` and `on_click`.
/// Enter or Space clicks a focused button directly.
pub struct Button {
    base: WidgetBase,
    text: String,
    normal_style: Style,
    pressed_style: Style,
    on_press: Option<Callback>,
    on_release: Option<Callback>,
    on_click: Option<Callback>,
    pressed: bool,
}

impl Button {
    pub fn new(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::new(rect),
            text: text.into(),
            normal_style: style::resolve(Color::White, Color::Reset, TextAttr::Reverse),
            pressed_style: style::resolve(Color::White, Color::Reset, TextAttr::Normal),
            on_press: None,
            on_release: None,
            on_click: None,
            pressed: false,
        }
    }

    pub fn named(rect: Rect, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::named(rect, name),
            ..Self::new(rect, text)
        }
    }

    pub fn with_normal_style(mut self, style: Style) -> Self {
        self.normal_style = style;
        self
    }

    pub fn with_pressed_style(mut self, style: Style) -> Self {
        self.pressed_style = style;
        self
    }

    pub fn with_on_press(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_press = Some(Box::new(callback));
        self
    }

    pub fn with_on_release(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_release = Some(Box::new(callback));
        self
    }

    pub fn with_on_click(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_click = Some(Box::new(callback));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.base.request_repaint();
    }

    pub fn pressed(&self) -> bool {
        self.pressed
    }

    /// Fire the click callback programmatically.
    pub fn click(&mut self) {
        if let Some(callback) = self.on_click.as_mut() {
            callback();
        }
    }
}

impl Widget for Button {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn paint(&self, surface: &mut dyn Surface) {
        let rect = self.rect();
        let label = center(&self.text, rect.width as usize);
        let style = if self.pressed {
            self.pressed_style
        } else {
            self.normal_style
        };
        surface.write_text(rect.x, rect.y, &label, style);
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if !self.focused() {
            return false;
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.click();
                self.base.request_repaint();
                true
            }
            _ => false,
        }
    }

    fn handle_mouse(&mut self, x: u16, y: u16, buttons: MouseButtons) -> bool {
        if !self.base.rect.contains(x, y) {
            return false;
        }
        if !self.pressed && buttons.contains(MouseButtons::LEFT_PRESSED) {
            self.pressed = true;
            self.base.request_repaint();
            if let Some(callback) = self.on_press.as_mut() {
                callback();
            }
            return true;
        }
        if self.pressed && buttons.contains(MouseButtons::LEFT_RELEASED) {
            self.pressed = false;
            self.base.request_repaint();
            if let Some(callback) = self.on_release.as_mut() {
                callback();
            }
            if let Some(callback) = self.on_click.as_mut() {
                callback();
            }
            return true;
        }
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::surface::CellBuffer;
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let bump = Arc::clone(&count);
        (count, move || {
            bump.fetch_add(1, Ordering::Relaxed);
        })
    }

    #[test]
    fn label_is_centered() {
        let button = Button::new(Rect::new(0, 0, 8, 1), "OK");
        let mut buf = CellBuffer::new(Size::new(8, 1));
        button.paint(&mut buf);
        assert_eq!(buf.row_text(0), "   OK   ");
    }

    #[test]
    fn enter_clicks_only_when_focused() {
        let (clicks, on_click) = counter();
        let mut button = Button::new(Rect::new(0, 0, 8, 1), "OK").with_on_click(on_click);

        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert!(!button.handle_key(enter));
        assert_eq!(clicks.load(Ordering::Relaxed), 0);

        button.set_focused(true);
        assert!(button.handle_key(enter));
        assert_eq!(clicks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn press_release_cycle_fires_callbacks_in_order() {
        let (presses, on_press) = counter();
        let (releases, on_release) = counter();
        let (clicks, on_click) = counter();
        let mut button = Button::new(Rect::new(2, 0, 6, 1), "go")
            .with_on_press(on_press)
            .with_on_release(on_release)
            .with_on_click(on_click);

        assert!(button.handle_mouse(3, 0, MouseButtons::LEFT_PRESSED));
        assert!(button.pressed());
        assert_eq!(presses.load(Ordering::Relaxed), 1);
        assert_eq!(clicks.load(Ordering::Relaxed), 0);

        assert!(button.handle_mouse(3, 0, MouseButtons::LEFT_RELEASED));
        assert!(!button.pressed());
        assert_eq!(releases.load(Ordering::Relaxed), 1);
        assert_eq!(clicks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let (clicks, on_click) = counter();
        let mut button = Button::new(Rect::new(0, 0, 4, 1), "x").with_on_click(on_click);

        assert!(!button.handle_mouse(1, 0, MouseButtons::LEFT_RELEASED));
        assert_eq!(clicks.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn mouse_outside_rect_is_ignored() {
        let mut button = Button::new(Rect::new(0, 0, 4, 1), "x");
        assert!(!button.handle_mouse(5, 0, MouseButtons::LEFT_PRESSED));
        assert!(!button.pressed());
    }

    #[test]
    fn pressed_state_switches_paint_style() {
        let mut button = Button::new(Rect::new(0, 0, 4, 1), "x");
        let mut buf = CellBuffer::new(Size::new(4, 1));

        button.paint(&mut buf);
        let normal = buf.cell(0, 0).unwrap().style;

        button.handle_mouse(1, 0, MouseButtons::LEFT_PRESSED);
        button.paint(&mut buf);
        let pressed = buf.cell(0, 0).unwrap().style;
        assert_ne!(normal, pressed);
    }
}
