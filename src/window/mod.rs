use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::event::{KeyCode, KeyEvent};

use crate::backend::MouseButtons;
use crate::error::{Error, Result};
use crate::geometry::{Rect, Size};
use crate::style::{self, Style, TextAttr};
use crate::surface::{BoxLines, CellBuffer, Surface, draw_box};
use crate::widget::{RepaintHandle, Widget};

/// Border rendering for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    Single,
    Double,
    None,
}

/// Hook invoked when the terminal is resized, bottom-to-top across the
/// panel stack. The runtime only notifies; any geometry reaction is the
/// application's.
pub type ResizeHook = Box<dyn FnMut(&mut Window, Size)>;

/// A top-level bordered region with its own widget tree and z-order slot.
///
/// Each window retains a cell buffer sized to its rectangle and a single
/// dirty bit. A clean window is skipped entirely during the paint phase;
/// the whole window repaints atomically when any contained widget changed.
pub struct Window {
    rect: Rect,
    title: String,
    name: Option<String>,
    border: BorderStyle,
    border_style: Style,
    title_style: Style,
    active_style: Style,
    background: Style,
    active: bool,
    visible: bool,
    widgets: Vec<Box<dyn Widget>>,
    names: HashMap<String, usize>,
    focused: Option<usize>,
    buffer: CellBuffer,
    dirty: Arc<AtomicBool>,
    screen: Size,
    on_resize: Option<ResizeHook>,
}

impl Window {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            title: String::new(),
            name: None,
            border: BorderStyle::Single,
            border_style: Style::DEFAULT,
            title_style: style::resolve(
                crossterm::style::Color::Reset,
                crossterm::style::Color::Reset,
                TextAttr::Reverse,
            ),
            active_style: Style::DEFAULT,
            background: Style::DEFAULT,
            active: false,
            visible: true,
            widgets: Vec::new(),
            names: HashMap::new(),
            focused: None,
            buffer: CellBuffer::new(rect.size()),
            dirty: Arc::new(AtomicBool::new(true)),
            screen: Size::new(0, 0),
            on_resize: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    pub fn with_border_style(mut self, style: Style) -> Self {
        self.border_style = style;
        self
    }

    pub fn with_title_style(mut self, style: Style) -> Self {
        self.title_style = style;
        self
    }

    pub fn with_active_style(mut self, style: Style) -> Self {
        self.active_style = style;
        self
    }

    pub fn with_background(mut self, style: Style) -> Self {
        self.background = style;
        self
    }

    pub fn with_resize_hook(mut self, hook: impl FnMut(&mut Window, Size) + 'static) -> Self {
        self.on_resize = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.request_repaint();
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        if self.active != active {
            self.active = active;
            self.request_repaint();
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.request_repaint();
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.request_repaint();
    }

    /// Append a widget on top of the window's stacking order.
    pub fn add(&mut self, widget: impl Widget + 'static) -> usize {
        let mut widget: Box<dyn Widget> = Box::new(widget);
        widget.attach(RepaintHandle::to(&self.dirty));
        let index = self.widgets.len();
        if let Some(name) = widget.name() {
            self.names.insert(name.to_string(), index);
        }
        self.widgets.push(widget);
        self.request_repaint();
        index
    }

    /// Remove a widget by name, clearing focus and the name entry.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Widget>> {
        let index = self.names.remove(name)?;
        let widget = self.widgets.remove(index);
        for slot in self.names.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        match self.focused {
            Some(focused) if focused == index => self.focused = None,
            Some(focused) if focused > index => self.focused = Some(focused - 1),
            _ => {}
        }
        self.request_repaint();
        Some(widget)
    }

    pub fn widget(&self, name: &str) -> Option<&dyn Widget> {
        self.names.get(name).map(|&index| self.widgets[index].as_ref())
    }

    pub fn widget_mut(&mut self, name: &str) -> Option<&mut (dyn Widget + '_)> {
        let index = *self.names.get(name)?;
        Some(self.widgets[index].as_mut())
    }

    /// Typed access to a named widget.
    pub fn widget_as<T: Widget + 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.widget_mut(name)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    pub fn widget_at(&self, index: usize) -> Option<&dyn Widget> {
        self.widgets.get(index).map(Box::as_ref)
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    /// Single mutator for widget focus; clears the previous holder first so
    /// at most one widget reports focus at any instant.
    pub fn set_focus(&mut self, index: Option<usize>) {
        if index.is_some_and(|i| i >= self.widgets.len()) {
            return;
        }
        if let Some(old) = self.focused {
            self.widgets[old].set_focused(false);
        }
        self.focused = index;
        if let Some(new) = index {
            self.widgets[new].set_focused(true);
        }
        self.request_repaint();
    }

    pub fn focus_next(&mut self) {
        if self.widgets.is_empty() {
            return;
        }
        let next = match self.focused {
            Some(index) => (index + 1) % self.widgets.len(),
            None => 0,
        };
        self.set_focus(Some(next));
    }

    pub fn focus_prev(&mut self) {
        if self.widgets.is_empty() {
            return;
        }
        let prev = match self.focused {
            Some(0) | None => self.widgets.len() - 1,
            Some(index) => index - 1,
        };
        self.set_focus(Some(prev));
    }

    /// Mark the window for repaint. Idempotent: setting an already-set flag
    /// is a no-op.
    pub fn request_repaint(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn needs_repaint(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub(crate) fn take_needs_repaint(&mut self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }

    pub(crate) fn buffer(&self) -> &CellBuffer {
        &self.buffer
    }

    pub(crate) fn set_screen(&mut self, size: Size) {
        self.screen = size;
    }

    /// Move the window. A target that does not fit the last-known screen is
    /// reported as a geometry fault and leaves the window unchanged.
    pub fn move_to(&mut self, x: u16, y: u16) -> Result<()> {
        let target = Rect::new(x, y, self.rect.width, self.rect.height);
        if target == self.rect {
            return Ok(());
        }
        if !target.fits_within(self.screen) {
            return Err(Error::Geometry {
                target,
                bounds: self.screen,
            });
        }
        self.rect = target;
        self.request_repaint();
        Ok(())
    }

    /// Resize the window, with the same fault policy as [`Window::move_to`].
    pub fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        let target = Rect::new(self.rect.x, self.rect.y, width, height);
        if target == self.rect {
            return Ok(());
        }
        if !target.fits_within(self.screen) {
            return Err(Error::Geometry {
                target,
                bounds: self.screen,
            });
        }
        self.rect = target;
        self.request_repaint();
        Ok(())
    }

    /// Repaint the retained buffer if the window is dirty. Returns whether
    /// anything was painted.
    pub fn paint(&mut self) -> bool {
        if !self.dirty.load(Ordering::Relaxed) {
            return false;
        }
        if self.buffer.size() != self.rect.size() {
            self.buffer = CellBuffer::new(self.rect.size());
        }
        self.buffer.reset();

        let full = Rect::new(0, 0, self.rect.width, self.rect.height);
        if self.background != Style::DEFAULT {
            self.buffer.fill(full, ' ', self.background);
        }
        match self.border {
            BorderStyle::Single => draw_box(&mut self.buffer, full, BoxLines::Single, self.border_style),
            BorderStyle::Double => draw_box(&mut self.buffer, full, BoxLines::Double, self.border_style),
            BorderStyle::None => {}
        }
        if !self.title.is_empty() {
            let title = format!(" {} ", self.title);
            self.buffer.write_text(2, 0, &title, self.title_style);
        }
        if self.active {
            self.buffer.put_glyph(1, 0, '*', self.active_style);
        }

        for widget in &self.widgets {
            if widget.visible() && !widget.rect().size().is_empty() {
                widget.paint(&mut self.buffer);
            }
        }

        self.dirty.store(false, Ordering::Relaxed);
        true
    }

    /// Terminal-resize notification. Records the new screen bounds, runs
    /// the caller's hook, and forces a repaint.
    pub fn handle_resize(&mut self, size: Size) {
        self.screen = size;
        if let Some(mut hook) = self.on_resize.take() {
            hook(self, size);
            if self.on_resize.is_none() {
                self.on_resize = Some(hook);
            }
        }
        self.request_repaint();
    }

    /// Key dispatch: Tab/BackTab cycle focus and are always consumed; the
    /// focused widget is offered first, then the rest in reverse insertion
    /// order without a double offer.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Tab => {
                self.focus_next();
                return true;
            }
            KeyCode::BackTab => {
                self.focus_prev();
                return true;
            }
            _ => {}
        }

        if let Some(focused) = self.focused {
            if self.widgets[focused].handle_key(key) {
                return true;
            }
        }

        for index in (0..self.widgets.len()).rev() {
            if Some(index) == self.focused {
                continue;
            }
            if self.widgets[index].handle_key(key) {
                return true;
            }
        }

        false
    }

    /// Mouse dispatch in window-local coordinates, topmost-added widget
    /// first, stopping at the first consumer.
    pub fn handle_mouse(&mut self, x: u16, y: u16, buttons: MouseButtons) -> bool {
        for index in (0..self.widgets.len()).rev() {
            if !self.widgets[index].hit(x, y) {
                continue;
            }
            if self.widgets[index].handle_mouse(x, y, buttons) {
                return true;
            }
        }
        false
    }

    /// Fixed-period tick fan-out to every widget.
    pub fn handle_tick(&mut self) {
        for widget in &mut self.widgets {
            widget.handle_tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetBase;
    use crossterm::event::KeyModifiers;
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    struct Label {
        base: WidgetBase,
        text: &'static str,
    }

    impl Label {
        fn new(name: &'static str, rect: Rect, text: &'static str) -> Self {
            Self {
                base: WidgetBase::named(rect, name),
                text,
            }
        }
    }

    impl Widget for Label {
        fn base(&self) -> &WidgetBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut WidgetBase {
            &mut self.base
        }
        fn paint(&self, surface: &mut dyn Surface) {
            let rect = self.rect();
            surface.write_text(rect.x, rect.y, self.text, Style::DEFAULT);
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn window() -> Window {
        let mut window = Window::new(Rect::new(0, 0, 12, 4)).with_title("st");
        window.set_screen(Size::new(80, 24));
        window
    }

    #[test]
    fn paint_draws_border_title_and_marker() {
        let mut win = window();
        win.set_active(true);
        assert!(win.paint());
        assert_eq!(win.buffer().row_text(0), "┌* st ─────┐");
        assert_eq!(win.buffer().row_text(3), "└──────────┘");
    }

    #[test]
    fn inactive_window_has_no_marker() {
        let mut win = window();
        win.paint();
        assert_eq!(win.buffer().row_text(0), "┌─ st ─────┐");
    }

    #[test]
    fn repaint_requests_are_idempotent() {
        let mut win = window();
        win.request_repaint();
        win.request_repaint();
        win.request_repaint();
        assert!(win.paint());
        assert!(!win.needs_repaint());
        assert!(!win.paint());
    }

    #[test]
    fn widgets_paint_in_window_coordinates() {
        let mut win = window();
        win.add(Label::new("lbl", Rect::new(2, 1, 5, 1), "hello"));
        win.paint();
        assert_eq!(win.buffer().row_text(1), "│ hello    │");
    }

    #[test]
    fn failed_move_leaves_geometry_unchanged() {
        let mut win = window();
        let before = win.rect();
        let result = win.move_to(75, 0);
        assert!(result.is_err());
        assert_eq!(win.rect(), before);

        win.move_to(10, 10).unwrap();
        assert_eq!(win.rect(), Rect::new(10, 10, 12, 4));
        assert!(win.needs_repaint());
    }

    #[test]
    fn failed_resize_leaves_geometry_unchanged() {
        let mut win = window();
        assert!(win.resize(100, 4).is_err());
        assert_eq!(win.rect(), Rect::new(0, 0, 12, 4));

        win.resize(20, 6).unwrap();
        win.paint();
        assert_eq!(win.buffer().size(), Size::new(20, 6));
    }

    #[test]
    fn resize_notification_runs_hook_and_records_screen() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_hook = Arc::clone(&seen);
        let mut win = Window::new(Rect::new(0, 0, 10, 3))
            .with_resize_hook(move |_win, size| seen_hook.lock().unwrap().push(size));

        win.handle_resize(Size::new(100, 40));
        assert_eq!(seen.lock().unwrap().as_slice(), [Size::new(100, 40)]);
        // The recorded bounds now admit a move that the default would not.
        win.move_to(80, 30).unwrap();
    }

    #[test]
    fn focus_cycle_keeps_single_focus() {
        let mut win = window();
        win.add(Label::new("a", Rect::new(1, 1, 2, 1), "aa"));
        win.add(Label::new("b", Rect::new(4, 1, 2, 1), "bb"));
        win.add(Label::new("c", Rect::new(7, 1, 2, 1), "cc"));

        let key = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert!(win.handle_key(key));
        assert_eq!(win.focused_index(), Some(0));
        win.handle_key(key);
        win.handle_key(key);
        win.handle_key(key);
        assert_eq!(win.focused_index(), Some(0));

        let focused = (0..win.widget_count())
            .filter(|&i| win.widget_at(i).unwrap().focused())
            .count();
        assert_eq!(focused, 1);
    }

    #[test]
    fn hidden_widget_is_not_painted() {
        let mut win = window();
        win.add(Label::new("lbl", Rect::new(2, 1, 5, 1), "hello"));
        win.widget_mut("lbl").unwrap().set_visible(false);
        win.paint();
        assert_eq!(win.buffer().row_text(1), "│          │");
    }

    #[test]
    fn typed_widget_lookup() {
        let mut win = window();
        win.add(Label::new("lbl", Rect::new(2, 1, 5, 1), "hello"));
        assert!(win.widget_as::<Label>("lbl").is_some());
    }
}
