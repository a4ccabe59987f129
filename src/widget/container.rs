use std::any::Any;
use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent};

use crate::backend::MouseButtons;
use crate::geometry::Rect;
use crate::style::Style;
use crate::surface::{BoxLines, Frame, Surface, draw_box};

use super::core::{RepaintHandle, Widget, WidgetBase};

/// A widget owning an ordered list of child widgets.
///
/// Children live in the container's coordinate frame; the container
/// translates paint and mouse dispatch, tracks a single focused child, and
/// aggregates hit-testing. Insertion order is stacking order: the
/// last-added child is offered events first.
pub struct Container {
    base: WidgetBase,
    children: Vec<Box<dyn Widget>>,
    names: HashMap<String, usize>,
    focused: Option<usize>,
    background: Option<Style>,
    border: Option<Style>,
}

impl Container {
    pub fn new(rect: Rect) -> Self {
        Self {
            base: WidgetBase::new(rect),
            children: Vec::new(),
            names: HashMap::new(),
            focused: None,
            background: None,
            border: None,
        }
    }

    pub fn named(rect: Rect, name: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::named(rect, name),
            ..Self::new(rect)
        }
    }

    pub fn with_background(mut self, style: Style) -> Self {
        self.background = Some(style);
        self
    }

    pub fn with_border(mut self, style: Style) -> Self {
        self.border = Some(style);
        self
    }

    /// Append a child on top of the stacking order.
    pub fn add(&mut self, child: impl Widget + 'static) -> usize {
        let mut child: Box<dyn Widget> = Box::new(child);
        child.attach(self.base.repaint_handle());
        let index = self.children.len();
        if let Some(name) = child.name() {
            self.names.insert(name.to_string(), index);
        }
        self.children.push(child);
        self.base.request_repaint();
        index
    }

    /// Remove a child by name, clearing focus and the name entry.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Widget>> {
        let index = self.names.remove(name)?;
        let child = self.children.remove(index);
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
        self.base.request_repaint();
        Some(child)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&dyn Widget> {
        self.names.get(name).map(|&index| self.children[index].as_ref())
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut (dyn Widget + '_)> {
        let index = *self.names.get(name)?;
        Some(self.children[index].as_mut())
    }

    /// Typed access to a named child.
    pub fn child_as<T: Widget + 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.child_mut(name)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn child_at(&self, index: usize) -> Option<&dyn Widget> {
        self.children.get(index).map(Box::as_ref)
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    /// The single mutator for child focus: the previous child's flag is
    /// cleared before the next is set, so at most one child ever reports
    /// focus, even mid-transition.
    pub fn set_focus(&mut self, index: Option<usize>) {
        if index.is_some_and(|i| i >= self.children.len()) {
            return;
        }
        if let Some(old) = self.focused {
            self.children[old].set_focused(false);
        }
        self.focused = index;
        if let Some(new) = index {
            self.children[new].set_focused(true);
        }
        self.base.request_repaint();
    }

    /// Move focus to the next child in insertion order, wrapping. With no
    /// current focus, selects the first child.
    pub fn focus_next(&mut self) {
        if self.children.is_empty() {
            return;
        }
        let next = match self.focused {
            Some(index) => (index + 1) % self.children.len(),
            None => 0,
        };
        self.set_focus(Some(next));
    }

    /// Move focus to the previous child, wrapping. With no current focus,
    /// selects the last child.
    pub fn focus_prev(&mut self) {
        if self.children.is_empty() {
            return;
        }
        let prev = match self.focused {
            Some(0) | None => self.children.len() - 1,
            Some(index) => index - 1,
        };
        self.set_focus(Some(prev));
    }
}

impl Widget for Container {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn attach(&mut self, repaint: RepaintHandle) {
        for child in &mut self.children {
            child.attach(repaint.clone());
        }
        self.base.repaint = repaint;
    }

    fn paint(&self, surface: &mut dyn Surface) {
        let rect = self.base.rect;
        if rect.size().is_empty() {
            return;
        }
        if let Some(style) = self.background {
            surface.fill(rect, ' ', style);
        }
        if let Some(style) = self.border {
            draw_box(surface, rect, BoxLines::Single, style);
        }
        let mut frame = Frame::new(surface, rect);
        for child in &self.children {
            if child.visible() && !child.rect().size().is_empty() {
                child.paint(&mut frame);
            }
        }
    }

    /// An empty container area is not interactive: the point must fall on
    /// some child for the container to report a hit.
    fn hit(&self, x: u16, y: u16) -> bool {
        if !self.base.visible || !self.base.rect.contains(x, y) {
            return false;
        }
        let local_x = x - self.base.rect.x;
        let local_y = y - self.base.rect.y;
        self.children.iter().any(|child| child.hit(local_x, local_y))
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
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
            if self.children[focused].handle_key(key) {
                return true;
            }
        }

        // Reverse insertion order, skipping the focused child already
        // offered above.
        for index in (0..self.children.len()).rev() {
            if Some(index) == self.focused {
                continue;
            }
            if self.children[index].handle_key(key) {
                return true;
            }
        }

        false
    }

    fn handle_mouse(&mut self, x: u16, y: u16, buttons: MouseButtons) -> bool {
        if !self.base.visible || !self.base.rect.contains(x, y) {
            return false;
        }
        let local_x = x - self.base.rect.x;
        let local_y = y - self.base.rect.y;

        for index in (0..self.children.len()).rev() {
            if !self.children[index].hit(local_x, local_y) {
                continue;
            }
            if self.children[index].handle_mouse(local_x, local_y, buttons) {
                if buttons.contains(MouseButtons::LEFT_PRESSED) {
                    self.set_focus(Some(index));
                }
                return true;
            }
        }

        false
    }

    fn handle_tick(&mut self) {
        for child in &mut self.children {
            child.handle_tick();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
