use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crossterm::event::KeyEvent;

use crate::backend::MouseButtons;
use crate::geometry::Rect;
use crate::surface::Surface;

/// Non-owning handle to the owning window's dirty bit.
///
/// This is the only link a widget holds back toward its owner: it reaches
/// the repaint flag and nothing else, so the ownership tree stays acyclic.
/// A handle that was never attached (or whose owner is gone) is inert.
#[derive(Debug, Clone, Default)]
pub struct RepaintHandle {
    flag: Weak<AtomicBool>,
}

impl RepaintHandle {
    pub(crate) fn to(flag: &Arc<AtomicBool>) -> Self {
        Self {
            flag: Arc::downgrade(flag),
        }
    }

    pub fn detached() -> Self {
        Self::default()
    }

    /// Mark the owner dirty. Idempotent; requesting twice is the same as
    /// requesting once.
    pub fn request(&self) {
        if let Some(flag) = self.flag.upgrade() {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

/// State shared by every widget: geometry, identity, visibility, focus, and
/// the repaint back-reference. Concrete widgets embed one.
#[derive(Debug)]
pub struct WidgetBase {
    pub(crate) rect: Rect,
    pub(crate) name: Option<String>,
    pub(crate) visible: bool,
    pub(crate) focused: bool,
    pub(crate) repaint: RepaintHandle,
}

impl WidgetBase {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            name: None,
            visible: true,
            focused: false,
            repaint: RepaintHandle::detached(),
        }
    }

    pub fn named(rect: Rect, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(rect)
        }
    }

    pub fn request_repaint(&self) {
        self.repaint.request();
    }

    pub fn repaint_handle(&self) -> RepaintHandle {
        self.repaint.clone()
    }
}

/// Leaf capability set consumed by containers and windows.
///
/// Coordinates handed to `hit` and `handle_mouse` are in the parent's frame,
/// the same frame `rect()` is expressed in. Implementations must route every
/// appearance-changing mutation through `request_repaint` on their base, and
/// must not mutate geometry except through `set_rect`.
pub trait Widget {
    fn base(&self) -> &WidgetBase;
    fn base_mut(&mut self) -> &mut WidgetBase;

    fn rect(&self) -> Rect {
        self.base().rect
    }

    fn set_rect(&mut self, rect: Rect) {
        self.base_mut().rect = rect;
        self.base().request_repaint();
    }

    fn name(&self) -> Option<&str> {
        self.base().name.as_deref()
    }

    fn visible(&self) -> bool {
        self.base().visible
    }

    fn set_visible(&mut self, visible: bool) {
        if self.base().visible != visible {
            self.base_mut().visible = visible;
            self.base().request_repaint();
        }
    }

    fn focused(&self) -> bool {
        self.base().focused
    }

    /// Called by the owning container/window; it is the single mutator path
    /// that keeps the one-focused-child invariant.
    fn set_focused(&mut self, focused: bool) {
        if self.base().focused != focused {
            self.base_mut().focused = focused;
            self.base().request_repaint();
        }
    }

    /// Install the repaint back-reference. Containers propagate the handle
    /// to their children.
    fn attach(&mut self, repaint: RepaintHandle) {
        self.base_mut().repaint = repaint;
    }

    /// Draw into the parent surface at `rect()`. Out-of-bounds writes are
    /// absorbed by the surface; paint must not fail.
    fn paint(&self, surface: &mut dyn Surface);

    fn hit(&self, x: u16, y: u16) -> bool {
        self.base().visible && self.base().rect.contains(x, y)
    }

    fn handle_key(&mut self, _key: KeyEvent) -> bool {
        false
    }

    fn handle_mouse(&mut self, _x: u16, _y: u16, _buttons: MouseButtons) -> bool {
        false
    }

    /// Fixed-period hook for self-updating widgets. Must not block.
    fn handle_tick(&mut self) {}

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
