use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::backend::{Backend, InputEvent};
use crate::error::{Error, Result};
use crate::geometry::Size;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::RuntimeMetrics;
use crate::surface::{CellBuffer, Surface};
use crate::widget::Widget;
use crate::window::Window;

/// Configuration knobs for the runtime loop.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Target wall-clock budget for one loop iteration; the loop sleeps the
    /// remainder when it finishes early and never compensates when late.
    pub frame_budget: Duration,
    /// Interval between tick fan-outs, decoupled from the frame rate.
    pub tick_interval: Duration,
    /// Optional structured logger used by the runtime.
    pub logger: Option<Logger>,
    /// Metrics accumulator used for periodic snapshots.
    pub metrics: Option<Arc<Mutex<RuntimeMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_budget: Duration::from_micros(16_667),
            tick_interval: Duration::from_millis(100),
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(5),
            metrics_target: "casement::runtime.metrics".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(RuntimeMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<RuntimeMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// Stable identity of a window within a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

/// Cloneable handle that requests loop termination; the only way the run
/// loop ends.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

struct Slot {
    id: WindowId,
    window: Window,
}

/// Sleep remaining after a loop iteration, or `None` when the budget is
/// already spent.
pub(crate) fn remaining_budget(elapsed: Duration, budget: Duration) -> Option<Duration> {
    if elapsed >= budget {
        None
    } else {
        Some(budget - elapsed)
    }
}

/// The window manager: single authority for z-order, the active window,
/// input routing, and the event/tick/paint loop.
///
/// Slots are kept bottom-to-top: painting and ticking walk forward, hit
/// testing walks backward, so overlaps always resolve to the visually
/// topmost window.
pub struct PanelStack {
    slots: Vec<Slot>,
    names: HashMap<String, WindowId>,
    next_id: u64,
    active: Option<WindowId>,
    screen: CellBuffer,
    damaged: bool,
    config: RuntimeConfig,
    stop: Arc<AtomicBool>,
    last_tick: Option<Instant>,
    started_at: Option<Instant>,
    last_metrics_emit: Option<Instant>,
}

impl PanelStack {
    pub fn new(initial: Size) -> Self {
        Self {
            slots: Vec::new(),
            names: HashMap::new(),
            next_id: 1,
            active: None,
            screen: CellBuffer::new(initial),
            damaged: true,
            config: RuntimeConfig::default(),
            stop: Arc::new(AtomicBool::new(false)),
            last_tick: None,
            started_at: None,
            last_metrics_emit: None,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    pub fn window_count(&self) -> usize {
        self.slots.len()
    }

    /// Add a window on top of the z-order and make it active.
    pub fn add(&mut self, mut window: Window) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        window.set_screen(self.screen.size());
        if let Some(name) = window.name() {
            self.names.insert(name.to_string(), id);
        }
        self.slots.push(Slot { id, window });
        self.damaged = true;
        self.set_active(id);
        id
    }

    /// Remove a window. The active slot empties if it held this window; no
    /// other window is promoted.
    pub fn remove(&mut self, id: WindowId) -> Option<Window> {
        let position = self.position(id)?;
        let slot = self.slots.remove(position);
        self.names.retain(|_, registered| *registered != id);
        if self.active == Some(id) {
            self.active = None;
        }
        self.damaged = true;
        Some(slot.window)
    }

    fn position(&self, id: WindowId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.position(id).map(|pos| &self.slots[pos].window)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.position(id).map(|pos| &mut self.slots[pos].window)
    }

    pub fn window(&self, name: &str) -> Option<&Window> {
        self.get(*self.names.get(name)?)
    }

    pub fn window_mut(&mut self, name: &str) -> Option<&mut Window> {
        self.get_mut(*self.names.get(name)?)
    }

    pub fn active_id(&self) -> Option<WindowId> {
        self.active
    }

    pub fn active_window_mut(&mut self) -> Option<&mut Window> {
        self.get_mut(self.active?)
    }

    /// Look up a widget by `"window/widget"` path.
    pub fn widget_mut(&mut self, path: &str) -> Result<&mut dyn Widget> {
        let (window_name, widget_name) = path
            .split_once('/')
            .ok_or_else(|| Error::WidgetNotFound(path.to_string()))?;
        let window = self
            .window_mut(window_name)
            .ok_or_else(|| Error::WindowNotFound(window_name.to_string()))?;
        window
            .widget_mut(widget_name)
            .ok_or_else(|| Error::WidgetNotFound(path.to_string()))
    }

    /// Typed `"window/widget"` path lookup.
    pub fn widget_as<T: Widget + 'static>(&mut self, path: &str) -> Result<&mut T> {
        self.widget_mut(path)?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| Error::WidgetNotFound(path.to_string()))
    }

    /// Activate a window by name.
    pub fn activate(&mut self, name: &str) -> Result<()> {
        let id = *self
            .names
            .get(name)
            .ok_or_else(|| Error::WindowNotFound(name.to_string()))?;
        self.set_active(id);
        Ok(())
    }

    /// Make a window active: the previous holder is deactivated and
    /// repainted, the new one is flagged, repainted, and raised to the top.
    /// A no-op when the window is already active.
    pub fn set_active(&mut self, id: WindowId) {
        if self.active == Some(id) {
            return;
        }
        let Some(_) = self.position(id) else {
            return;
        };
        if let Some(old) = self.active.take() {
            if let Some(pos) = self.position(old) {
                self.slots[pos].window.set_active(false);
            }
        }
        if let Some(pos) = self.position(id) {
            self.slots[pos].window.set_active(true);
        }
        self.active = Some(id);
        self.raise_to_top(id);
        let label = self.window_label(id);
        self.log(
            LogLevel::Info,
            "window_activated",
            [json_kv("window", json!(label))],
        );
    }

    pub fn raise_to_top(&mut self, id: WindowId) {
        if let Some(pos) = self.position(id) {
            let slot = self.slots.remove(pos);
            self.slots.push(slot);
            self.damaged = true;
        }
    }

    pub fn lower_to_bottom(&mut self, id: WindowId) {
        if let Some(pos) = self.position(id) {
            let slot = self.slots.remove(pos);
            self.slots.insert(0, slot);
            self.damaged = true;
        }
    }

    /// Raise one step toward the top.
    pub fn raise(&mut self, id: WindowId) {
        if let Some(pos) = self.position(id) {
            if pos + 1 < self.slots.len() {
                self.slots.swap(pos, pos + 1);
                self.damaged = true;
            }
        }
    }

    /// Lower one step toward the bottom.
    pub fn lower(&mut self, id: WindowId) {
        if let Some(pos) = self.position(id) {
            if pos > 0 {
                self.slots.swap(pos, pos - 1);
                self.damaged = true;
            }
        }
    }

    /// Topmost visible window containing the point, searching top-to-bottom
    /// so overlaps resolve to the window drawn last.
    pub fn window_at(&self, x: u16, y: u16) -> Option<WindowId> {
        self.slots
            .iter()
            .rev()
            .find(|slot| slot.window.visible() && slot.window.rect().contains(x, y))
            .map(|slot| slot.id)
    }

    /// Run the event/tick/paint loop against a backend until a
    /// [`StopHandle`] fires.
    pub fn run(&mut self, backend: &mut dyn Backend) -> Result<()> {
        backend.enter()?;
        let outcome = self.run_loop(backend);
        let teardown = backend.leave();
        outcome.and(teardown)
    }

    fn run_loop(&mut self, backend: &mut dyn Backend) -> Result<()> {
        self.bootstrap(backend)?;
        while !self.stop.load(Ordering::Relaxed) {
            let frame_start = Instant::now();
            self.drain_input(backend)?;
            self.paint_frame(backend)?;
            self.maybe_tick();
            self.maybe_emit_metrics();
            if let Some(remaining) =
                remaining_budget(frame_start.elapsed(), self.config.frame_budget)
            {
                thread::sleep(remaining);
            }
        }
        self.finalize();
        Ok(())
    }

    /// Drive the same dispatch/paint path from a scripted event sequence,
    /// with no terminal setup, ticking, or pacing. Deterministic; used by
    /// tests and benches.
    pub fn run_scripted(
        &mut self,
        backend: &mut dyn Backend,
        events: impl IntoIterator<Item = InputEvent>,
    ) -> Result<()> {
        self.bootstrap(backend)?;
        self.paint_frame(backend)?;
        for event in events {
            self.dispatch_event(event, backend);
            self.paint_frame(backend)?;
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
        }
        self.finalize();
        Ok(())
    }

    fn bootstrap(&mut self, backend: &mut dyn Backend) -> Result<()> {
        self.stop.store(false, Ordering::Relaxed);
        let now = Instant::now();
        self.started_at = Some(now);
        self.last_metrics_emit = Some(now);
        self.ensure_metrics_initialized();

        let size = backend.size();
        if size != self.screen.size() {
            self.apply_resize(size);
        } else {
            self.damaged = true;
        }

        self.log(
            LogLevel::Info,
            "runtime_started",
            [
                json_kv("windows", json!(self.slots.len())),
                json_kv("width", json!(size.width)),
                json_kv("height", json!(size.height)),
            ],
        );
        Ok(())
    }

    /// Drain every pending input before painting so bursts cannot queue
    /// across frames.
    fn drain_input(&mut self, backend: &mut dyn Backend) -> Result<()> {
        while let Some(event) = backend.poll_event(Duration::ZERO)? {
            self.dispatch_event(event, backend);
        }
        Ok(())
    }

    fn dispatch_event(&mut self, event: InputEvent, backend: &mut dyn Backend) {
        match event {
            InputEvent::Mouse { x, y, buttons } => {
                self.record_event_metric();
                let Some(id) = self.window_at(x, y) else {
                    self.record_dropped_metric();
                    return;
                };
                self.set_active(id);
                if let Some(pos) = self.position(id) {
                    let window = &mut self.slots[pos].window;
                    let local_x = x - window.rect().x;
                    let local_y = y - window.rect().y;
                    window.handle_mouse(local_x, local_y, buttons);
                }
            }
            InputEvent::Resize(_) => {
                self.record_event_metric();
                let size = backend.size();
                self.apply_resize(size);
            }
            InputEvent::Key(key) => {
                self.record_event_metric();
                match self.active.and_then(|id| self.position(id)) {
                    Some(pos) => {
                        self.slots[pos].window.handle_key(key);
                    }
                    None => self.record_dropped_metric(),
                }
            }
        }
    }

    /// Rebuild the screen buffer and notify every window bottom-to-top,
    /// each exactly once.
    fn apply_resize(&mut self, size: Size) {
        if self.screen.size() != size {
            self.screen = CellBuffer::new(size);
        }
        self.damaged = true;
        for slot in &mut self.slots {
            slot.window.handle_resize(size);
        }
        self.log(
            LogLevel::Info,
            "resized",
            [
                json_kv("width", json!(size.width)),
                json_kv("height", json!(size.height)),
            ],
        );
    }

    /// Repaint dirty windows bottom-to-top, then composite and present a
    /// single frame when anything changed.
    fn paint_frame(&mut self, backend: &mut dyn Backend) -> Result<()> {
        let mut repainted = 0usize;
        for slot in &mut self.slots {
            if slot.window.visible() {
                if slot.window.paint() {
                    repainted += 1;
                }
            } else if slot.window.take_needs_repaint() {
                // A hidden window changed; the screen must forget it.
                self.damaged = true;
            }
        }

        if repainted == 0 && !self.damaged {
            return Ok(());
        }
        self.damaged = false;

        self.screen.reset();
        for slot in &self.slots {
            if slot.window.visible() {
                let rect = slot.window.rect();
                self.screen.blit_from(slot.window.buffer(), rect.x, rect.y);
            }
        }
        backend.present(&self.screen)?;
        self.record_frame_metric(repainted);
        self.log(
            LogLevel::Debug,
            "frame_presented",
            [json_kv("repainted", json!(repainted))],
        );
        Ok(())
    }

    /// Tick fan-out at a fixed wall-clock period, independent of frame
    /// rate. Windows are ticked bottom-to-top.
    fn maybe_tick(&mut self) {
        let due = self
            .last_tick
            .is_none_or(|last| last.elapsed() >= self.config.tick_interval);
        if !due {
            return;
        }
        self.last_tick = Some(Instant::now());
        for slot in &mut self.slots {
            slot.window.handle_tick();
        }
        self.record_tick_metric();
    }

    fn finalize(&mut self) {
        let uptime_ms = self
            .started_at
            .map(|start| start.elapsed().as_millis())
            .unwrap_or(0);
        self.log(
            LogLevel::Info,
            "runtime_stopped",
            [json_kv("uptime_ms", json!(uptime_ms as u64))],
        );
    }

    fn window_label(&self, id: WindowId) -> String {
        self.get(id)
            .and_then(|window| window.name().map(str::to_string))
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    fn ensure_metrics_initialized(&mut self) {
        if self.config.metrics.is_none() && self.config.metrics_interval > Duration::ZERO {
            self.config.metrics = Some(Arc::new(Mutex::new(RuntimeMetrics::new())));
        }
    }

    fn record_event_metric(&self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_event();
            }
        }
    }

    fn record_dropped_metric(&self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_dropped_input();
            }
        }
    }

    fn record_frame_metric(&self, repainted: usize) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_frame(repainted);
            }
        }
    }

    fn record_tick_metric(&self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_tick();
            }
        }
    }

    fn maybe_emit_metrics(&mut self) {
        if self.config.metrics.is_none() || self.config.metrics_interval == Duration::ZERO {
            return;
        }

        let now = Instant::now();
        match self.last_metrics_emit {
            Some(last) if now.duration_since(last) < self.config.metrics_interval => return,
            _ => self.last_metrics_emit = Some(now),
        }

        let uptime = self
            .started_at
            .map(|start| now.duration_since(start))
            .unwrap_or_default();

        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let target = self.config.metrics_target.as_str();
                let event = guard.snapshot(uptime).to_log_event(target);
                let _ = logger.log_event(event);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, "casement::runtime", message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MouseButtons, TestBackend};
    use crate::geometry::Rect;
    use crate::logging::MemorySink;
    use crate::style::Style;
    use crate::surface::Surface;
    use crate::widget::WidgetBase;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    struct Probe {
        base: WidgetBase,
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Probe {
        fn new(tag: &'static str, rect: Rect, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                base: WidgetBase::named(rect, tag),
                tag,
                log: Arc::clone(log),
            }
        }
    }

    impl Widget for Probe {
        fn base(&self) -> &WidgetBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut WidgetBase {
            &mut self.base
        }
        fn paint(&self, surface: &mut dyn Surface) {
            let rect = self.rect();
            surface.write_text(rect.x, rect.y, self.tag, Style::DEFAULT);
        }
        fn handle_key(&mut self, key: KeyEvent) -> bool {
            self.log
                .lock()
                .unwrap()
                .push(format!("key:{}:{:?}", self.tag, key.code));
            true
        }
        fn handle_mouse(&mut self, x: u16, y: u16, _buttons: MouseButtons) -> bool {
            self.log
                .lock()
                .unwrap()
                .push(format!("mouse:{}:{x},{y}", self.tag));
            true
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn add_activates_and_stacks_on_top() {
        let mut stack = PanelStack::new(Size::new(80, 24));
        let a = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));
        let b = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("b"));

        assert_eq!(stack.active_id(), Some(b));
        assert!(!stack.get(a).unwrap().active());
        assert!(stack.get(b).unwrap().active());
    }

    #[test]
    fn overlap_hits_topmost_until_activation_reorders() {
        let mut stack = PanelStack::new(Size::new(80, 24));
        let a = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));
        let b = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("b"));

        assert_eq!(stack.window_at(4, 2), Some(b));
        stack.set_active(a);
        assert_eq!(stack.window_at(4, 2), Some(a));
        assert!(!stack.get(b).unwrap().active());
    }

    #[test]
    fn hidden_windows_are_skipped_by_hit_testing() {
        let mut stack = PanelStack::new(Size::new(80, 24));
        let a = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));
        let b = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("b"));

        stack.get_mut(b).unwrap().hide();
        assert_eq!(stack.window_at(4, 2), Some(a));
    }

    #[test]
    fn keys_route_to_active_window_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = PanelStack::new(Size::new(40, 12));
        let mut bottom = Window::new(Rect::new(0, 0, 20, 6)).with_name("bottom");
        bottom.add(Probe::new("b", Rect::new(1, 1, 3, 1), &log));
        let mut top = Window::new(Rect::new(0, 6, 20, 6)).with_name("top");
        top.add(Probe::new("t", Rect::new(1, 1, 3, 1), &log));
        stack.add(bottom);
        stack.add(top);

        let mut backend = TestBackend::new(40, 12);
        stack
            .run_scripted(&mut backend, [key(KeyCode::Char('k'))])
            .unwrap();

        let seen = log.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("key:t"));
    }

    #[test]
    fn mouse_activates_and_translates_to_window_local() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = PanelStack::new(Size::new(40, 12));
        let bottom = stack.add(Window::new(Rect::new(0, 0, 20, 6)).with_name("bottom"));
        let mut side = Window::new(Rect::new(10, 5, 20, 6)).with_name("side");
        side.add(Probe::new("s", Rect::new(2, 2, 3, 1), &log));
        let side_id = stack.add(side);

        stack.set_active(bottom);
        let mut backend = TestBackend::new(40, 12);
        stack
            .run_scripted(
                &mut backend,
                [InputEvent::Mouse {
                    x: 12,
                    y: 7,
                    buttons: MouseButtons::LEFT_PRESSED,
                }],
            )
            .unwrap();

        assert_eq!(stack.active_id(), Some(side_id));
        assert_eq!(log.lock().unwrap().as_slice(), ["mouse:s:2,2"]);
    }

    #[test]
    fn mouse_outside_every_window_is_dropped() {
        let mut stack = PanelStack::new(Size::new(40, 12));
        let a = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));

        let mut backend = TestBackend::new(40, 12);
        stack
            .run_scripted(
                &mut backend,
                [InputEvent::Mouse {
                    x: 30,
                    y: 10,
                    buttons: MouseButtons::LEFT_PRESSED,
                }],
            )
            .unwrap();
        assert_eq!(stack.active_id(), Some(a));
    }

    #[test]
    fn resize_notifies_every_window_bottom_to_top_once() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let bottom_order = Arc::clone(&order);
        let top_order = Arc::clone(&order);

        let mut stack = PanelStack::new(Size::new(80, 24));
        stack.add(
            Window::new(Rect::new(0, 0, 10, 5))
                .with_name("bottom")
                .with_resize_hook(move |_, _| bottom_order.lock().unwrap().push("bottom")),
        );
        stack.add(
            Window::new(Rect::new(0, 5, 10, 5))
                .with_name("top")
                .with_resize_hook(move |_, _| top_order.lock().unwrap().push("top")),
        );

        let mut backend = TestBackend::new(80, 24);
        stack.bootstrap(&mut backend).unwrap();
        assert!(order.lock().unwrap().is_empty());

        backend.set_size(Size::new(100, 30));
        stack.dispatch_event(InputEvent::Resize(Size::new(100, 30)), &mut backend);
        assert_eq!(order.lock().unwrap().as_slice(), ["bottom", "top"]);
        assert_eq!(stack.screen.size(), Size::new(100, 30));
    }

    #[test]
    fn repaint_is_idempotent_across_frames() {
        let mut stack = PanelStack::new(Size::new(40, 12));
        let id = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));

        let mut backend = TestBackend::new(40, 12);
        stack.bootstrap(&mut backend).unwrap();
        stack.paint_frame(&mut backend).unwrap();
        assert_eq!(backend.present_count(), 1);

        // Clean stack: no present.
        stack.paint_frame(&mut backend).unwrap();
        assert_eq!(backend.present_count(), 1);

        // N repaint requests collapse into one frame.
        let window = stack.get(id).unwrap();
        window.request_repaint();
        window.request_repaint();
        window.request_repaint();
        stack.paint_frame(&mut backend).unwrap();
        stack.paint_frame(&mut backend).unwrap();
        assert_eq!(backend.present_count(), 2);
    }

    #[test]
    fn composite_draws_later_windows_over_earlier() {
        let mut stack = PanelStack::new(Size::new(12, 4));
        stack.add(Window::new(Rect::new(0, 0, 6, 3)).with_name("a"));
        stack.add(Window::new(Rect::new(3, 0, 6, 3)).with_name("b"));

        let mut backend = TestBackend::new(12, 4);
        stack.run_scripted(&mut backend, std::iter::empty()).unwrap();

        let frame = backend.last_frame().unwrap();
        let top_row: &str = frame.lines().next().unwrap();
        assert_eq!(top_row, "┌──┌────┐   ");
    }

    #[test]
    fn hiding_a_window_removes_it_from_the_screen() {
        let mut stack = PanelStack::new(Size::new(12, 4));
        let id = stack.add(Window::new(Rect::new(0, 0, 6, 3)).with_name("a"));

        let mut backend = TestBackend::new(12, 4);
        stack.run_scripted(&mut backend, std::iter::empty()).unwrap();
        assert!(backend.last_frame().unwrap().contains('┌'));

        stack.get_mut(id).unwrap().hide();
        stack.paint_frame(&mut backend).unwrap();
        assert!(!backend.last_frame().unwrap().contains('┌'));
    }

    #[test]
    fn remove_clears_active_without_promotion() {
        let mut stack = PanelStack::new(Size::new(80, 24));
        let a = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));
        let b = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("b"));

        let removed = stack.remove(b).unwrap();
        assert_eq!(removed.name(), Some("b"));
        assert_eq!(stack.active_id(), None);
        assert!(stack.window("b").is_none());
        assert_eq!(stack.window_at(2, 2), Some(a));
    }

    #[test]
    fn widget_path_lookup() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = PanelStack::new(Size::new(40, 12));
        let mut window = Window::new(Rect::new(0, 0, 20, 6)).with_name("main");
        window.add(Probe::new("status", Rect::new(1, 1, 6, 1), &log));
        stack.add(window);

        assert!(stack.widget_mut("main/status").is_ok());
        assert!(stack.widget_as::<Probe>("main/status").is_ok());
        assert!(matches!(
            stack.widget_mut("main/missing"),
            Err(Error::WidgetNotFound(_))
        ));
        assert!(matches!(
            stack.widget_mut("other/status"),
            Err(Error::WindowNotFound(_))
        ));
    }

    #[test]
    fn activate_by_name() {
        let mut stack = PanelStack::new(Size::new(80, 24));
        let a = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));
        stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("b"));

        stack.activate("a").unwrap();
        assert_eq!(stack.active_id(), Some(a));
        assert!(matches!(
            stack.activate("missing"),
            Err(Error::WindowNotFound(_))
        ));
    }

    #[test]
    fn zorder_step_operations() {
        let mut stack = PanelStack::new(Size::new(80, 24));
        let a = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));
        let b = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("b"));
        let c = stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("c"));

        stack.lower_to_bottom(c);
        assert_eq!(stack.window_at(1, 1), Some(b));
        stack.raise(c);
        stack.raise(c);
        assert_eq!(stack.window_at(1, 1), Some(c));
        stack.lower(c);
        assert_eq!(stack.window_at(1, 1), Some(b));
        let _ = a;
    }

    struct Stopper {
        base: WidgetBase,
        stop: StopHandle,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Widget for Stopper {
        fn base(&self) -> &WidgetBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut WidgetBase {
            &mut self.base
        }
        fn paint(&self, _surface: &mut dyn Surface) {}
        fn handle_key(&mut self, _key: KeyEvent) -> bool {
            self.log.lock().unwrap().push("stopper".to_string());
            self.stop.stop();
            true
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn stop_request_ends_the_loop_before_later_events() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = PanelStack::new(Size::new(40, 12));
        let stop = stack.stop_handle();
        let mut window = Window::new(Rect::new(0, 0, 10, 5)).with_name("a");
        window.add(Stopper {
            base: WidgetBase::new(Rect::new(1, 1, 3, 1)),
            stop,
            log: Arc::clone(&log),
        });
        stack.add(window);

        let mut backend = TestBackend::new(40, 12);
        stack
            .run_scripted(
                &mut backend,
                [key(KeyCode::Char('q')), key(KeyCode::Char('q'))],
            )
            .unwrap();

        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(stack.stop_handle().is_stopped());
    }

    #[test]
    fn pacing_sleeps_only_under_budget() {
        let budget = Duration::from_millis(10);
        assert_eq!(
            remaining_budget(Duration::from_millis(4), budget),
            Some(Duration::from_millis(6))
        );
        assert_eq!(remaining_budget(Duration::from_millis(10), budget), None);
        assert_eq!(remaining_budget(Duration::from_millis(25), budget), None);
    }

    #[test]
    fn lifecycle_is_logged() {
        let sink = MemorySink::new();
        let mut stack = PanelStack::new(Size::new(40, 12));
        stack.config_mut().logger = Some(Logger::new(sink.clone()));
        stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));

        let mut backend = TestBackend::new(40, 12);
        stack.run_scripted(&mut backend, std::iter::empty()).unwrap();

        let messages: Vec<String> = sink
            .events()
            .into_iter()
            .map(|event| event.message)
            .collect();
        assert!(messages.contains(&"runtime_started".to_string()));
        assert!(messages.contains(&"runtime_stopped".to_string()));
        assert!(messages.contains(&"window_activated".to_string()));
    }

    #[test]
    fn metrics_count_events_and_frames() {
        let mut stack = PanelStack::new(Size::new(40, 12));
        stack.config_mut().enable_metrics();
        let metrics = stack.config().metrics_handle().unwrap();
        stack.add(Window::new(Rect::new(0, 0, 10, 5)).with_name("a"));

        let mut backend = TestBackend::new(40, 12);
        stack
            .run_scripted(&mut backend, [key(KeyCode::Char('x'))])
            .unwrap();

        let snapshot = metrics.lock().unwrap().snapshot(Duration::ZERO);
        assert_eq!(snapshot.events, 1);
        assert!(snapshot.frames >= 1);
    }
}
