//! Casement is a compositing panel runtime for text terminals: bordered,
//! z-ordered windows multiplexed on one cell grid, each owning a widget
//! tree with focus-chain navigation and coordinate-relative hit testing.
//!
//! The runtime is a single-threaded cooperative loop: it drains input,
//! routes mouse events to the topmost hit window and keys to the active
//! one, repaints only windows whose dirty bit is set, composites
//! bottom-to-top, presents one frame, and fans out fixed-period ticks
//! decoupled from the frame rate.

pub mod backend;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod stack;
pub mod style;
pub mod surface;
pub mod widget;
pub mod widgets;
pub mod width;
pub mod window;

pub use backend::{Backend, InputEvent, MouseButtons, TermBackend, TestBackend};
pub use error::{Error, Result};
pub use geometry::{Rect, Size};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, event_with_fields, json_kv,
};
pub use metrics::{MetricSnapshot, RuntimeMetrics};
pub use stack::{PanelStack, RuntimeConfig, StopHandle, WindowId};
pub use style::{Style, StyleKey, TextAttr};
pub use surface::{BoxLines, Cell, CellBuffer, Frame, Surface, draw_box, glyph};
pub use widget::{Container, RepaintHandle, Widget, WidgetBase};
pub use widgets::{Button, Comparison, ProgressBar, StatusLabel, Value};
pub use width::{center, display_width};
pub use window::{BorderStyle, ResizeHook, Window};
