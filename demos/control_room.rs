//! A small control-room dashboard: two overlapping windows, a simulated
//! load gauge driven by the tick phase, and a quit button.
//!
//! Run with `cargo run --example control_room`. Click a window to raise
//! and activate it, Tab cycles widget focus, Enter clicks the focused
//! button.

use std::any::Any;

use casement::{
    BorderStyle, Button, Comparison, PanelStack, ProgressBar, Rect, Size, StatusLabel, Surface,
    TermBackend, TextAttr, Widget, WidgetBase, Window, style,
};
use crossterm::style::Color;

/// Gauge that animates itself from the runtime tick.
struct LoadSim {
    bar: ProgressBar,
    phase: f64,
}

impl LoadSim {
    fn new(rect: Rect) -> Self {
        Self {
            bar: ProgressBar::new(rect).with_show_value(0).with_thresholds(60.0, 85.0),
            phase: 0.0,
        }
    }
}

impl Widget for LoadSim {
    fn base(&self) -> &WidgetBase {
        self.bar.base()
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        self.bar.base_mut()
    }

    fn paint(&self, surface: &mut dyn Surface) {
        self.bar.paint(surface);
    }

    fn handle_tick(&mut self) {
        self.phase += 0.11;
        self.bar.set_value(50.0 + 48.0 * self.phase.sin());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn main() -> casement::Result<()> {
    let mut stack = PanelStack::new(Size::new(80, 24));
    let stop = stack.stop_handle();

    let cyan = style::resolve(Color::DarkCyan, Color::Reset, TextAttr::Normal);
    let title = style::resolve(Color::Black, Color::DarkCyan, TextAttr::Bold);

    let mut telemetry = Window::new(Rect::new(2, 1, 50, 12))
        .with_name("telemetry")
        .with_title("telemetry")
        .with_border_style(cyan)
        .with_title_style(title);
    telemetry.add(
        StatusLabel::named(Rect::new(3, 2, 20, 1), "rate")
            .with_value(12.4)
            .with_units(" MB/s")
            .with_threshold(Comparison::Gt, 90.0),
    );
    telemetry.add(
        StatusLabel::named(Rect::new(3, 4, 20, 1), "queue")
            .with_value(3)
            .with_units(" jobs"),
    );
    telemetry.add(LoadSim::new(Rect::new(3, 6, 44, 1)));
    stack.add(telemetry);

    let mut control = Window::new(Rect::new(40, 8, 36, 12))
        .with_name("control")
        .with_title("control")
        .with_border(BorderStyle::Double);
    control.add(Button::named(Rect::new(4, 3, 12, 1), "refresh", "refresh"));
    control.add(
        Button::named(Rect::new(4, 6, 12, 1), "quit", "quit").with_on_click(move || stop.stop()),
    );
    stack.add(control);

    let mut backend = TermBackend::stdout();
    stack.run(&mut backend)
}
