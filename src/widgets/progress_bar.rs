use std::any::Any;

use crossterm::style::Color;

use crate::geometry::Rect;
use crate::style::{self, Style, TextAttr};
use crate::surface::Surface;
use crate::widget::{Widget, WidgetBase};

/// A horizontal fill bar with warning/critical coloring.
///
/// The fill fraction is `(value - minimum) / (maximum - minimum)`, clamped.
/// Crossing the warning or critical threshold switches the bar style; with
/// `invert_thresholds` the comparison flips so low values alarm instead.
pub struct ProgressBar {
    base: WidgetBase,
    value: f64,
    minimum: f64,
    maximum: f64,
    show_value: bool,
    precision: usize,
    warning_threshold: f64,
    critical_threshold: f64,
    invert_thresholds: bool,
    fill_char: char,
    empty_char: char,
    normal_style: Style,
    warning_style: Style,
    critical_style: Style,
}

impl ProgressBar {
    pub fn new(rect: Rect) -> Self {
        Self {
            base: WidgetBase::new(rect),
            value: 0.0,
            minimum: 0.0,
            maximum: 100.0,
            show_value: false,
            precision: 0,
            warning_threshold: 50.0,
            critical_threshold: 75.0,
            invert_thresholds: false,
            fill_char: '█',
            empty_char: '░',
            normal_style: style::resolve(Color::DarkGreen, Color::Black, TextAttr::Normal),
            warning_style: style::resolve(Color::DarkYellow, Color::Black, TextAttr::Normal),
            critical_style: style::resolve(Color::DarkRed, Color::Black, TextAttr::Normal),
        }
    }

    pub fn named(rect: Rect, name: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::named(rect, name),
            ..Self::new(rect)
        }
    }

    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value.clamp(self.minimum, self.maximum);
        self
    }

    pub fn with_show_value(mut self, precision: usize) -> Self {
        self.show_value = true;
        self.precision = precision;
        self
    }

    pub fn with_thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.warning_threshold = warning;
        self.critical_threshold = critical;
        self
    }

    /// Alarm on low values instead of high ones.
    pub fn with_inverted_thresholds(mut self) -> Self {
        self.invert_thresholds = true;
        self
    }

    pub fn with_glyphs(mut self, fill: char, empty: char) -> Self {
        self.fill_char = fill;
        self.empty_char = empty;
        self
    }

    pub fn with_normal_style(mut self, style: Style) -> Self {
        self.normal_style = style;
        self
    }

    pub fn with_warning_style(mut self, style: Style) -> Self {
        self.warning_style = style;
        self
    }

    pub fn with_critical_style(mut self, style: Style) -> Self {
        self.critical_style = style;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value.clamp(self.minimum, self.maximum);
        self.base.request_repaint();
    }

    fn current_style(&self) -> Style {
        if self.invert_thresholds {
            if self.value < self.critical_threshold {
                self.critical_style
            } else if self.value < self.warning_threshold {
                self.warning_style
            } else {
                self.normal_style
            }
        } else if self.value >= self.critical_threshold {
            self.critical_style
        } else if self.value >= self.warning_threshold {
            self.warning_style
        } else {
            self.normal_style
        }
    }

    fn compose(&self, width: u16) -> String {
        let text = if self.show_value {
            format!(" {:.*} ", self.precision, self.value)
        } else {
            String::new()
        };
        let bar_width = (width as usize).saturating_sub(text.chars().count());

        let span = self.maximum - self.minimum;
        let ratio = if span > 0.0 {
            ((self.value - self.minimum) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let filled = (ratio * bar_width as f64).round() as usize;

        let mut bar = String::with_capacity(width as usize);
        bar.extend(std::iter::repeat_n(self.fill_char, filled));
        bar.extend(std::iter::repeat_n(self.empty_char, bar_width - filled));
        bar.push_str(&text);
        bar
    }
}

impl Widget for ProgressBar {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn paint(&self, surface: &mut dyn Surface) {
        let rect = self.rect();
        if rect.width == 0 {
            return;
        }
        let bar = self.compose(rect.width);
        surface.write_text(rect.x, rect.y, &bar, self.current_style());
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

    fn paint(bar: &ProgressBar, width: u16) -> (CellBuffer, String) {
        let mut buf = CellBuffer::new(Size::new(width, 1));
        bar.paint(&mut buf);
        let text = buf.row_text(0);
        (buf, text)
    }

    #[test]
    fn half_full_bar() {
        let bar = ProgressBar::new(Rect::new(0, 0, 10, 1)).with_value(50.0);
        let (_, text) = paint(&bar, 10);
        assert_eq!(text, "█████░░░░░");
    }

    #[test]
    fn value_text_shrinks_the_bar() {
        let bar = ProgressBar::new(Rect::new(0, 0, 10, 1))
            .with_value(50.0)
            .with_show_value(0);
        let (_, text) = paint(&bar, 10);
        assert_eq!(text, "███░░░ 50 ");
    }

    #[test]
    fn values_clamp_to_range() {
        let mut bar = ProgressBar::new(Rect::new(0, 0, 10, 1));
        bar.set_value(250.0);
        assert_eq!(bar.value(), 100.0);
        let (_, text) = paint(&bar, 10);
        assert_eq!(text, "██████████");

        bar.set_value(-10.0);
        assert_eq!(bar.value(), 0.0);
    }

    #[test]
    fn degenerate_range_renders_empty() {
        let bar = ProgressBar::new(Rect::new(0, 0, 6, 1)).with_range(5.0, 5.0);
        let (_, text) = paint(&bar, 6);
        assert_eq!(text, "░░░░░░");
    }

    #[test]
    fn threshold_selects_style() {
        let mut bar = ProgressBar::new(Rect::new(0, 0, 10, 1)).with_thresholds(50.0, 75.0);

        bar.set_value(10.0);
        let (buf, _) = paint(&bar, 10);
        let normal = buf.cell(0, 0).unwrap().style;

        bar.set_value(60.0);
        let (buf, _) = paint(&bar, 10);
        let warning = buf.cell(0, 0).unwrap().style;

        bar.set_value(90.0);
        let (buf, _) = paint(&bar, 10);
        let critical = buf.cell(0, 0).unwrap().style;

        assert_ne!(normal, warning);
        assert_ne!(warning, critical);
    }

    #[test]
    fn inverted_thresholds_alarm_on_low_values() {
        let mut bar = ProgressBar::new(Rect::new(0, 0, 10, 1))
            .with_thresholds(40.0, 20.0)
            .with_inverted_thresholds();

        bar.set_value(10.0);
        assert_eq!(bar.current_style(), bar.critical_style);
        bar.set_value(30.0);
        assert_eq!(bar.current_style(), bar.warning_style);
        bar.set_value(80.0);
        assert_eq!(bar.current_style(), bar.normal_style);
    }
}
