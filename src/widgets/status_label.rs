use std::any::Any;

use crate::geometry::Rect;
use crate::style::Style;
use crate::surface::Surface;
use crate::widget::{Widget, WidgetBase};

/// Displayable value carried by a [`StatusLabel`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    fn render(&self, precision: usize) -> String {
        match self {
            Value::Int(value) => format!("{value}"),
            Value::Float(value) => format!("{value:.precision$}"),
            Value::Text(value) => value.clone(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Text(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Threshold comparison deciding when a label reports a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    /// Never faults.
    #[default]
    None,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

/// A value readout with units and an optional fault threshold.
///
/// Numeric values are compared against the threshold each paint; a
/// tripped comparison switches the value to the fault style. Text values
/// never fault.
pub struct StatusLabel {
    base: WidgetBase,
    value: Value,
    units: String,
    precision: usize,
    normal_style: Style,
    fault_style: Style,
    units_style: Style,
    threshold: f64,
    comparison: Comparison,
}

impl StatusLabel {
    pub fn new(rect: Rect) -> Self {
        Self {
            base: WidgetBase::new(rect),
            value: Value::Float(0.0),
            units: String::new(),
            precision: 1,
            normal_style: Style::DEFAULT,
            fault_style: Style::DEFAULT,
            units_style: Style::DEFAULT,
            threshold: 0.0,
            comparison: Comparison::None,
        }
    }

    pub fn named(rect: Rect, name: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::named(rect, name),
            ..Self::new(rect)
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_normal_style(mut self, style: Style) -> Self {
        self.normal_style = style;
        self
    }

    pub fn with_fault_style(mut self, style: Style) -> Self {
        self.fault_style = style;
        self
    }

    pub fn with_units_style(mut self, style: Style) -> Self {
        self.units_style = style;
        self
    }

    pub fn with_threshold(mut self, comparison: Comparison, threshold: f64) -> Self {
        self.comparison = comparison;
        self.threshold = threshold;
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into();
        self.base.request_repaint();
    }

    pub fn set_units(&mut self, units: impl Into<String>) {
        self.units = units.into();
        self.base.request_repaint();
    }

    /// Whether the current value trips the fault threshold.
    pub fn faulted(&self) -> bool {
        let Some(value) = self.value.as_f64() else {
            return false;
        };
        match self.comparison {
            Comparison::None => false,
            Comparison::Lt => value < self.threshold,
            Comparison::Le => value <= self.threshold,
            Comparison::Gt => value > self.threshold,
            Comparison::Ge => value >= self.threshold,
            Comparison::Eq => value == self.threshold,
        }
    }
}

impl Widget for StatusLabel {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn paint(&self, surface: &mut dyn Surface) {
        let rect = self.rect();
        let text = self.value.render(self.precision);
        let style = if self.faulted() {
            self.fault_style
        } else {
            self.normal_style
        };
        surface.write_text(rect.x, rect.y, &text, style);
        if !self.units.is_empty() {
            let offset = rect.x.saturating_add(text.chars().count() as u16);
            surface.write_text(offset, rect.y, &self.units, self.units_style);
        }
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
    use crate::style::{self, TextAttr};
    use crate::surface::CellBuffer;
    use crossterm::style::Color;

    #[test]
    fn renders_value_and_units() {
        let label = StatusLabel::new(Rect::new(0, 0, 10, 1))
            .with_value(42.5)
            .with_units("MB/s");
        let mut buf = CellBuffer::new(Size::new(10, 1));
        label.paint(&mut buf);
        assert_eq!(buf.row_text(0), "42.5MB/s  ");
    }

    #[test]
    fn integer_values_render_without_fraction() {
        let label = StatusLabel::new(Rect::new(0, 0, 6, 1)).with_value(7);
        let mut buf = CellBuffer::new(Size::new(6, 1));
        label.paint(&mut buf);
        assert_eq!(buf.row_text(0), "7     ");
    }

    #[test]
    fn threshold_comparisons() {
        let mut label =
            StatusLabel::new(Rect::new(0, 0, 6, 1)).with_threshold(Comparison::Gt, 75.0);
        label.set_value(70.0);
        assert!(!label.faulted());
        label.set_value(80.0);
        assert!(label.faulted());

        let mut low = StatusLabel::new(Rect::new(0, 0, 6, 1)).with_threshold(Comparison::Le, 5.0);
        low.set_value(5.0);
        assert!(low.faulted());
    }

    #[test]
    fn text_values_never_fault() {
        let label = StatusLabel::new(Rect::new(0, 0, 6, 1))
            .with_value("link")
            .with_threshold(Comparison::Eq, 0.0);
        assert!(!label.faulted());
    }

    #[test]
    fn fault_switches_style() {
        let fault = style::resolve(Color::DarkRed, Color::Reset, TextAttr::Bold);
        let mut label = StatusLabel::new(Rect::new(0, 0, 6, 1))
            .with_fault_style(fault)
            .with_threshold(Comparison::Ge, 100.0);
        label.set_value(120.0);

        let mut buf = CellBuffer::new(Size::new(6, 1));
        label.paint(&mut buf);
        assert_eq!(buf.cell(0, 0).unwrap().style, fault);
    }

    #[test]
    fn set_value_requests_repaint() {
        use crate::widget::RepaintHandle;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let flag = Arc::new(AtomicBool::new(false));
        let mut label = StatusLabel::new(Rect::new(0, 0, 6, 1));
        label.attach(RepaintHandle::to(&flag));

        label.set_value(3);
        assert!(flag.load(Ordering::Relaxed));
    }
}
