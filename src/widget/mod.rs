mod container;
mod core;

pub use container::Container;
pub use self::core::{RepaintHandle, Widget, WidgetBase};
