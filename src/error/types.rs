use thiserror::Error;

use crate::geometry::{Rect, Size};

/// Unified result type for the casement crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the compositor runtime.
///
/// Render faults (out-of-bounds draws) are absorbed at the surface and never
/// reach this type. Geometry faults are reported here with state unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("window `{0}` not found")]
    WindowNotFound(String),
    #[error("widget `{0}` not found")]
    WidgetNotFound(String),
    #[error("geometry {target:?} does not fit screen {bounds:?}")]
    Geometry { target: Rect, bounds: Size },
    #[error("unknown color name `{0}`")]
    UnknownColor(String),
    #[error("unknown attribute name `{0}`")]
    UnknownAttribute(String),
    #[error("terminal backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
