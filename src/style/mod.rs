mod core;

pub use self::core::{
    Style, StyleKey, TextAttr, key_of, parse_attr, parse_color, resolve, resolve_named,
};
