use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crossterm::style::{Attribute, Color};

use crate::error::{Error, Result};

/// Closed set of text attributes a style triple can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAttr {
    #[default]
    Normal,
    Bold,
    Dim,
    Underline,
    Reverse,
    Blink,
}

impl TextAttr {
    /// The crossterm attribute used when encoding output.
    pub fn attribute(self) -> Attribute {
        match self {
            TextAttr::Normal => Attribute::Reset,
            TextAttr::Bold => Attribute::Bold,
            TextAttr::Dim => Attribute::Dim,
            TextAttr::Underline => Attribute::Underlined,
            TextAttr::Reverse => Attribute::Reverse,
            TextAttr::Blink => Attribute::SlowBlink,
        }
    }
}

/// A (foreground, background, attribute) triple before resolution.
pub type StyleKey = (Color, Color, TextAttr);

/// Opaque handle to a resolved style triple.
///
/// Handles are stable for the lifetime of the process: once a triple is
/// resolved, every later resolution of the same triple returns the same
/// handle. Handle 0 is the terminal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style(pub(crate) u16);

impl Style {
    pub const DEFAULT: Style = Style(0);
}

impl Default for Style {
    fn default() -> Self {
        Style::DEFAULT
    }
}

const DEFAULT_KEY: StyleKey = (Color::Reset, Color::Reset, TextAttr::Normal);

struct StyleCache {
    slots: Vec<StyleKey>,
    index: HashMap<StyleKey, Style>,
}

impl StyleCache {
    fn new() -> Self {
        let mut cache = Self {
            slots: Vec::new(),
            index: HashMap::new(),
        };
        cache.intern(DEFAULT_KEY);
        cache
    }

    fn intern(&mut self, key: StyleKey) -> Style {
        if let Some(style) = self.index.get(&key) {
            return *style;
        }
        // Slot ids are a bounded resource; saturate to the default rather
        // than wrap once the id space is exhausted.
        if self.slots.len() > u16::MAX as usize {
            return Style::DEFAULT;
        }
        let style = Style(self.slots.len() as u16);
        self.slots.push(key);
        self.index.insert(key, style);
        style
    }

    fn key_of(&self, style: Style) -> StyleKey {
        self.slots.get(style.0 as usize).copied().unwrap_or(DEFAULT_KEY)
    }
}

// Process-wide cache, initialized on first use, never torn down. Bounded by
// the number of distinct triples the application requests.
static CACHE: OnceLock<Mutex<StyleCache>> = OnceLock::new();

fn cache() -> &'static Mutex<StyleCache> {
    CACHE.get_or_init(|| Mutex::new(StyleCache::new()))
}

/// Resolve a style triple to its stable handle, memoizing on first use.
pub fn resolve(fg: Color, bg: Color, attr: TextAttr) -> Style {
    let mut guard = cache().lock().expect("style cache poisoned");
    guard.intern((fg, bg, attr))
}

/// Recover the triple behind a handle. Unknown handles decode as default.
pub fn key_of(style: Style) -> StyleKey {
    let guard = cache().lock().expect("style cache poisoned");
    guard.key_of(style)
}

/// Resolve a triple given by color/attribute names, e.g. `("cyan",
/// "default", "bold")`.
pub fn resolve_named(fg: &str, bg: &str, attr: &str) -> Result<Style> {
    Ok(resolve(parse_color(fg)?, parse_color(bg)?, parse_attr(attr)?))
}

/// Map a color name to a terminal color. `default` means the terminal's
/// configured color.
pub fn parse_color(name: &str) -> Result<Color> {
    let color = match name {
        "default" => Color::Reset,
        "black" => Color::Black,
        "red" => Color::DarkRed,
        "green" => Color::DarkGreen,
        "yellow" => Color::DarkYellow,
        "blue" => Color::DarkBlue,
        "magenta" => Color::DarkMagenta,
        "cyan" => Color::DarkCyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Grey,
        "bright_black" => Color::DarkGrey,
        "bright_red" => Color::Red,
        "bright_green" => Color::Green,
        "bright_yellow" => Color::Yellow,
        "bright_blue" => Color::Blue,
        "bright_magenta" => Color::Magenta,
        "bright_cyan" => Color::Cyan,
        "bright_white" => Color::White,
        other => return Err(Error::UnknownColor(other.to_string())),
    };
    Ok(color)
}

/// Map an attribute name to a [`TextAttr`].
pub fn parse_attr(name: &str) -> Result<TextAttr> {
    let attr = match name {
        "default" | "normal" => TextAttr::Normal,
        "bold" => TextAttr::Bold,
        "dim" => TextAttr::Dim,
        "underline" => TextAttr::Underline,
        "reverse" | "standout" | "bright" => TextAttr::Reverse,
        "blink" => TextAttr::Blink,
        other => return Err(Error::UnknownAttribute(other.to_string())),
    };
    Ok(attr)
}
