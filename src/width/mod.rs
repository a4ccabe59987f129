mod utils;

pub use utils::{center, display_width};
