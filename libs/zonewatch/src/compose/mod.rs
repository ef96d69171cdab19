mod types;
pub use types::{RenderInput, RenderMode};

mod utils;
pub use utils::{encode_png, render};
