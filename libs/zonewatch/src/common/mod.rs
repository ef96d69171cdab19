mod utils;
mod types;

pub use utils::get_current_timestamp_str;
pub use utils::invocation_file_name;
pub use utils::format_percentage;
pub use types::{BoundingBox, EncodedImage};
