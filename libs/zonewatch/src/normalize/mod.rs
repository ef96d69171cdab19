mod utils;

pub use utils::decode_image;
pub use utils::normalize_pair;
pub use utils::resize_area;
pub use utils::NormalizedPair;
