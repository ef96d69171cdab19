mod utils;

pub use utils::reduce_zone_change;
pub use utils::ZoneChange;
