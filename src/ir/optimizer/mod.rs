pub mod combo;
pub mod phase;

pub use combo::{ComboConfig, ComboStats};
pub use phase::{Phase, run_pipeline};
