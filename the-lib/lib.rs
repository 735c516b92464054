use smartstring::{LazyCompact, SmartString};

pub mod diff;
pub mod line_index;
pub mod patch;
pub mod position;
pub mod transaction;

pub type Tendril = SmartString<LazyCompact>;
