mod base;
mod merge;

pub use base::{Producer, ProductionRun, ProductionRunFn};
pub use merge::{DEFAULT_SEND_ITEMS_BUFFER_SIZE, MergeProducer};
