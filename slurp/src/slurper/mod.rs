mod base;
mod composition;

pub use base::{Slurper, SlurperFn};
pub use composition::CompositionSlurper;
