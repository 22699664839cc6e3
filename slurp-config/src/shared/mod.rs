//! Configuration types shared by every slurp component.

mod base;
mod rate;
mod slurp;

pub use base::ValidationError;
pub use rate::RateConfig;
pub use slurp::SlurpConfig;
