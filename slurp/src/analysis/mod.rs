mod analyst;
mod request;
mod slurper;

pub use analyst::Analyst;
pub use request::AnalysisRequest;
pub use slurper::AnalysisRequestSlurper;
