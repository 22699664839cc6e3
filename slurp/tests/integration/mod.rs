mod pipeline_test;
mod service_test;
