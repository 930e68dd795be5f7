pub mod processing_error;

pub use processing_error::ProcessingFailure;
