//! Test doubles shared by unit and integration tests.
//!
//! The mock processor stands in for the external processing service so
//! handler and dispatcher tests run without real infrastructure.

mod mock_processor;

pub use mock_processor::MockProcessorClient;
