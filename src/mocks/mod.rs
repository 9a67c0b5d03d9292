//! Mock implementations for testing.

pub mod transport;

pub use transport::{MockResponse, MockTransport};
