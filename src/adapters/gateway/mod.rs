//! Gateway adapters.

mod mock_gateway;

pub use mock_gateway::{MethodCall, MockGateway, SignatureMode};
