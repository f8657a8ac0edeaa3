//! Shared test support

pub mod fixtures;
pub mod mock_gateway;
pub mod recording_progress;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_gateway::MockGateway;
#[allow(unused_imports)]
pub use recording_progress::RecordingProgress;
