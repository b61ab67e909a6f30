mod mock_runtime;

pub use mock_runtime::{FakeClock, FakeHealthCheck, FakeListener, MockCommandRunner};
