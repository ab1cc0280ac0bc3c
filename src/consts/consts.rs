use std::time::Duration;

// Values
pub const MAX_NAME_LENGTH: usize = 15;
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_METRICS_ENDPOINT: &str = "/metrics";

/// Route label used by the metrics when no route matched the request
pub const UNKNOWN_ROUTE: &str = "unknown";
