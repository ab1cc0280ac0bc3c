use std::time::Duration;

use clap::Parser;

/// 📇 People API, CRUD over a collection of people backed by an embedded document store
#[derive(Parser, Debug)]
pub struct Cli {
    /// Address the HTTP server will bind to
    #[clap(short, long, env = "BIND_ADDRESS", default_value = "127.0.0.1")]
    pub address: String,

    /// Port the HTTP server will run on
    #[clap(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Deadline of a single store operation on read routes
    #[clap(long, default_value_t = 10)]
    pub read_timeout_secs: u64,

    /// Deadline of a single store operation on write routes
    #[clap(long, default_value_t = 5)]
    pub write_timeout_secs: u64,

    /// Path the Prometheus metrics are served on
    #[clap(long, env = "METRICS_ENDPOINT", default_value = "/metrics")]
    pub metrics_endpoint: String,

    /// Logs every HTTP request
    #[clap(long)]
    pub log_http: bool,

    #[clap(long, default_value_t = 2)]
    pub http_workers: usize,

    /// Time a client has to send the request head
    #[clap(long, default_value_t = 5)]
    pub client_request_timeout_secs: u64,

    /// Time a client has to acknowledge a connection shutdown
    #[clap(long, default_value_t = 10)]
    pub client_disconnect_timeout_secs: u64,

    /// Idle keep-alive connections are closed after this long
    #[clap(long, default_value_t = 120)]
    pub keep_alive_secs: u64,

    /// Documents returned per cursor round trip to the store
    #[clap(long, default_value_t = 100)]
    pub cursor_batch_size: usize,
}

impl Cli {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn client_request_timeout(&self) -> Duration {
        Duration::from_secs(self.client_request_timeout_secs)
    }

    pub fn client_disconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.client_disconnect_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}
