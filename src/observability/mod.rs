pub mod logger;
pub mod metrics;

pub use logger::AccessLogger;
pub use metrics::MetricsCollector;
