pub use dispatch_observability::{encode_prometheus_text, Metrics};
