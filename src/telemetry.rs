pub use dispatch_observability::{annotate_span_with_trace_ids, init_telemetry, shutdown_telemetry};
