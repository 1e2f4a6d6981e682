//! Minimal run-time metrics sink.
//!
//! The engine emits counters and gauges through the `metrics` facade. A
//! host that wants real collection installs its own recorder before
//! building a calculator; when none is installed, a fallback recorder
//! forwards every update to the `log` crate at debug level so the numbers
//! are still observable.

use std::sync::Arc;

use log::debug;
use metrics::{
    Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};

struct LogRecorder;

#[derive(Clone)]
struct LogHandle {
    key: Key,
}

impl CounterFn for LogHandle {
    fn increment(&self, value: u64) {
        debug!("[METRIC] {} += {}", self.key.name(), value);
    }

    fn absolute(&self, value: u64) {
        debug!("[METRIC] {} = {}", self.key.name(), value);
    }
}

impl GaugeFn for LogHandle {
    fn increment(&self, value: f64) {
        debug!("[METRIC] {} += {}", self.key.name(), value);
    }

    fn decrement(&self, value: f64) {
        debug!("[METRIC] {} -= {}", self.key.name(), value);
    }

    fn set(&self, value: f64) {
        debug!("[METRIC] {} = {}", self.key.name(), value);
    }
}

impl HistogramFn for LogHandle {
    fn record(&self, value: f64) {
        debug!("[METRIC] {} ~ {}", self.key.name(), value);
    }
}

impl Recorder for LogRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(LogHandle { key: key.clone() }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(LogHandle { key: key.clone() }))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(LogHandle { key: key.clone() }))
    }
}

/// Install the fallback recorder exactly once. A recorder the host
/// installed first wins; the error from `set_global_recorder` is ignored.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = metrics::set_global_recorder(LogRecorder);
    });
}
