use std::fmt::Debug;

use instant::Instant;

pub mod monitoring;

pub use monitoring::ChunkReport;

/// A running measurement started by a [`JobMonitor`].
#[derive(Clone, Debug)]
pub struct Span {
    label: String,
    start: Instant,
}

impl Span {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Observes the processing of chunk jobs.
pub trait JobMonitor: Send + Sync + Debug {
    fn start(&self, label: &str) -> Span;

    /// Ends `span` and returns its duration in milliseconds.
    fn stop(&self, span: Span) -> f64;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct LogMonitor;

impl JobMonitor for LogMonitor {
    fn start(&self, label: &str) -> Span {
        log::debug!("{label} started");
        Span::new(label)
    }

    fn stop(&self, span: Span) -> f64 {
        let elapsed = span.elapsed_ms();
        log::info!("{} took {:.3} ms", span.label(), elapsed);
        elapsed
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct NoopMonitor;

impl JobMonitor for NoopMonitor {
    fn start(&self, label: &str) -> Span {
        Span::new(label)
    }

    fn stop(&self, span: Span) -> f64 {
        span.elapsed_ms()
    }
}
