//! Measurement and actuation boundary.
//!
//! The control loop reads one measurement and writes one command per cycle
//! through these traits. `None` from a source means the reading is
//! unavailable; the loop treats it like a non-finite measurement.

/// Source of process measurements.
pub trait MeasurementSource {
    fn read(&mut self) -> Option<f64>;
}

/// Sink for actuation commands.
pub trait ActuationSink {
    fn write(&mut self, command: f64);
}

/// Closures act as measurement sources.
impl<F: FnMut() -> Option<f64>> MeasurementSource for F {
    #[inline]
    fn read(&mut self) -> Option<f64> {
        self()
    }
}

/// Pairs an independent source and sink into one device.
#[derive(Debug, Default)]
pub struct SplitIo<S, A> {
    pub source: S,
    pub sink: A,
}

impl<S, A> SplitIo<S, A> {
    pub fn new(source: S, sink: A) -> Self {
        Self { source, sink }
    }
}

impl<S: MeasurementSource, A> MeasurementSource for SplitIo<S, A> {
    #[inline]
    fn read(&mut self) -> Option<f64> {
        self.source.read()
    }
}

impl<S, A: ActuationSink> ActuationSink for SplitIo<S, A> {
    #[inline]
    fn write(&mut self, command: f64) {
        self.sink.write(command);
    }
}

/// Sink that remembers the last command and counts writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordingSink {
    pub last: Option<f64>,
    pub writes: u64,
}

impl ActuationSink for RecordingSink {
    #[inline]
    fn write(&mut self, command: f64) {
        self.last = Some(command);
        self.writes += 1;
    }
}
