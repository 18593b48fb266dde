/// Signals the display emits to the protocol layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Pending frame count is above (`true`) or at/below (`false`) the threshold.
    Backpressure(bool),
    /// Every pending frame has been applied.
    FlushReady,
}

/// Outbound callbacks of a [`crate::Display`].
///
/// Called from the thread driving the render tick.
pub trait DisplayEvents: Send {
    /// Emitted once per tick with the current saturation state.
    fn on_backpressure(&mut self, saturated: bool);

    /// Emitted when a tick empties the frame queue.
    fn on_flush_ready(&mut self);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEvents;

impl DisplayEvents for NoopEvents {
    fn on_backpressure(&mut self, _saturated: bool) {}

    fn on_flush_ready(&mut self) {}
}

impl DisplayEvents for crossbeam_channel::Sender<DisplayEvent> {
    fn on_backpressure(&mut self, saturated: bool) {
        if self.send(DisplayEvent::Backpressure(saturated)).is_err() {
            tracing::trace!("event receiver gone; dropping backpressure signal");
        }
    }

    fn on_flush_ready(&mut self) {
        if self.send(DisplayEvent::FlushReady).is_err() {
            tracing::trace!("event receiver gone; dropping flush signal");
        }
    }
}
