/// Every kind of event the hardware can schedule.
///
/// Each variant is one scheduler key, so a unit can hold at most one pending
/// activation per variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// End of the current HDraw or HBlank period.
    Video,
    /// Mix and emit one audio sample.
    AudioSample,
    /// Overflow of timer 0-3.
    Timer(u8),
    /// Start of a transfer on DMA channel 0-3.
    Dma(u8),
    /// Completion of a normal-mode serial transfer.
    Serial,
}
