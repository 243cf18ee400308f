/// Settings fixed for the lifetime of a [`Core`](crate::machine::Core).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    /// Output sample rate of the audio unit in Hz.
    pub audio_sample_rate: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            audio_sample_rate: 32_768,
        }
    }
}
