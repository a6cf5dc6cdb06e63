use thiserror::Error;

/// A single transfer with one I/O expander failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusFault {
    #[error("no acknowledge from chip at address {address:#04x}")]
    Nack { address: u8 },
    #[error("bus arbitration lost")]
    ArbitrationLost,
    #[error("bus timed out")]
    Timeout,
}

/// The sampler discarded a whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("reading chip {chip} failed")]
    Chip {
        chip: usize,
        #[source]
        source: BusFault,
    },
}
