#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Payload does not fit a single frame of the transport.
    PayloadTooLarge,
    /// Buffer to encode the frame into is too small.
    BufferTooSmall,
    /// The transceiver or byte stream returned an error.
    Inner(E),
}

/// Failure to build a serial frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    PayloadTooLarge,
    BufferTooSmall,
}

impl<E> From<EncodeError> for Error<E> {
    fn from(value: EncodeError) -> Self {
        match value {
            EncodeError::PayloadTooLarge => Error::PayloadTooLarge,
            EncodeError::BufferTooSmall => Error::BufferTooSmall,
        }
    }
}
