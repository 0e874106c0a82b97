/// Errors reported by the driver. `E` is the error type of the [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// The channel does not exist on this device.
    #[error("channel {channel} is out of range, device has {count} channels")]
    InvalidChannel { channel: u8, count: u8 },
    /// The bus transfer, chip-select or delay failed.
    #[error("transport failure: {0:?}")]
    Transport(E),
    /// The data-ready line did not signal a finished conversion in time.
    #[error("conversion not ready after {waited_ms} ms")]
    NotReady { waited_ms: u32 },
    /// The data-ready line could not be read.
    #[error("data-ready pin could not be read")]
    ReadyPin,
}

/// Coarse classification of an [`Error`], independent of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// [`Error::InvalidChannel`]
    InvalidChannel,
    /// [`Error::Transport`]
    TransportFailure,
    /// [`Error::NotReady`]
    Timeout,
    /// [`Error::ReadyPin`]
    ReadyPin,
}

impl<E> Error<E> {
    /// Classifies the error without exposing the transport's error type.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidChannel { .. } => ErrorKind::InvalidChannel,
            Error::Transport(_) => ErrorKind::TransportFailure,
            Error::NotReady { .. } => ErrorKind::Timeout,
            Error::ReadyPin => ErrorKind::ReadyPin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_messages() {
        let invalid: Error<()> = Error::InvalidChannel { channel: 9, count: 8 };
        assert_eq!(invalid.kind(), ErrorKind::InvalidChannel);
        assert_eq!(invalid.to_string(), "channel 9 is out of range, device has 8 channels");

        let timeout: Error<()> = Error::NotReady { waited_ms: 960 };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(timeout.to_string(), "conversion not ready after 960 ms");

        assert_eq!(Error::Transport("bus fault").kind(), ErrorKind::TransportFailure);
        assert_eq!(Error::<()>::ReadyPin.kind(), ErrorKind::ReadyPin);
    }
}
