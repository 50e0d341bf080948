/// Underlying cause of a transport failure, kept opaque so the error type
/// does not depend on which backend is compiled in.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a [`Connection`](crate::Connection).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached or refused the upgrade.
    #[error("could not connect to {url}: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    /// A line could not be written. Usually the peer is already gone.
    #[error("write failed: {0}")]
    Send(#[source] BoxError),

    /// The stream broke while waiting for the next line.
    #[error("read failed: {0}")]
    Receive(#[source] BoxError),

    /// The server sent a binary frame; the game protocol is text only.
    #[error("unexpected binary frame ({0} bytes)")]
    BinaryFrame(usize),
}
