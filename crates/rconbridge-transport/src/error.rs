/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An operation needed a live session but none is established.
    #[error("not connected")]
    NotConnected,

    /// The connection was closed underneath us.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening the socket or resolving the server address failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The server refused the RCON password.
    #[error("login rejected by server")]
    LoginRejected,

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The server did not answer in time.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// A datagram could not be decoded.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),
}
