use std::io;
use std::net::TcpStream;

use crate::smtp::Reply;

/// An error from address parsing, message rendering or delivery.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The mailbox spec is empty or not of the form `local@domain`.
    #[error("invalid mailbox address {0:?}")]
    InvalidAddress(String),

    /// The message has no sender and no default sender is configured.
    #[error("no sender address available")]
    MissingSender,

    /// The configuration names an encryption mode that is not implemented.
    #[error("unsupported encryption mode {0:?}")]
    UnsupportedEncryption(String),

    /// Dialing, socket I/O or the TLS handshake failed.
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    /// The server rejected an SMTP command;
    /// the reply carries the status line.
    #[error("server rejected command: {0}")]
    Protocol(Reply),

    /// Rendering a template body failed.
    ///
    /// Only present with the `template` feature.
    #[cfg(feature = "template")]
    #[error(transparent)]
    Template(#[from] tera::Error),
}

impl From<native_tls::Error> for Error {
    fn from(error: native_tls::Error) -> Self {
        Error::Transport(io::Error::new(io::ErrorKind::Other, error))
    }
}

impl From<native_tls::HandshakeError<TcpStream>> for Error {
    fn from(error: native_tls::HandshakeError<TcpStream>) -> Self {
        Error::Transport(io::Error::new(io::ErrorKind::Other, error.to_string()))
    }
}
