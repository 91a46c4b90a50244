use std::fmt::{Display, Formatter};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A probe error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A probe error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid packet size: {0}")]
    InvalidPacketSize(usize),
    #[error("invalid packet: {0}")]
    PacketError(#[from] netdiag_packet::error::Error),
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("unexpected icmp packet: type={icmp_type}, code={icmp_code}")]
    UnexpectedIcmp { icmp_type: u8, icmp_code: u8 },
    #[error("operation cancelled")]
    Cancelled,
}

/// Custom IO error result.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Custom IO error.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("sendto error for {1}: {0}")]
    SendTo(io::Error, SocketAddr),
    #[error("failed to {1}: {0}")]
    Other(io::Error, IoOperation),
}

impl IoError {
    /// The underlying `io::ErrorKind`.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::SendTo(e, _) | Self::Other(e, _) => e.kind(),
        }
    }
}

/// Io operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IoOperation {
    NewSocket,
    SetNonBlocking,
    RegisterFd,
    SetTtl,
    SetMulticastTtl,
    SetUnicastHopsV6,
    SetDontFragment,
    Send,
    RecvFrom,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create new socket"),
            Self::SetNonBlocking => write!(f, "set non-blocking"),
            Self::RegisterFd => write!(f, "register socket with reactor"),
            Self::SetTtl => write!(f, "set TTL"),
            Self::SetMulticastTtl => write!(f, "set multicast TTL"),
            Self::SetUnicastHopsV6 => write!(f, "set unicast hops v6"),
            Self::SetDontFragment => write!(f, "set don't fragment"),
            Self::Send => write!(f, "send"),
            Self::RecvFrom => write!(f, "recv from"),
        }
    }
}
