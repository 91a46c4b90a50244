mod ip;
mod ipv4;
mod ipv6;
mod prober;
mod recv;
mod socket;

pub use ip::IpHeader;
pub use prober::SocketProber;
pub use socket::{Family, ProbeSocket};

#[cfg(unix)]
pub use socket::SocketImpl;

/// The maximum size of the IP packet we allow.
pub const MAX_PACKET_SIZE: usize = 1024;
