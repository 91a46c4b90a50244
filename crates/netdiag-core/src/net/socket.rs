use crate::config::ProbeStrategy;
use crate::error::IoResult;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};

/// The address family of a probe target.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Family {
    V4,
    V6,
}

impl From<IpAddr> for Family {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

/// A socket over which a single echo probe is sent and its reply awaited.
///
/// One socket per probe call: opened, used and dropped within the call.
#[async_trait]
pub trait ProbeSocket
where
    Self: Sized + Send + Sync,
{
    /// Open a socket for the given family and wire strategy.
    fn open(family: Family, strategy: ProbeStrategy) -> IoResult<Self>;
    /// Set the outgoing time-to-live / hop limit.
    fn set_ttl(&self, ttl: u8) -> IoResult<()>;
    /// Set or clear don't-fragment on outgoing probes.
    fn set_dont_fragment(&self, dont_fragment: bool) -> IoResult<()>;
    /// Send `buf` to `addr`.
    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> IoResult<usize>;
    /// Receive the next datagram into `buf`.
    async fn recv_from(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)>;
}

#[cfg(unix)]
pub use unix::SocketImpl;

#[cfg(unix)]
mod unix {
    use super::{Family, ProbeSocket};
    use crate::config::ProbeStrategy;
    use crate::error::{IoError, IoOperation, IoResult};
    use async_trait::async_trait;
    use socket2::{Domain, Protocol, SockAddr, Socket, Type};
    use std::io;
    use std::net::SocketAddr;
    use tokio::io::unix::AsyncFd;
    use tracing::instrument;

    /// A probe socket backed by a non-blocking `socket2::Socket` registered
    /// with the tokio reactor.
    pub struct SocketImpl {
        fd: AsyncFd<Socket>,
        family: Family,
    }

    impl SocketImpl {
        fn new(domain: Domain, ty: Type, protocol: Protocol, family: Family) -> IoResult<Self> {
            let socket = Socket::new(domain, ty, Some(protocol))
                .map_err(|err| IoError::Other(err, IoOperation::NewSocket))?;
            socket
                .set_nonblocking(true)
                .map_err(|err| IoError::Other(err, IoOperation::SetNonBlocking))?;
            let fd = AsyncFd::new(socket)
                .map_err(|err| IoError::Other(err, IoOperation::RegisterFd))?;
            Ok(Self { fd, family })
        }

        fn socket(&self) -> &Socket {
            self.fd.get_ref()
        }
    }

    #[async_trait]
    impl ProbeSocket for SocketImpl {
        #[instrument(level = "trace")]
        fn open(family: Family, strategy: ProbeStrategy) -> IoResult<Self> {
            let domain = match family {
                Family::V4 => Domain::IPV4,
                Family::V6 => Domain::IPV6,
            };
            let ty = match strategy {
                ProbeStrategy::RawIcmp => Type::RAW,
                ProbeStrategy::UdpDatagram => Type::DGRAM,
            };
            let protocol = match family {
                Family::V4 => Protocol::ICMPV4,
                Family::V6 => Protocol::ICMPV6,
            };
            Self::new(domain, ty, protocol, family)
        }

        #[instrument(skip(self), level = "trace")]
        fn set_ttl(&self, ttl: u8) -> IoResult<()> {
            match self.family {
                Family::V4 => {
                    self.socket()
                        .set_ttl_v4(u32::from(ttl))
                        .map_err(|err| IoError::Other(err, IoOperation::SetTtl))?;
                    self.socket()
                        .set_multicast_ttl_v4(u32::from(ttl))
                        .map_err(|err| IoError::Other(err, IoOperation::SetMulticastTtl))
                }
                Family::V6 => self
                    .socket()
                    .set_unicast_hops_v6(u32::from(ttl))
                    .map_err(|err| IoError::Other(err, IoOperation::SetUnicastHopsV6)),
            }
        }

        #[instrument(skip(self), level = "trace")]
        fn set_dont_fragment(&self, dont_fragment: bool) -> IoResult<()> {
            set_dont_fragment(self.socket(), self.family, dont_fragment)
                .map_err(|err| IoError::Other(err, IoOperation::SetDontFragment))
        }

        #[instrument(skip(self, buf), level = "trace")]
        async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> IoResult<usize> {
            let remote = SockAddr::from(addr);
            loop {
                let mut guard = self
                    .fd
                    .writable()
                    .await
                    .map_err(|err| IoError::Other(err, IoOperation::Send))?;
                match guard.try_io(|inner| inner.get_ref().send_to(buf, &remote)) {
                    Ok(res) => {
                        let sent = res.map_err(|err| IoError::SendTo(err, addr))?;
                        tracing::trace!(sent, ?addr);
                        return Ok(sent);
                    }
                    Err(_would_block) => continue,
                }
            }
        }

        #[instrument(skip(self, buf), level = "trace")]
        async fn recv_from(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)> {
            loop {
                let mut guard = self
                    .fd
                    .readable()
                    .await
                    .map_err(|err| IoError::Other(err, IoOperation::RecvFrom))?;
                match guard.try_io(|inner| recv_from_into_buf(inner.get_ref(), buf)) {
                    Ok(res) => {
                        let (bytes_read, addr) =
                            res.map_err(|err| IoError::Other(err, IoOperation::RecvFrom))?;
                        tracing::trace!(bytes_read, ?addr);
                        return Ok((bytes_read, addr));
                    }
                    Err(_would_block) => continue,
                }
            }
        }
    }

    // Safety: the `recv` implementation promises not to write uninitialised
    // bytes to the buffer, so this casting is safe.
    //
    // `socket2::Socket` does not provide a `recv_from` which writes to a
    // `&mut [u8]`, see https://github.com/rust-lang/socket2/issues/223.
    #[allow(unsafe_code)]
    fn recv_from_into_buf(
        socket: &Socket,
        buf: &mut [u8],
    ) -> io::Result<(usize, Option<SocketAddr>)> {
        let buf = unsafe {
            &mut *(std::ptr::from_mut::<[u8]>(buf) as *mut [std::mem::MaybeUninit<u8>])
        };
        socket
            .recv_from(buf)
            .map(|(size, addr)| (size, addr.as_socket()))
    }

    // The DF bit for sockets which do not supply their own IP header is the
    // path-MTU-discovery option on Linux; other platforms have no portable
    // equivalent and keep the system default.
    #[cfg(target_os = "linux")]
    #[allow(unsafe_code)]
    fn set_dont_fragment(socket: &Socket, family: Family, dont_fragment: bool) -> io::Result<()> {
        use nix::libc;
        use std::os::fd::AsRawFd;
        let (level, option) = match family {
            Family::V4 => (libc::IPPROTO_IP, libc::IP_MTU_DISCOVER),
            Family::V6 => (libc::IPPROTO_IPV6, libc::IPV6_MTU_DISCOVER),
        };
        let value: libc::c_int = if dont_fragment {
            libc::IP_PMTUDISC_DO
        } else {
            libc::IP_PMTUDISC_DONT
        };
        let res = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                level,
                option,
                std::ptr::addr_of!(value).cast(),
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if res == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn set_dont_fragment(_socket: &Socket, _family: Family, dont_fragment: bool) -> io::Result<()> {
        tracing::trace!(dont_fragment, "don't-fragment not supported, ignored");
        Ok(())
    }
}
