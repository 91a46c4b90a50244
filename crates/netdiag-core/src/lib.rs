//! netdiag - ping and traceroute primitives over raw ICMP/UDP sockets.
//!
//! This crate is the wire-level probe engine: it hand-builds ICMP echo
//! requests, parses IP headers out of raw datagrams, awaits replies behind
//! a cancellable, timeout-bounded receive which filters foreign packets,
//! retries timed out probes, and sweeps the time-to-live upwards to trace
//! the route to a target.
//!
//! Two socket strategies implement the [`ProbeDelegate`] capability:
//! [`IcmpProbe`] over a raw ICMP socket (privileged) and [`UdpProbe`] over
//! a datagram socket addressed with the ICMP protocol number (the
//! unprivileged fallback). The strategy is an explicit construction-time
//! choice.
//!
//! # Example
//!
//! Ping a host once:
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! # use std::net::IpAddr;
//! # use std::str::FromStr;
//! use netdiag_core::{IcmpProbe, ProbeDelegate, ProbeRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let target = IpAddr::from_str("192.0.2.1")?;
//! let probe = IcmpProbe::default();
//! let reply = probe
//!     .probe(&ProbeRequest::ping(target), &CancellationToken::new())
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! Trace the route to a host and print hops as they settle:
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! # use std::net::IpAddr;
//! # use std::str::FromStr;
//! use netdiag_core::{Builder, IcmpProbe};
//!
//! let target = IpAddr::from_str("192.0.2.1")?;
//! let report = Builder::new(target, IcmpProbe::default())
//!     .build()?
//!     .run_with(|hop| println!("{hop}"))
//!     .await?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```
#![warn(clippy::all, clippy::pedantic, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![deny(unsafe_code)]

mod builder;
mod config;
mod delegate;
mod error;
mod net;
mod probe;
mod resolve;
mod retry;
mod trace;
mod types;

pub use builder::Builder;
pub use config::{defaults, HeaderMode, ProbeConfig, ProbeStrategy, TraceConfig};
pub use error::{Error, IoError, IoOperation, Result};
pub use probe::{IpStatus, Payload, ProbeReply, ProbeRequest, ProbeStatus};
pub use resolve::ResolveHost;
pub use retry::Retrier;
pub use trace::{HopRecord, TraceOutcome, TraceReport, Tracer};
pub use types::{
    MaxHops, PacketSize, PayloadPattern, ProbeId, RetryTimes, Sequence, TimeToLive,
};

pub use delegate::ProbeDelegate;

#[cfg(unix)]
pub use delegate::{IcmpProbe, UdpProbe};
