//! System DNS helpers for netdiag.
//!
//! Provides the address-resolution collaborator the probe engine consumes:
//! a reverse lookup `resolve_name(address) -> Option<name>` and a forward
//! lookup `resolve_address(hostname) -> Option<address>`, both backed by
//! the system resolver and bounded by a configurable timeout. Failures and
//! timeouts never escape as errors, they only cost the answer.
//!
//! # Example
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! use netdiag_dns::{Config, DnsResolver};
//!
//! let resolver = DnsResolver::new(Config::default());
//! if let Some(addr) = resolver.resolve_address("example.com").await {
//!     println!("{addr} is {:?}", resolver.resolve_name(addr).await);
//! }
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod config;
mod resolver;

pub use config::{defaults, Config};
pub use resolver::DnsResolver;
