use derive_more::{Add, AddAssign};

/// `TimeToLive` (ttl) newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Add, AddAssign)]
pub struct TimeToLive(pub u8);

/// `Sequence` number newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Add, AddAssign)]
pub struct Sequence(pub u16);

/// `ProbeId` newtype.
///
/// The echo identifier tag fixed per dispatcher instance; replies carrying a
/// different identifier are never matched against a pending probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct ProbeId(pub u16);

/// `PacketSize` newtype.
///
/// The probe payload size in bytes, excluding the 8-byte ICMP header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct PacketSize(pub u16);

/// `PayloadPattern` newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct PayloadPattern(pub u8);

/// `MaxHops` newtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd)]
pub struct MaxHops(pub u8);

/// `RetryTimes` newtype.
///
/// The number of additional attempts after a timed out probe, i.e. at most
/// `retry_times + 1` attempts in total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct RetryTimes(pub u8);
