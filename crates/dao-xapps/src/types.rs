// XApp Endorsement Engine
// Identifier and level primitives shared by every component
//
// INVARIANTS:
// 1. AppId is the Keccak-256 digest of the app name and never changes
// 2. Address and AppId render as lowercase 0x-prefixed hex
// 3. SecurityLevel conversion from raw integers is checked

use serde::{Serialize, Deserialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a node in the external Node Ledger
pub type NodeId = u64;

/// Strength level of a node, as reported by the Node Ledger
pub type NodeLevel = u8;

/// Voting round identifier from the Round Clock
pub type RoundId = u64;

/// Height in the Round Clock's native unit (blocks)
pub type Height = u64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("Missing 0x prefix")]
    MissingPrefix,

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseIdError> {
    let digits = s.strip_prefix("0x").ok_or(ParseIdError::MissingPrefix)?;
    let bytes = hex::decode(digits).map_err(|e| ParseIdError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(ParseIdError::InvalidLength { expected: N, actual: bytes.len() });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// 32-byte application identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AppId(pub [u8; 32]);

impl AppId {
    /// Derive the identifier of an app from its registered name
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();

        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        AppId(out)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First four bytes are enough to tell apps apart in logs
        write!(f, "AppId(0x{}..)", hex::encode(&self.0[..4]))
    }
}

impl FromStr for AppId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed::<32>(s).map(AppId)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for AppId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Address with every byte set to `byte`, handy for fixtures
    pub fn repeat_byte(byte: u8) -> Self {
        Address([byte; 20])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed::<20>(s).map(Address)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// App security tier held by the external Security Notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SecurityLevel {
    /// Floor value, app has no standing
    None = 0,

    /// Default tier granted on first endorsement
    Low = 1,

    Medium = 2,

    High = 3,
}

impl SecurityLevel {
    /// Lenient conversion for values read back from the notifier.
    /// Anything out of range is treated as the floor.
    pub fn from_raw(raw: u8) -> Self {
        SecurityLevel::try_from(raw).unwrap_or(SecurityLevel::None)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(SecurityLevel::None),
            1 => Ok(SecurityLevel::Low),
            2 => Ok(SecurityLevel::Medium),
            3 => Ok(SecurityLevel::High),
            other => Err(other),
        }
    }
}
