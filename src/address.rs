//! Logical (MAC) and physical (PHY) link-layer addresses.

use core::fmt;

use postcard::experimental::max_size::MaxSize;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};

/// Node identity at layer 2. `0` is reserved for broadcast.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize, MaxSize,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(u8);

/// Physical channel suffix used by the radio. `0` is the broadcast pipe.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize, MaxSize,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhyAddress(u8);

/// Uniform draw from `[1, 255]`.
fn draw_unicast<G: RngCore>(rng: &mut G) -> u8 {
    (rng.next_u32() % 255) as u8 + 1
}

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress(0);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Pick a node address, never the broadcast one.
    pub fn random<G: RngCore>(rng: &mut G) -> Self {
        Self(draw_unicast(rng))
    }

    pub const fn into_bits(self) -> u8 {
        self.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

impl PhyAddress {
    pub const BROADCAST: PhyAddress = PhyAddress(0);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn random<G: RngCore>(rng: &mut G) -> Self {
        Self(draw_unicast(rng))
    }

    pub const fn into_bits(self) -> u8 {
        self.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

impl From<u8> for MacAddress {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<MacAddress> for u8 {
    fn from(value: MacAddress) -> Self {
        value.0
    }
}

impl From<u8> for PhyAddress {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<PhyAddress> for u8 {
    fn from(value: PhyAddress) -> Self {
        value.0
    }
}

/// Direct addressing: a MAC doubles as the pipe suffix of a node's shared no-ack pipe.
impl From<MacAddress> for PhyAddress {
    fn from(value: MacAddress) -> Self {
        Self(value.0)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mac:{}", self.0)
    }
}

impl fmt::Display for PhyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phy:{}", self.0)
    }
}
