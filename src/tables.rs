//! Bounded MAC to PHY tables used by the radio link.
//!
//! Tables are append-only: entries are never evicted or overwritten, and inserts past capacity
//! are silently ignored. A full table only costs efficiency, the caller always has a fallback.

use crate::address::{MacAddress, PhyAddress};

/// Suggested capacity of the learned destination cache.
pub const DESTINATION_CACHE_LEN: usize = 10;

/// Dedicated receive pipes available for peers: six hardware pipes minus broadcast and self.
pub const REPLY_PIPES_LEN: usize = 4;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerMapping {
    pub mac: MacAddress,
    pub phy: PhyAddress,
}

/// Which column of a table a raw byte is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    Mac,
    Phy,
}

/// Fixed arena of `N` mappings plus a fill count.
pub struct PeerTable<const N: usize> {
    entries: [PeerMapping; N],
    len: usize,
}

impl<const N: usize> PeerTable<N> {
    pub const fn new() -> Self {
        Self {
            entries: [PeerMapping {
                mac: MacAddress::BROADCAST,
                phy: PhyAddress::BROADCAST,
            }; N],
            len: 0,
        }
    }

    fn as_slice(&self) -> &[PeerMapping] {
        &self.entries[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerMapping> {
        self.as_slice().iter()
    }

    pub fn lookup(&self, mac: MacAddress) -> Option<PhyAddress> {
        self.iter().find(|entry| entry.mac == mac).map(|entry| entry.phy)
    }

    /// Record `mac -> phy`.
    ///
    /// Returns `false` only when `mac` is unknown and the table is full; the insert is then a
    /// no-op. A known `mac` keeps its original binding and counts as success.
    pub fn try_insert(&mut self, mac: MacAddress, phy: PhyAddress) -> bool {
        if self.lookup(mac).is_some() {
            return true;
        }

        if self.is_full() {
            return false;
        }

        self.entries[self.len] = PeerMapping { mac, phy };
        self.len += 1;
        true
    }

    pub fn contains(&self, value: u8, role: Role) -> bool {
        self.iter().any(|entry| match role {
            Role::Mac => entry.mac.into_bits() == value,
            Role::Phy => entry.phy.into_bits() == value,
        })
    }

    /// Whether `value` is used in either column.
    pub fn contains_any(&self, value: u8) -> bool {
        self.contains(value, Role::Mac) || self.contains(value, Role::Phy)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for PeerTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
