use bitfields::bitfield;

use crate::address::{MacAddress, PhyAddress};

/// Hardware payload size of the transceiver.
pub const RADIO_FRAME_LEN: usize = 32;

const HEADER_LEN: usize = 2;

/// Fixed upper bytes shared by every pipe of the mesh.
const PIPE_PREFIX: u16 = 0xD2D2;

/// Largest layer 3 payload carried by a single radio frame.
pub const RADIO_MAX_PAYLOAD: usize = RADIO_FRAME_LEN - HEADER_LEN;

#[bitfield(u64)]
struct PipeAddressBits {
    #[bits(8)]
    phy: u8,
    #[bits(16)]
    network_id: u16,
    #[bits(16)]
    prefix: u16,
    #[bits(16)]
    padding: u16,
    #[bits(8)]
    reserved: u8,
}

/// Native pipe address of the transceiver.
///
/// Least significant byte first: PHY suffix, network id (2 bytes), fixed prefix `D2 D2 00 00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeAddress(u64);

impl PipeAddress {
    pub fn new(network_id: u16, phy: PhyAddress) -> Self {
        let bits = PipeAddressBitsBuilder::new()
            .with_phy(phy.into_bits())
            .with_network_id(network_id)
            .with_prefix(PIPE_PREFIX)
            .with_padding(0)
            .with_reserved(0)
            .build();
        Self(bits.into_bits())
    }

    pub fn broadcast(network_id: u16) -> Self {
        Self::new(network_id, PhyAddress::BROADCAST)
    }

    pub fn phy(self) -> PhyAddress {
        PhyAddress::new(PipeAddressBits::from_bits(self.0).phy())
    }

    pub fn network_id(self) -> u16 {
        PipeAddressBits::from_bits(self.0).network_id()
    }

    pub const fn into_bits(self) -> u64 {
        self.0
    }

    /// Bytes in the order the transceiver shifts them out.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

/// Radio frame: `src_mac | reply_phy | payload`.
///
/// `reply_phy` is the pipe the receiver should use to answer. It equals `src_mac` when the
/// sender has no dedicated pipe for the receiver.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioFrame<'a> {
    pub src: MacAddress,
    pub reply: PhyAddress,
    pub payload: &'a [u8],
}

impl<'a> RadioFrame<'a> {
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        match bytes {
            [src, reply, payload @ ..] => Some(Self {
                src: MacAddress::new(*src),
                reply: PhyAddress::new(*reply),
                payload,
            }),
            _ => None,
        }
    }

    /// Write the frame into `buf`, returning the number of bytes used.
    pub fn write_to(&self, buf: &mut [u8; RADIO_FRAME_LEN]) -> Option<usize> {
        let len = HEADER_LEN + self.payload.len();
        if len > RADIO_FRAME_LEN {
            return None;
        }

        buf[0] = self.src.into_bits();
        buf[1] = self.reply.into_bits();
        buf[HEADER_LEN..len].copy_from_slice(self.payload);
        Some(len)
    }

    /// The sender advertised a pipe other than its own MAC.
    pub fn has_dedicated_reply(&self) -> bool {
        self.src.into_bits() != self.reply.into_bits()
    }
}
