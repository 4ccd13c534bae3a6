use crate::address::MacAddress;

use super::{CRC, ESCAPE, ESCAPE_MASK, HEADER_LEN, PREAMBLE, RECORD_LEN, SERIAL_MAX_PAYLOAD};

const LEN_OFFSET: usize = 0;
const SRC_OFFSET: usize = 1;
const DEST_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Next logical byte lands at `pos`.
    Collecting { pos: usize },
    /// Ignore everything until the next preamble.
    Dropping,
}

/// Counters for frames the decoder threw away.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderStats {
    pub delivered: u32,
    pub checksum_errors: u32,
    /// Well-formed frames addressed to another node.
    pub dropped_foreign: u32,
    /// Frames declaring a payload longer than a frame can hold.
    pub dropped_malformed: u32,
    /// Frames cut short by a new preamble.
    pub interrupted: u32,
}

/// A frame that passed the address filter and the CRC check.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialFrame<'a> {
    pub src: MacAddress,
    pub dest: MacAddress,
    pub payload: &'a [u8],
}

/// Byte-at-a-time decoder for the serial framing.
///
/// The raw preamble always restarts collection, whatever the decoder was doing. Frames that
/// are malformed, corrupted or addressed to somebody else are dropped without surfacing an
/// error; a new preamble is the only way out of a bad frame.
pub struct Decoder {
    address: MacAddress,
    state: State,
    escape_pending: bool,
    crc_high: u8,
    record: [u8; RECORD_LEN],
    stats: DecoderStats,
}

impl Decoder {
    /// Starts out waiting for a preamble.
    pub const fn new(address: MacAddress) -> Self {
        Self {
            address,
            state: State::Dropping,
            escape_pending: false,
            crc_high: 0,
            record: [0u8; RECORD_LEN],
            stats: DecoderStats {
                delivered: 0,
                checksum_errors: 0,
                dropped_foreign: 0,
                dropped_malformed: 0,
                interrupted: 0,
            },
        }
    }

    pub fn address(&self) -> MacAddress {
        self.address
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Switch to a new address, abandoning any frame in flight.
    pub fn reset(&mut self, address: MacAddress) {
        self.address = address;
        self.state = State::Dropping;
        self.escape_pending = false;
    }

    fn payload_len(&self) -> usize {
        self.record[LEN_OFFSET] as usize
    }

    fn is_for_us(&self) -> bool {
        let dest = MacAddress::new(self.record[DEST_OFFSET]);
        dest == self.address || dest.is_broadcast()
    }

    /// Feed one raw byte from the line. Returns a frame once its CRC byte checks out.
    pub fn feed(&mut self, byte: u8) -> Option<SerialFrame<'_>> {
        match byte {
            PREAMBLE => {
                if let State::Collecting { pos } = self.state {
                    if pos > 0 {
                        trace!("Frame interrupted at {}", pos);
                        self.stats.interrupted = self.stats.interrupted.wrapping_add(1);
                    }
                }
                self.state = State::Collecting { pos: 0 };
                self.escape_pending = false;
                return None;
            }
            ESCAPE => {
                self.escape_pending = true;
                return None;
            }
            _ => {}
        }

        let byte = if core::mem::take(&mut self.escape_pending) {
            byte ^ ESCAPE_MASK
        } else {
            byte
        };

        let State::Collecting { pos } = self.state else {
            return None;
        };

        if pos < HEADER_LEN {
            self.record[pos] = byte;
            self.state = State::Collecting { pos: pos + 1 };
            return None;
        }

        let len = self.payload_len();
        if len > SERIAL_MAX_PAYLOAD {
            debug!("Dropping frame declaring {} bytes", len);
            self.stats.dropped_malformed = self.stats.dropped_malformed.wrapping_add(1);
            self.state = State::Dropping;
            return None;
        }
        if !self.is_for_us() {
            trace!("Dropping frame for mac:{}", self.record[DEST_OFFSET]);
            self.stats.dropped_foreign = self.stats.dropped_foreign.wrapping_add(1);
            self.state = State::Dropping;
            return None;
        }

        if pos == HEADER_LEN + len {
            self.crc_high = byte;
            self.state = State::Collecting { pos: pos + 1 };
            return None;
        }

        if pos == HEADER_LEN + len + 1 {
            // Complete: wait for the next preamble whatever the outcome.
            self.state = State::Dropping;

            let received = u16::from_be_bytes([self.crc_high, byte]);
            let record = &self.record[..HEADER_LEN + len];
            if CRC.checksum(record) != received {
                warn!("Serial frame failed checksum");
                self.stats.checksum_errors = self.stats.checksum_errors.wrapping_add(1);
                return None;
            }

            self.stats.delivered = self.stats.delivered.wrapping_add(1);
            return Some(SerialFrame {
                src: MacAddress::new(record[SRC_OFFSET]),
                dest: MacAddress::new(record[DEST_OFFSET]),
                payload: &record[HEADER_LEN..],
            });
        }

        self.record[pos] = byte;
        self.state = State::Collecting { pos: pos + 1 };
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::{MAX_ENCODED_LEN, encode};

    #[test]
    fn counters_wrap_instead_of_overflowing() {
        let me = MacAddress::new(4);
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let size = encode(MacAddress::new(9), me, b"wrap", &mut buf).unwrap();

        let mut decoder = Decoder::new(me);
        decoder.stats.delivered = u32::MAX;
        decoder.stats.interrupted = u32::MAX;

        decoder.feed(PREAMBLE);
        decoder.feed(1);
        let delivered = buf[..size].iter().filter(|b| decoder.feed(**b).is_some()).count();

        assert_eq!(delivered, 1);
        assert_eq!(decoder.stats().delivered, 0);
        assert_eq!(decoder.stats().interrupted, 0);
    }
}
