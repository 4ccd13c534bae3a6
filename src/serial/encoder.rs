use crate::address::MacAddress;
use crate::error::EncodeError;

use super::{CRC, ESCAPE, ESCAPE_MASK, HEADER_LEN, PREAMBLE, SERIAL_MAX_PAYLOAD};

/// Appends bytes to `out`, escaping the ones that collide with control bytes.
struct Stuffer<'a> {
    out: &'a mut [u8],
    len: usize,
}

impl Stuffer<'_> {
    fn put(&mut self, byte: u8) -> Result<(), EncodeError> {
        let slot = self.out.get_mut(self.len).ok_or(EncodeError::BufferTooSmall)?;
        *slot = byte;
        self.len += 1;
        Ok(())
    }

    fn push(&mut self, byte: u8) -> Result<(), EncodeError> {
        if byte == PREAMBLE || byte == ESCAPE {
            self.put(ESCAPE)?;
            self.put(byte ^ ESCAPE_MASK)
        } else {
            self.put(byte)
        }
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        bytes.iter().try_for_each(|byte| self.push(*byte))
    }
}

/// Frame `payload` from `src` to `dest` into `out`, returning the number of bytes written.
///
/// [`super::MAX_ENCODED_LEN`] bytes are always enough.
pub fn encode(
    src: MacAddress,
    dest: MacAddress,
    payload: &[u8],
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    if payload.len() > SERIAL_MAX_PAYLOAD {
        return Err(EncodeError::PayloadTooLarge);
    }

    let header: [u8; HEADER_LEN] = [payload.len() as u8, src.into_bits(), dest.into_bits()];

    let mut digest = CRC.digest();
    digest.update(&header);
    digest.update(payload);
    let crc = digest.finalize();

    let mut stuffer = Stuffer { out, len: 0 };
    stuffer.put(PREAMBLE)?;
    stuffer.extend(&header)?;
    stuffer.extend(payload)?;
    stuffer.extend(&crc.to_be_bytes())?;

    Ok(stuffer.len)
}
