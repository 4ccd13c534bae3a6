//! Layer 2 over a UART or RS-485 bus.
//!
//! Wire format, every byte after the preamble byte-stuffed:
//!
//! ```text
//! 0x7E | len | src | dest | payload (len bytes) | crc hi | crc lo
//! ```
//!
//! The CRC is CRC-16/XMODEM over `len | src | dest | payload`. A byte equal to the preamble
//! (`0x7E`) or the escape (`0x7D`) is sent as `0x7D, byte ^ 0x20`, so a raw preamble on the line
//! always marks the start of a frame. Corrupted frames and frames for other nodes are dropped;
//! collisions on a multidrop bus simply cost the frames involved.

mod decoder;
mod encoder;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{Mutex, raw::RawMutex};
use embedded_io_async::{Read, Write};
use rand_core::RngCore;

pub use decoder::{Decoder, DecoderStats, SerialFrame, State};
pub use encoder::encode;

use crate::address::MacAddress;
use crate::error::{EncodeError, Error};
use crate::layer2::{Interface, Layer3};

const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);

pub const PREAMBLE: u8 = 0x7E;
pub const ESCAPE: u8 = 0x7D;
pub const ESCAPE_MASK: u8 = 0x20;

/// Longest frame, from `len` to the last CRC byte, before stuffing.
pub const MAX_FRAME_LEN: usize = 40;

const HEADER_LEN: usize = 3;
const CRC_LEN: usize = 2;

/// Largest layer 3 payload carried by a single serial frame.
pub const SERIAL_MAX_PAYLOAD: usize = MAX_FRAME_LEN - HEADER_LEN - CRC_LEN;

/// Header plus payload, the part of a frame the decoder buffers.
const RECORD_LEN: usize = HEADER_LEN + SERIAL_MAX_PAYLOAD;

/// Worst case on the wire: preamble plus every other byte escaped.
pub const MAX_ENCODED_LEN: usize = 1 + 2 * MAX_FRAME_LEN;

/// Bytes pulled from the stream per [`SerialLink::receive`] call.
const READ_CHUNK: usize = 32;

pub struct SerialLink<T: Read + Write, G: RngCore> {
    inner: T,
    rng: G,
    decoder: Decoder,
}

impl<T: Read + Write, G: RngCore> SerialLink<T, G> {
    pub fn new(inner: T, mut rng: G) -> Self {
        let address = MacAddress::random(&mut rng);
        info!("Serial link address {}", address);

        Self {
            inner,
            rng,
            decoder: Decoder::new(address),
        }
    }

    pub fn address(&self) -> MacAddress {
        self.decoder.address()
    }

    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    pub fn stream_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Draw a new address, abandoning any frame being received.
    pub fn reassign_address(&mut self) {
        let address = MacAddress::random(&mut self.rng);
        self.decoder.reset(address);
        info!("Serial link reassigned to {}", address);
    }

    pub async fn send(&mut self, payload: &[u8], dest: MacAddress) -> Result<(), Error<T::Error>> {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let size = encode(self.address(), dest, payload, &mut buf)?;

        trace!("Serial sending {} bytes to {}", size, dest);

        self.inner
            .write_all(&buf[..size])
            .await
            .map_err(Error::Inner)
    }

    /// Feed a single byte, for reception driven from an interrupt handler.
    pub fn on_byte_received<L: Layer3>(&mut self, byte: u8, layer3: &mut L) -> bool {
        deliver(&mut self.decoder, byte, layer3)
    }

    /// Read whatever the stream has and decode it. Returns the number of frames delivered.
    pub async fn receive<L: Layer3>(&mut self, layer3: &mut L) -> Result<usize, Error<T::Error>> {
        let mut buf = [0u8; READ_CHUNK];
        let size = self.inner.read(&mut buf).await.map_err(Error::Inner)?;

        Ok(buf[..size]
            .iter()
            .filter(|byte| deliver(&mut self.decoder, **byte, layer3))
            .count())
    }
}

fn deliver<L: Layer3>(decoder: &mut Decoder, byte: u8, layer3: &mut L) -> bool {
    match decoder.feed(byte) {
        Some(frame) => {
            layer3.deliver(frame.payload, Interface::Serial, frame.src);
            true
        }
        None => false,
    }
}

/// A [`Decoder`] that can be fed from an interrupt handler while the main loop also touches it.
///
/// Every access runs inside the mutex, so with a `CriticalSectionRawMutex` the receive interrupt
/// is masked for the duration of each mutation.
///
/// The decoder owns the node's serial address: frames for transmission are built with
/// [`SharedDecoder::encode`] so the source always matches the filter. It lives outside any
/// [`SerialLink`], so [`crate::Layer2::reassign_addresses`] does not reach it; call
/// [`SharedDecoder::reassign_address`] alongside it.
pub struct SharedDecoder<M: RawMutex> {
    inner: Mutex<M, RefCell<Decoder>>,
}

impl<M: RawMutex> SharedDecoder<M> {
    pub const fn new(address: MacAddress) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Decoder::new(address))),
        }
    }

    pub fn on_byte_received<L: Layer3>(&self, byte: u8, layer3: &mut L) -> bool {
        self.inner
            .lock(|decoder| deliver(&mut decoder.borrow_mut(), byte, layer3))
    }

    pub fn address(&self) -> MacAddress {
        self.inner.lock(|decoder| decoder.borrow().address())
    }

    pub fn stats(&self) -> DecoderStats {
        self.inner.lock(|decoder| decoder.borrow().stats())
    }

    pub fn reset(&self, address: MacAddress) {
        self.inner.lock(|decoder| decoder.borrow_mut().reset(address))
    }

    /// Draw a new address, abandoning any frame being received.
    pub fn reassign_address<G: RngCore>(&self, rng: &mut G) -> MacAddress {
        let address = MacAddress::random(rng);
        self.reset(address);
        info!("Shared serial decoder reassigned to {}", address);
        address
    }

    /// Encode a frame from the current address to `dest` into `out`.
    pub fn encode(
        &self,
        dest: MacAddress,
        payload: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EncodeError> {
        self.inner
            .lock(|decoder| encode(decoder.borrow().address(), dest, payload, out))
    }
}
