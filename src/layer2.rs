//! Fan-in/fan-out between the link engines and layer 3.

use embedded_io_async::{Read, Write};
use rand_core::RngCore;

use crate::address::MacAddress;
use crate::error::Error;
use crate::radio::{RadioLink, Transceiver};
use crate::serial::SerialLink;

/// Which link a frame came in on or should go out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interface {
    Radio = 0,
    Serial = 1,
}

impl From<Interface> for u8 {
    fn from(value: Interface) -> Self {
        value as u8
    }
}

/// Receiver of decoded payloads. Invoked synchronously from the receive paths.
pub trait Layer3 {
    fn deliver(&mut self, payload: &[u8], interface: Interface, source: MacAddress);
}

impl<F: FnMut(&[u8], Interface, MacAddress)> Layer3 for F {
    fn deliver(&mut self, payload: &[u8], interface: Interface, source: MacAddress) {
        self(payload, interface, source)
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError<R, S> {
    Radio(Error<R>),
    Serial(Error<S>),
}

/// Both links of a node.
pub struct Layer2<R: Transceiver, S: Read + Write, G: RngCore> {
    pub radio: RadioLink<R, G>,
    pub serial: SerialLink<S, G>,
}

impl<R: Transceiver, S: Read + Write, G: RngCore> Layer2<R, S, G> {
    pub fn new(radio: RadioLink<R, G>, serial: SerialLink<S, G>) -> Self {
        Self { radio, serial }
    }

    pub async fn send_via_radio(
        &mut self,
        payload: &[u8],
        dest: MacAddress,
    ) -> Result<(), Error<R::Error>> {
        self.radio.send(payload, dest).await
    }

    pub async fn send_via_serial(
        &mut self,
        payload: &[u8],
        dest: MacAddress,
    ) -> Result<(), Error<S::Error>> {
        self.serial.send(payload, dest).await
    }

    pub async fn send(
        &mut self,
        interface: Interface,
        payload: &[u8],
        dest: MacAddress,
    ) -> Result<(), SendError<R::Error, S::Error>> {
        match interface {
            Interface::Radio => self
                .send_via_radio(payload, dest)
                .await
                .map_err(SendError::Radio),
            Interface::Serial => self
                .send_via_serial(payload, dest)
                .await
                .map_err(SendError::Serial),
        }
    }

    pub fn address(&self, interface: Interface) -> MacAddress {
        match interface {
            Interface::Radio => self.radio.address(),
            Interface::Serial => self.serial.address(),
        }
    }

    pub async fn poll_radio<L: Layer3>(&mut self, layer3: &mut L) -> Result<usize, Error<R::Error>> {
        self.radio.receive(layer3).await
    }

    pub async fn poll_serial<L: Layer3>(
        &mut self,
        layer3: &mut L,
    ) -> Result<usize, Error<S::Error>> {
        self.serial.receive(layer3).await
    }

    /// Re-draw the address of both links and drop all learned state.
    ///
    /// A [`crate::serial::SharedDecoder`] fed from an interrupt is not owned here and needs its
    /// own [`crate::serial::SharedDecoder::reassign_address`].
    pub async fn reassign_addresses(&mut self) -> Result<(), Error<R::Error>> {
        self.serial.reassign_address();
        self.radio.reassign_address().await
    }
}
