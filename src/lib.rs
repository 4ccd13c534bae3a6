//! Link layer of a small mesh network for battery-powered nodes.
//!
//! Maps 1-byte logical addresses (`0` is broadcast) onto two transports:
//! * [`radio`]: a packet radio with a few hardware-filtered receive pipes. The link learns which
//!   pipe reaches which peer from inbound traffic and hands out dedicated reply pipes so that
//!   peers can use hardware acknowledgement.
//! * [`serial`]: a byte stream (UART, RS-485) with byte-stuffed, CRC-protected frames.
//!
//! Delivery is best effort. Nothing is persisted: tables and addresses are rebuilt after every
//! start. Address collisions are tolerated here and resolved by upper layers, which can ask for
//! a fresh address through [`layer2::Layer2::reassign_addresses`].
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod address;
pub mod error;
pub mod layer2;
pub mod radio;
pub mod serial;
pub mod tables;

pub use address::{MacAddress, PhyAddress};
pub use error::{EncodeError, Error};
pub use layer2::{Interface, Layer2, Layer3};
