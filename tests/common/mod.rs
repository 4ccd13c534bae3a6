#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;

use embassy_sync::{
    blocking_mutex::raw::NoopRawMutex,
    pipe::{Pipe, Reader, Writer},
};
use meshlink::radio::{PipeAddress, Transceiver};
use meshlink::{Interface, Layer3, MacAddress};

pub const NETWORK_ID: u16 = 0x1234;

const PIPE_LENGTH: usize = 256;

/// Hands out a fixed sequence of draws; `MacAddress::random` and `PhyAddress::random` yield
/// exactly these values. The last one repeats forever.
pub struct ScriptedRng {
    draws: Vec<u8>,
    next: usize,
}

impl ScriptedRng {
    pub fn new(draws: &[u8]) -> Self {
        assert!(draws.iter().all(|draw| *draw != 0));
        Self {
            draws: draws.to_vec(),
            next: 0,
        }
    }
}

impl rand_core::RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        let index = self.next.min(self.draws.len() - 1);
        self.next += 1;
        self.draws[index] as u32 - 1
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub frames: Vec<(Vec<u8>, Interface, MacAddress)>,
}

impl Layer3 for Recorder {
    fn deliver(&mut self, payload: &[u8], interface: Interface, source: MacAddress) {
        self.frames.push((payload.to_vec(), interface, source));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open(u8, PipeAddress),
    StartListening,
    StopListening,
    Write {
        address: PipeAddress,
        frame: Vec<u8>,
        ack: bool,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockRadioError;

/// Records every call and serves frames queued in `inbox`.
#[derive(Debug, Default)]
pub struct MockRadio {
    pub ops: Vec<Op>,
    pub inbox: VecDeque<Vec<u8>>,
    pub fail_writes: bool,
    /// Reject the next attempt to open this pipe index.
    pub fail_open: Option<u8>,
}

impl MockRadio {
    pub fn writes(&self) -> Vec<&Op> {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Write { .. }))
            .collect()
    }

    pub fn opened(&self) -> Vec<(u8, PipeAddress)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Open(index, address) => Some((*index, *address)),
                _ => None,
            })
            .collect()
    }
}

impl Transceiver for MockRadio {
    type Error = MockRadioError;

    async fn open_reading_pipe(
        &mut self,
        index: u8,
        address: PipeAddress,
    ) -> Result<(), Self::Error> {
        if self.fail_open == Some(index) {
            self.fail_open = None;
            return Err(MockRadioError);
        }
        self.ops.push(Op::Open(index, address));
        Ok(())
    }

    async fn start_listening(&mut self) -> Result<(), Self::Error> {
        self.ops.push(Op::StartListening);
        Ok(())
    }

    async fn stop_listening(&mut self) -> Result<(), Self::Error> {
        self.ops.push(Op::StopListening);
        Ok(())
    }

    async fn available(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.inbox.is_empty())
    }

    async fn read(&mut self, frame: &mut [u8]) -> Result<usize, Self::Error> {
        let received = self.inbox.pop_front().ok_or(MockRadioError)?;
        frame[..received.len()].copy_from_slice(&received);
        Ok(received.len())
    }

    async fn write(
        &mut self,
        address: PipeAddress,
        frame: &[u8],
        ack: bool,
    ) -> Result<(), Self::Error> {
        self.ops.push(Op::Write {
            address,
            frame: frame.to_vec(),
            ack,
        });
        if self.fail_writes {
            Err(MockRadioError)
        } else {
            Ok(())
        }
    }
}

/// Two byte streams cross-connected, like a UART between two nodes.
pub struct MockBus {
    a_to_b: Pipe<NoopRawMutex, PIPE_LENGTH>,
    b_to_a: Pipe<NoopRawMutex, PIPE_LENGTH>,
}

pub struct MockBusSide<'a> {
    pub rx: Reader<'a, NoopRawMutex, PIPE_LENGTH>,
    pub tx: Writer<'a, NoopRawMutex, PIPE_LENGTH>,
}

impl embedded_io_async::ErrorType for MockBusSide<'_> {
    type Error = Infallible;
}

impl embedded_io_async::Read for MockBusSide<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.rx.read(buf).await)
    }
}

impl embedded_io_async::Write for MockBusSide<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.tx.write(buf).await)
    }
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            a_to_b: Pipe::new(),
            b_to_a: Pipe::new(),
        }
    }

    pub fn split(&mut self) -> (MockBusSide<'_>, MockBusSide<'_>) {
        let (b_rx, a_tx) = self.a_to_b.split();
        let (a_rx, b_tx) = self.b_to_a.split();

        let a = MockBusSide { rx: a_rx, tx: a_tx };
        let b = MockBusSide { rx: b_rx, tx: b_tx };
        (a, b)
    }
}

pub fn pipe(phy: u8) -> PipeAddress {
    PipeAddress::new(NETWORK_ID, meshlink::PhyAddress::new(phy))
}
