//! Layer 2 over a packet radio with a handful of hardware-filtered receive pipes.
//!
//! Every node listens on the broadcast pipe and on a shared pipe named after its own MAC. Frames
//! sent to that shared pipe cannot be acknowledged by hardware, since several peers may be
//! addressing the node there. To get acknowledged traffic, a node hands each peer a dedicated
//! pipe (its "reply pipe") in the `reply_phy` field of the frames it sends to that peer. The
//! receiving side remembers the advertised pipe in its destination cache and uses it, with
//! hardware acknowledgement, for all later traffic to the sender.

mod frame;

pub use frame::{PipeAddress, RADIO_FRAME_LEN, RADIO_MAX_PAYLOAD, RadioFrame};

use rand_core::RngCore;

use crate::address::{MacAddress, PhyAddress};
use crate::error::Error;
use crate::layer2::{Interface, Layer3};
use crate::tables::{DESTINATION_CACHE_LEN, PeerTable, REPLY_PIPES_LEN};

const BROADCAST_PIPE: u8 = 0;
const SELF_PIPE: u8 = 1;

/// Number of hardware receive pipes of the transceiver.
pub const PIPE_COUNT: usize = 6;

/// Random draws before giving up on finding an unused PHY.
const ALLOCATION_ATTEMPTS: usize = 255;

/// Packet radio driver consumed by [`RadioLink`].
#[allow(async_fn_in_trait)]
pub trait Transceiver {
    type Error;

    /// Bind receive pipe `index` (0 to 5) to `address`.
    async fn open_reading_pipe(&mut self, index: u8, address: PipeAddress)
    -> Result<(), Self::Error>;

    async fn start_listening(&mut self) -> Result<(), Self::Error>;

    async fn stop_listening(&mut self) -> Result<(), Self::Error>;

    /// Whether a received frame is waiting. Must not block.
    async fn available(&mut self) -> Result<bool, Self::Error>;

    /// Pop the next received frame into `frame`, returning its length.
    async fn read(&mut self, frame: &mut [u8]) -> Result<usize, Self::Error>;

    /// Transmit `frame` to `address`, asking for a hardware acknowledgement if `ack` is set.
    async fn write(
        &mut self,
        address: PipeAddress,
        frame: &[u8],
        ack: bool,
    ) -> Result<(), Self::Error>;
}

pub struct RadioLink<
    T: Transceiver,
    G: RngCore,
    const DESTINATIONS: usize = DESTINATION_CACHE_LEN,
    const REPLY_PIPES: usize = REPLY_PIPES_LEN,
> {
    radio: T,
    rng: G,
    network_id: u16,
    address: MacAddress,
    /// Learned: to reach MAC X, send to PHY Y.
    destinations: PeerTable<DESTINATIONS>,
    /// Handed out: peer MAC X talks to me on my pipe Y.
    reply_pipes: PeerTable<REPLY_PIPES>,
}

impl<T: Transceiver, G: RngCore, const DESTINATIONS: usize, const REPLY_PIPES: usize>
    RadioLink<T, G, DESTINATIONS, REPLY_PIPES>
{
    /// Draw a provisional address. Call [`RadioLink::begin`] before using the link.
    pub fn new(radio: T, mut rng: G, network_id: u16) -> Self {
        const { core::assert!(REPLY_PIPES <= PIPE_COUNT - 2) }

        let address = MacAddress::random(&mut rng);
        info!("Radio link address {}", address);

        Self {
            radio,
            rng,
            network_id,
            address,
            destinations: PeerTable::new(),
            reply_pipes: PeerTable::new(),
        }
    }

    pub fn address(&self) -> MacAddress {
        self.address
    }

    pub fn network_id(&self) -> u16 {
        self.network_id
    }

    pub fn destinations(&self) -> &PeerTable<DESTINATIONS> {
        &self.destinations
    }

    pub fn reply_pipes(&self) -> &PeerTable<REPLY_PIPES> {
        &self.reply_pipes
    }

    pub fn transceiver(&self) -> &T {
        &self.radio
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.radio
    }

    fn pipe_address(&self, phy: PhyAddress) -> PipeAddress {
        PipeAddress::new(self.network_id, phy)
    }

    /// Open the shared no-ack pipe and start listening.
    pub async fn begin(&mut self) -> Result<(), Error<T::Error>> {
        let self_pipe = self.pipe_address(self.address.into());
        self.radio
            .open_reading_pipe(SELF_PIPE, self_pipe)
            .await
            .map_err(Error::Inner)?;
        debug!("Opened no-ack pipe for {}", self.address);

        self.listen().await
    }

    /// Resume reception. Pipe 0 is reused for acknowledgements while transmitting, so the
    /// broadcast binding is restored every time.
    async fn listen(&mut self) -> Result<(), Error<T::Error>> {
        let broadcast = PipeAddress::broadcast(self.network_id);
        self.radio
            .open_reading_pipe(BROADCAST_PIPE, broadcast)
            .await
            .map_err(Error::Inner)?;
        self.radio.start_listening().await.map_err(Error::Inner)
    }

    /// Draw a new address and forget everything learned under the old one.
    ///
    /// Layer 4 calls this when it suspects another node uses the same address.
    pub async fn reassign_address(&mut self) -> Result<(), Error<T::Error>> {
        self.address = MacAddress::random(&mut self.rng);
        self.destinations.clear();
        self.reply_pipes.clear();
        info!("Radio link reassigned to {}", self.address);

        self.begin().await
    }

    /// Pick a PHY used nowhere in either table and distinct from our own address.
    fn allocate_phy(&mut self) -> Option<PhyAddress> {
        for _ in 0..ALLOCATION_ATTEMPTS {
            let candidate = PhyAddress::random(&mut self.rng);
            let value = candidate.into_bits();

            if value == self.address.into_bits()
                || self.destinations.contains_any(value)
                || self.reply_pipes.contains_any(value)
            {
                continue;
            }

            return Some(candidate);
        }

        None
    }

    /// The pipe we advertise to `dest`, allocating a dedicated one when possible.
    async fn reply_pipe_for(&mut self, dest: MacAddress) -> Result<PhyAddress, Error<T::Error>> {
        if let Some(phy) = self.reply_pipes.lookup(dest) {
            return Ok(phy);
        }

        if self.reply_pipes.is_full() {
            trace!("No reply pipe left for {}", dest);
            return Ok(self.address.into());
        }

        let Some(phy) = self.allocate_phy() else {
            warn!("No unused PHY left for {}", dest);
            return Ok(self.address.into());
        };

        // Pipes 0 and 1 are taken; the table only records pipes that actually opened.
        let index = (self.reply_pipes.len() + 2) as u8;
        let address = self.pipe_address(phy);
        self.radio
            .open_reading_pipe(index, address)
            .await
            .map_err(Error::Inner)?;
        self.reply_pipes.try_insert(dest, phy);
        debug!("Reply pipe {} for {} on {}", index, dest, phy);

        Ok(phy)
    }

    /// Send `payload` to `dest`, or to every node in range if `dest` is broadcast.
    pub async fn send(&mut self, payload: &[u8], dest: MacAddress) -> Result<(), Error<T::Error>> {
        if payload.len() > RADIO_MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge);
        }

        let (phy, ack, reply) = if dest.is_broadcast() {
            (PhyAddress::BROADCAST, false, self.address.into())
        } else {
            let (phy, ack) = match self.destinations.lookup(dest) {
                Some(phy) => (phy, true),
                // Best effort on the peer's shared pipe, which cannot acknowledge.
                None => (dest.into(), false),
            };
            (phy, ack, self.reply_pipe_for(dest).await?)
        };

        let frame = RadioFrame {
            src: self.address,
            reply,
            payload,
        };
        let mut buf = [0u8; RADIO_FRAME_LEN];
        let len = frame.write_to(&mut buf).ok_or(Error::PayloadTooLarge)?;

        trace!("Radio sending {} bytes to {} (ack {})", len, phy, ack);

        let address = self.pipe_address(phy);
        self.radio.stop_listening().await.map_err(Error::Inner)?;
        let result = self
            .radio
            .write(address, &buf[..len], ack)
            .await
            .map_err(Error::Inner);
        self.listen().await?;

        result
    }

    /// Learn from an inbound frame and hand its payload to layer 3.
    pub fn on_frame<L: Layer3>(&mut self, bytes: &[u8], layer3: &mut L) -> bool {
        let Some(frame) = RadioFrame::parse(bytes) else {
            warn!("Dropped radio frame of {} bytes", bytes.len());
            return false;
        };

        if frame.has_dedicated_reply() && self.destinations.lookup(frame.src).is_none() {
            if self.destinations.try_insert(frame.src, frame.reply) {
                debug!("Learned {} via {}", frame.src, frame.reply);
            } else {
                trace!("Destination cache full, not learning {}", frame.src);
            }
        }

        layer3.deliver(frame.payload, Interface::Radio, frame.src);
        true
    }

    /// Drain every frame the transceiver has buffered. Returns the number delivered.
    pub async fn receive<L: Layer3>(&mut self, layer3: &mut L) -> Result<usize, Error<T::Error>> {
        let mut delivered = 0;
        let mut buf = [0u8; RADIO_FRAME_LEN];

        while self.radio.available().await.map_err(Error::Inner)? {
            let len = self.radio.read(&mut buf).await.map_err(Error::Inner)?;
            let len = len.min(RADIO_FRAME_LEN);
            if self.on_frame(&buf[..len], layer3) {
                delivered += 1;
            }
        }

        Ok(delivered)
    }
}
