/// smoltcp PHY device adapter for the WLAN interface.
///
/// This bridges the gap between the interface glue (which moves `Pbuf`s
/// between the MAC driver and a `Netif`) and smoltcp (which expects a
/// `Device` trait impl). Frames the glue accepts land in an `RxQueue`
/// installed as the netif's input path; frames smoltcp emits go out through
/// the netif's link output.
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec;

use log::{debug, warn};
use smoltcp::phy::{self, Device, DeviceCapabilities, Medium};
use smoltcp::time::Instant;
use spin::Mutex;

use crate::err::{Error, Rejected};
use crate::ethernetif::ETH_HDR_LEN;
use crate::netif::{Netif, NetifInput};
use crate::pbuf::{Pbuf, PbufAllocator, PbufLayer, PbufType};
use crate::stats::{LinkStat, LinkStats};

/// Bounded FIFO of received frames waiting for smoltcp.
pub struct RxQueue {
    frames: Mutex<VecDeque<Pbuf>>,
    capacity: usize,
}

impl RxQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn pop(&self) -> Option<Pbuf> {
        self.frames.lock().pop_front()
    }
}

impl NetifInput for RxQueue {
    fn input(&self, p: Pbuf, _netif: &Netif) -> Result<(), Rejected> {
        let mut frames = self.frames.lock();
        if frames.len() >= self.capacity {
            return Err(Rejected::returned(Error::Buf, p));
        }
        frames.push_back(p);
        Ok(())
    }
}

/// Adapter that implements smoltcp's Device trait over a `Netif`.
pub struct WlanDevice {
    netif: Netif,
    rx: Arc<RxQueue>,
    alloc: Arc<dyn PbufAllocator>,
    stats: Arc<LinkStats>,
}

impl WlanDevice {
    /// `rx` must be the input path `netif` was created with; `stats` the
    /// counters of the glue behind its link output.
    pub fn new(
        netif: Netif,
        rx: Arc<RxQueue>,
        alloc: Arc<dyn PbufAllocator>,
        stats: Arc<LinkStats>,
    ) -> Self {
        Self {
            netif,
            rx,
            alloc,
            stats,
        }
    }

    pub fn netif(&self) -> &Netif {
        &self.netif
    }

    pub fn netif_mut(&mut self) -> &mut Netif {
        &mut self.netif
    }
}

impl Device for WlanDevice {
    type RxToken<'a> = RxToken where Self: 'a;
    type TxToken<'a> = TxToken<'a> where Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let pbuf = self.rx.pop()?;
        Some((
            RxToken { pbuf },
            TxToken {
                netif: &self.netif,
                alloc: &*self.alloc,
                stats: &self.stats,
            },
        ))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        // Backpressure is the driver's business; report ready.
        Some(TxToken {
            netif: &self.netif,
            alloc: &*self.alloc,
            stats: &self.stats,
        })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = usize::from(self.netif.mtu()) + ETH_HDR_LEN;
        caps.max_burst_size = Some(1);
        caps
    }
}

/// Receive token: holds one frame from the queue.
pub struct RxToken {
    pbuf: Pbuf,
}

impl phy::RxToken for RxToken {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        // Driver frames are released when `self.pbuf` drops.
        match self.pbuf.contiguous_mut() {
            Some(frame) => f(frame),
            None => {
                let mut frame = self.pbuf.to_vec();
                f(&mut frame)
            }
        }
    }
}

/// Transmit token: provides a buffer to write an outgoing frame.
pub struct TxToken<'a> {
    netif: &'a Netif,
    alloc: &'a dyn PbufAllocator,
    stats: &'a LinkStats,
}

impl phy::TxToken for TxToken<'_> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let pbuf = u16::try_from(len)
            .ok()
            .and_then(|len| self.alloc.alloc(PbufLayer::Raw, len, PbufType::Ram));
        let Some(mut pbuf) = pbuf else {
            warn!("tx: no buffer for {} byte frame, dropped", len);
            self.stats.inc(LinkStat::MemErr);
            self.stats.inc(LinkStat::Drop);
            let mut scratch = vec![0u8; len];
            return f(&mut scratch);
        };

        let result = match pbuf.contiguous_mut() {
            Some(frame) => f(frame),
            None => {
                let mut scratch = vec![0u8; len];
                let result = f(&mut scratch);
                if let Err(err) = pbuf.take(&scratch) {
                    warn!("tx: cannot fill {} byte frame ({}), dropped", len, err);
                    self.stats.inc(LinkStat::Err);
                    self.stats.inc(LinkStat::Drop);
                    return result;
                }
                result
            }
        };

        if let Err(rejected) = self.netif.link_output(pbuf) {
            debug!("tx: link output failed ({})", rejected.err);
        }

        result
    }
}
