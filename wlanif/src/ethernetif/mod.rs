/// WLAN interface glue: the WLAN MAC library as a stack network interface.
///
///   MAC library (radio)
///       ↓ input()                  ↑ MacDriver::output_pbuf()
///   WlanIf (classify / flatten chains)
///       ↓ Netif::input()           ↑ LinkOutput::link_output()
///   TCP/IP stack
///
/// The MAC library also allocates its own buffers through
/// `WlanIf::sdk_pbuf_alloc` (see `pbuf::legacy`).
use alloc::string::String;
use alloc::sync::Arc;

use log::{debug, info, trace, warn};
use smoltcp::wire::{EthernetFrame, EthernetProtocol, ETHERNET_HEADER_LEN};
use spin::{Mutex, MutexGuard};

use crate::driver::MacDriver;
use crate::err::{Error, Rejected};
use crate::netif::{LinkOutput, MibIfType, Netif, NetifFlags, NetifOutput};
use crate::pbuf::{legacy, Pbuf, PbufAllocator, PbufLayer, PbufType};
use crate::stats::{LinkStat, LinkStats};
use crate::sysparam::{SysParams, HOSTNAME_KEY};

/// Interface name prefix.
pub const NETIF_NAME: [u8; 2] = *b"en";
/// Ethernet hardware address length.
pub const ETHARP_HWADDR_LEN: u8 = 6;
/// Link MTU (IP payload, link header excluded).
pub const WLAN_MTU: u16 = 1500;
/// Ethernet header: destination, source, type.
pub const ETH_HDR_LEN: usize = ETHERNET_HEADER_LEN;

static_assertions::const_assert_eq!(ETH_HDR_LEN, 14);
static_assertions::const_assert!(WLAN_MTU as usize + ETH_HDR_LEN <= u16::MAX as usize);

/// What to do with a non-zero status from the driver's transmit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxStatusPolicy {
    /// Report the failure to the stack through `Error::from_code`.
    #[default]
    Propagate,
    /// Report success regardless, like the vendor glue.
    Ignore,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WlanIfConfig {
    /// Advertised through SNMP, 0 if unknown.
    pub link_speed_bps: u32,
    pub tx_status: TxStatusPolicy,
}

/// Glue between one WLAN MAC driver and the stack.
pub struct WlanIf<D, A> {
    driver: Mutex<D>,
    alloc: A,
    output: Arc<dyn NetifOutput>,
    stats: Arc<LinkStats>,
    config: WlanIfConfig,
}

impl<D: MacDriver, A: PbufAllocator> WlanIf<D, A> {
    /// `output` is the stack's ARP-aware IPv4 output, installed on every
    /// interface this glue initializes.
    pub fn new(driver: D, alloc: A, output: Arc<dyn NetifOutput>, config: WlanIfConfig) -> Self {
        Self {
            driver: Mutex::new(driver),
            alloc,
            output,
            stats: Arc::new(LinkStats::new()),
            config,
        }
    }

    pub fn driver(&self) -> MutexGuard<'_, D> {
        self.driver.lock()
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Counters handle for other paths onto the same link (the smoltcp
    /// device's transmit token).
    pub fn shared_stats(&self) -> Arc<LinkStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &WlanIfConfig {
        &self.config
    }

    /// Buffer allocation requested by the MAC library (old type numbering).
    ///
    /// # Panics
    /// On a type value the library should never pass; see `pbuf::legacy`.
    pub fn sdk_pbuf_alloc(&self, layer: PbufLayer, length: u16, legacy_type: u8) -> Option<Pbuf> {
        legacy::sdk_pbuf_alloc(&self.alloc, layer, length, legacy_type)
    }

    /// Frame received by the MAC library.
    ///
    /// IPv4 and ARP frames go to the stack; anything else is released here.
    /// IPv6 is not passed up.
    pub fn input(&self, netif: &Netif, p: Pbuf) {
        self.stats.inc(LinkStat::Recv);

        let mut hdr = [0u8; ETH_HDR_LEN];
        if p.copy_partial(&mut hdr, 0) < ETH_HDR_LEN {
            trace!("ethernetif_input: runt frame ({} bytes) dropped", p.tot_len());
            self.stats.inc(LinkStat::LenErr);
            self.stats.inc(LinkStat::Drop);
            p.free();
            return;
        }

        match EthernetFrame::new_unchecked(&hdr[..]).ethertype() {
            EthernetProtocol::Ipv4 | EthernetProtocol::Arp => {
                if let Err(rejected) = netif.input(p) {
                    debug!("ethernetif_input: IP input error ({})", rejected.err);
                    self.stats.inc(LinkStat::Drop);
                    if let Some(p) = rejected.pbuf {
                        p.free();
                    }
                }
            }
            other => {
                trace!("ethernetif_input: ethertype {:#06x} dropped", u16::from(other));
                self.stats.inc(LinkStat::ProtErr);
                self.stats.inc(LinkStat::Drop);
                p.free();
            }
        }
    }

    /// Hand a frame to the driver as a single buffer.
    fn low_level_output(&self, netif: &Netif, p: Pbuf) -> Result<(), Rejected> {
        // The driver only takes single-segment frames.
        let p = if p.is_chained() {
            match self.alloc.clone_chain(PbufLayer::Raw, PbufType::Ram, &p) {
                Some(q) => {
                    p.free();
                    q
                }
                None => {
                    warn!("low_level_output: no memory to flatten {} byte chain", p.tot_len());
                    self.stats.inc(LinkStat::MemErr);
                    return Err(Rejected::returned(Error::Mem, p));
                }
            }
        } else {
            p
        };

        let status = self.driver.lock().output_pbuf(netif, p);
        if let Err(err) = Error::from_code(status) {
            if self.config.tx_status == TxStatusPolicy::Propagate {
                warn!("low_level_output: driver transmit failed (status {})", status);
                self.stats.inc(LinkStat::Err);
                return Err(Rejected::consumed(err));
            }
        }

        self.stats.inc(LinkStat::Xmit);
        Ok(())
    }
}

impl<D, A> WlanIf<D, A>
where
    D: MacDriver + 'static,
    A: PbufAllocator + 'static,
{
    /// One-time setup of `netif` before the stack brings it up.
    ///
    /// The hardware address itself is filled in later by the SDK; `state` is
    /// left alone.
    ///
    /// # Panics
    /// If `netif` is `None`.
    pub fn init(
        self: &Arc<Self>,
        netif: Option<&mut Netif>,
        params: &dyn SysParams,
    ) -> Result<(), Error> {
        let netif = match netif {
            Some(netif) => netif,
            None => panic!("netif != NULL"),
        };
        let mut setup = netif.setup();

        #[cfg(feature = "netif-hostname")]
        setup.set_hostname(read_hostname(params));
        #[cfg(not(feature = "netif-hostname"))]
        let _ = params;

        setup.init_snmp(MibIfType::EthernetCsmacd, self.config.link_speed_bps);

        setup.set_name(NETIF_NAME);
        setup.set_output(Arc::clone(&self.output));
        setup.set_linkoutput(Arc::clone(self) as Arc<dyn LinkOutput>);

        setup.set_hwaddr_len(ETHARP_HWADDR_LEN);
        setup.set_mtu(WLAN_MTU);
        setup.set_flags(NetifFlags::ETHARP | NetifFlags::LINK_UP);

        info!(
            "ethernetif_init: {} mtu={} hostname={:?}",
            core::str::from_utf8(&NETIF_NAME).unwrap_or("??"),
            WLAN_MTU,
            netif.hostname()
        );
        Ok(())
    }
}

impl<D, A> LinkOutput for WlanIf<D, A>
where
    D: MacDriver,
    A: PbufAllocator,
{
    fn link_output(&self, netif: &Netif, p: Pbuf) -> Result<(), Rejected> {
        self.low_level_output(netif, p)
    }
}

/// Hostname from persisted parameters; an empty value counts as unset.
#[cfg_attr(not(feature = "netif-hostname"), allow(dead_code))]
fn read_hostname(params: &dyn SysParams) -> Option<String> {
    match params.get_string(HOSTNAME_KEY) {
        Ok(Some(name)) if !name.is_empty() => Some(name),
        Ok(_) => None,
        Err(e) => {
            warn!("ethernetif_init: hostname unavailable ({})", e);
            None
        }
    }
}
