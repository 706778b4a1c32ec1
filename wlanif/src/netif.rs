/// Network interface descriptor.
///
/// A `Netif` is shared by three parties:
///   - the stack's registration code, which creates it with an input path
///   - the interface glue, which owns name, link parameters and callbacks
///     (written only through `NetifSetup`)
///   - the WLAN SDK, which owns `state` and fills in the hardware address
///     when the station or soft-AP starts
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use bitflags::bitflags;
use smoltcp::wire::Ipv4Address;

use crate::err::{Error, Rejected};
use crate::pbuf::Pbuf;

/// Longest hardware address a descriptor can hold.
pub const NETIF_MAX_HWADDR_LEN: usize = 6;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NetifFlags: u8 {
        const UP        = 0x01;
        const BROADCAST = 0x02;
        const LINK_UP   = 0x04;
        /// Ethernet-style link that resolves addresses with ARP.
        const ETHARP    = 0x08;
        const ETHERNET  = 0x10;
        const IGMP      = 0x20;
    }
}

/// MIB-II interface type reported through SNMP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MibIfType {
    #[default]
    Other,
    EthernetCsmacd,
}

impl MibIfType {
    /// IANA ifType number.
    pub const fn code(self) -> u8 {
        match self {
            MibIfType::Other => 1,
            MibIfType::EthernetCsmacd => 6,
        }
    }
}

/// Stack input path: takes a received link-layer frame.
pub trait NetifInput: Send + Sync {
    fn input(&self, p: Pbuf, netif: &Netif) -> Result<(), Rejected>;
}

/// Stack output path for IPv4 packets (address resolution included).
pub trait NetifOutput: Send + Sync {
    fn output(&self, netif: &Netif, p: Pbuf, dest: Ipv4Address) -> Result<(), Rejected>;
}

/// Raw link-layer transmit.
pub trait LinkOutput: Send + Sync {
    fn link_output(&self, netif: &Netif, p: Pbuf) -> Result<(), Rejected>;
}

pub struct Netif {
    name: [u8; 2],
    hwaddr: [u8; NETIF_MAX_HWADDR_LEN],
    hwaddr_len: u8,
    mtu: u16,
    flags: NetifFlags,
    hostname: Option<String>,
    link_type: MibIfType,
    link_speed: u32,
    input: Arc<dyn NetifInput>,
    output: Option<Arc<dyn NetifOutput>>,
    linkoutput: Option<Arc<dyn LinkOutput>>,
    // Owned by the SDK layers; the glue never reads or writes it.
    state: Option<Box<dyn Any + Send + Sync>>,
}

impl Netif {
    /// Blank descriptor with the stack's input path installed.
    pub fn new(input: Arc<dyn NetifInput>) -> Self {
        Self {
            name: [0; 2],
            hwaddr: [0; NETIF_MAX_HWADDR_LEN],
            hwaddr_len: 0,
            mtu: 0,
            flags: NetifFlags::empty(),
            hostname: None,
            link_type: MibIfType::Other,
            link_speed: 0,
            input,
            output: None,
            linkoutput: None,
            state: None,
        }
    }

    /// Write access to the fields the interface glue owns.
    pub(crate) fn setup(&mut self) -> NetifSetup<'_> {
        NetifSetup { netif: self }
    }

    pub fn name(&self) -> [u8; 2] {
        self.name
    }

    /// Hardware address, `hwaddr_len` bytes long.
    pub fn hwaddr(&self) -> &[u8] {
        &self.hwaddr[..usize::from(self.hwaddr_len).min(NETIF_MAX_HWADDR_LEN)]
    }

    pub fn hwaddr_len(&self) -> u8 {
        self.hwaddr_len
    }

    /// Set by the SDK when the station or soft-AP interface starts.
    pub fn set_hwaddr(&mut self, mac: [u8; NETIF_MAX_HWADDR_LEN]) {
        self.hwaddr = mac;
    }

    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    pub fn flags(&self) -> NetifFlags {
        self.flags
    }

    pub fn is_link_up(&self) -> bool {
        self.flags.contains(NetifFlags::LINK_UP)
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn link_type(&self) -> MibIfType {
        self.link_type
    }

    /// Link speed in bits per second, 0 if unknown.
    pub fn link_speed(&self) -> u32 {
        self.link_speed
    }

    pub fn state(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.state.as_deref()
    }

    pub fn state_mut(&mut self) -> &mut Option<Box<dyn Any + Send + Sync>> {
        &mut self.state
    }

    /// Pass a received frame to the stack.
    pub fn input(&self, p: Pbuf) -> Result<(), Rejected> {
        self.input.input(p, self)
    }

    /// Send an IPv4 packet towards `dest`.
    pub fn output(&self, p: Pbuf, dest: Ipv4Address) -> Result<(), Rejected> {
        match &self.output {
            Some(output) => output.output(self, p, dest),
            None => Err(Rejected::returned(Error::If, p)),
        }
    }

    /// Send a complete link-layer frame.
    pub fn link_output(&self, p: Pbuf) -> Result<(), Rejected> {
        match &self.linkoutput {
            Some(link) => link.link_output(self, p),
            None => Err(Rejected::returned(Error::If, p)),
        }
    }
}

impl core::fmt::Debug for Netif {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Netif")
            .field("name", &core::str::from_utf8(&self.name).unwrap_or("??"))
            .field("hwaddr", &self.hwaddr())
            .field("mtu", &self.mtu)
            .field("flags", &self.flags)
            .field("hostname", &self.hostname)
            .finish()
    }
}

/// Capability over the glue-owned part of a `Netif`.
///
/// Deliberately has no access to `state`.
pub struct NetifSetup<'a> {
    netif: &'a mut Netif,
}

impl NetifSetup<'_> {
    pub fn set_name(&mut self, name: [u8; 2]) {
        self.netif.name = name;
    }

    pub fn set_hwaddr_len(&mut self, len: u8) {
        self.netif.hwaddr_len = len.min(NETIF_MAX_HWADDR_LEN as u8);
    }

    pub fn set_mtu(&mut self, mtu: u16) {
        self.netif.mtu = mtu;
    }

    pub fn set_flags(&mut self, flags: NetifFlags) {
        self.netif.flags = flags;
    }

    pub fn set_hostname(&mut self, hostname: Option<String>) {
        self.netif.hostname = hostname;
    }

    pub fn init_snmp(&mut self, link_type: MibIfType, link_speed: u32) {
        self.netif.link_type = link_type;
        self.netif.link_speed = link_speed;
    }

    pub fn set_output(&mut self, output: Arc<dyn NetifOutput>) {
        self.netif.output = Some(output);
    }

    pub fn set_linkoutput(&mut self, link: Arc<dyn LinkOutput>) {
        self.netif.linkoutput = Some(link);
    }
}
