/// TCP/IP network stack built on smoltcp, running over the WLAN interface.
///
/// Static IPv4 configuration only; the address and gateway normally come
/// from the WLAN SDK's IP info once the station has associated.
use alloc::vec;

use smoltcp::iface::{Config, Interface, SocketSet};
use smoltcp::time::Instant;
use smoltcp::wire::{EthernetAddress, IpCidr, Ipv4Address, Ipv4Cidr};

use super::device::WlanDevice;

/// Network stack state.
pub struct WlanStack {
    device: WlanDevice,
    iface: Interface,
    sockets: SocketSet<'static>,
}

impl WlanStack {
    /// Create a stack over `device`. The SDK must have set the interface's
    /// hardware address first; returns `None` otherwise.
    pub fn new(
        mut device: WlanDevice,
        cidr: Ipv4Cidr,
        gateway: Option<Ipv4Address>,
        now: Instant,
    ) -> Option<Self> {
        let hwaddr = device.netif().hwaddr();
        if hwaddr.len() != 6 {
            return None;
        }
        let mac = EthernetAddress::from_bytes(hwaddr);
        if !mac.is_unicast() {
            return None;
        }

        let config = Config::new(mac.into());
        let mut iface = Interface::new(config, &mut device, now);

        iface.update_ip_addrs(|addrs| {
            addrs.push(IpCidr::Ipv4(cidr)).ok();
        });

        if let Some(gateway) = gateway {
            iface.routes_mut().add_default_ipv4_route(gateway).ok();
        }

        let sockets = SocketSet::new(vec![]);

        Some(Self {
            device,
            iface,
            sockets,
        })
    }

    /// Poll the network stack: process queued frames and advance socket
    /// state machines. Returns true if anything was processed.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.iface.poll(now, &mut self.device, &mut self.sockets)
    }

    pub fn device(&self) -> &WlanDevice {
        &self.device
    }

    pub fn iface(&self) -> &Interface {
        &self.iface
    }

    pub fn sockets_mut(&mut self) -> &mut SocketSet<'static> {
        &mut self.sockets
    }
}
