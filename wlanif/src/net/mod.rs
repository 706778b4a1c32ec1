/// Network stack: runs smoltcp over the WLAN interface glue.
///
/// Architecture:
///   WLAN MAC driver (raw Ethernet frames as Pbufs)
///       ↓ ↑
///   WlanIf (ethernetif) + Netif
///       ↓ ↑
///   WlanDevice (implements smoltcp::phy::Device)
///       ↓ ↑
///   smoltcp Interface (ARP, IP, TCP)
mod device;
pub mod stack;

pub use device::{RxQueue, WlanDevice};
pub use stack::WlanStack;

#[cfg(test)]
mod tests;
