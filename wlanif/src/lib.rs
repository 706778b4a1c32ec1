//! WLAN interface glue: connects a prebuilt WLAN MAC library to a TCP/IP
//! stack's network-interface abstraction.
//!
//! The MAC library delivers and consumes raw Ethernet frames; the stack
//! deals in `Pbuf` chains and per-interface callbacks. `ethernetif::WlanIf`
//! sits between them, and `net` runs smoltcp on top.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod driver;
pub mod err;
pub mod ethernetif;
pub mod mock;
pub mod net;
pub mod netif;
pub mod pbuf;
pub mod stats;
pub mod sysparam;

pub use driver::MacDriver;
pub use err::{Error, Rejected};
pub use ethernetif::{TxStatusPolicy, WlanIf, WlanIfConfig};
pub use netif::{LinkOutput, Netif, NetifFlags, NetifInput, NetifOutput};
pub use pbuf::{HeapAllocator, Pbuf, PbufAllocator, PbufLayer, PbufType};
