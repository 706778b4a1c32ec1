/// Transmit entry point of the WLAN MAC driver.
use crate::netif::Netif;
use crate::pbuf::Pbuf;

/// The part of the MAC library this crate calls into.
pub trait MacDriver: Send {
    /// Queue `p` for transmission on `netif`.
    ///
    /// The driver owns `p` from here on, whatever the outcome. Returns the
    /// driver's status code (0 on success).
    fn output_pbuf(&mut self, netif: &Netif, p: Pbuf) -> i8;
}
