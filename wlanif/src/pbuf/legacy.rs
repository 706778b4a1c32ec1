/// Buffer allocation entry point for the prebuilt WLAN MAC library.
///
/// The MAC library was compiled against the old buffer-type enumeration:
///
///   0  RAM   heap buffer, written by the driver before transmit
///   1  ROM
///   2  REF   wraps driver receive memory
///   3  POOL
///
/// The current stack packs allocation source and flags into a type word
/// instead, so the raw value the library passes cannot be forwarded as-is.
/// Every library-originated allocation goes through `sdk_pbuf_alloc`, which
/// renumbers; code inside this crate calls the allocator directly.
///
/// The library only ever asks for RAM (transmit staging) and REF (receive
/// queue). Receive buffers reference driver memory that must be returned
/// through the driver's own free routine, so they get the `EspRx` source
/// and the receive flag.
use super::{Pbuf, PbufAllocator, PbufKind, PbufLayer, PbufType};

/// Old-enumeration value of a heap buffer.
pub const LEGACY_PBUF_RAM: u8 = 0;
/// Old-enumeration value of a static-data buffer (never used by the library).
pub const LEGACY_PBUF_ROM: u8 = 1;
/// Old-enumeration value of a reference buffer.
pub const LEGACY_PBUF_REF: u8 = 2;
/// Old-enumeration value of a pool buffer (never used by the library).
pub const LEGACY_PBUF_POOL: u8 = 3;

/// Allocate a buffer on behalf of the MAC library.
///
/// # Panics
/// On any `legacy_type` other than `LEGACY_PBUF_RAM` or `LEGACY_PBUF_REF`.
/// That can only mean the library and this crate disagree on the buffer
/// ABI, and no allocation is attempted.
pub fn sdk_pbuf_alloc<A: PbufAllocator + ?Sized>(
    alloc: &A,
    layer: PbufLayer,
    length: u16,
    legacy_type: u8,
) -> Option<Pbuf> {
    match legacy_type {
        LEGACY_PBUF_RAM => alloc.alloc(layer, length, PbufType::Ram),
        LEGACY_PBUF_REF => alloc.alloc_reference(length, PbufKind::ESP_RX),
        other => panic!("Unexpected pbuf_alloc type {}", other),
    }
}
