/// Network buffers shared between the TCP/IP stack and the WLAN MAC driver.
///
/// A `Pbuf` is a non-empty, ordered sequence of segments. A single segment
/// is the common case; chains appear when a frame is assembled from several
/// allocations (e.g. a header prepended to a payload).
///
/// Segment storage:
///   Heap      owned outright, freed with the buffer
///   External  driver-owned receive memory, released through the driver's
///             own callback (`DriverFrame::release`), never freed directly
use alloc::boxed::Box;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::err::Error;

mod allocator;
pub mod legacy;

pub use allocator::{HeapAllocator, PbufAllocator};

/// Link-level header length reserved in front of `PbufLayer::Link` payloads.
pub const PBUF_LINK_HLEN: usize = 14;
/// IPv4 header length reserved in front of `PbufLayer::Ip` payloads.
pub const PBUF_IP_HLEN: usize = 20;
/// TCP header length reserved in front of `PbufLayer::Transport` payloads.
pub const PBUF_TRANSPORT_HLEN: usize = 20;

/// Which protocol layer the payload starts at. Determines how much header
/// room is reserved in front of the payload of a fresh allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbufLayer {
    Transport,
    Ip,
    Link,
    RawTx,
    Raw,
}

impl PbufLayer {
    /// Bytes of header room in front of the payload.
    pub const fn header_room(self) -> usize {
        match self {
            PbufLayer::Transport => PBUF_LINK_HLEN + PBUF_IP_HLEN + PBUF_TRANSPORT_HLEN,
            PbufLayer::Ip => PBUF_LINK_HLEN + PBUF_IP_HLEN,
            PbufLayer::Link => PBUF_LINK_HLEN,
            PbufLayer::RawTx | PbufLayer::Raw => 0,
        }
    }
}

/// Allocator a segment came from (low nibble of the type word).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AllocSrc {
    StdHeap = 0,
    StdMempPbuf = 1,
    StdMempPbufPool = 2,
    /// WLAN receive memory owned by the MAC driver.
    EspRx = 3,
}

impl AllocSrc {
    /// Mask of the allocation source inside the type word.
    pub const MASK: u16 = 0x000F;

    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits & Self::MASK {
            0 => Some(AllocSrc::StdHeap),
            1 => Some(AllocSrc::StdMempPbuf),
            2 => Some(AllocSrc::StdMempPbufPool),
            3 => Some(AllocSrc::EspRx),
            _ => None,
        }
    }
}

bitflags! {
    /// Flag bits of the type word (everything above the source nibble).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KindFlags: u16 {
        /// Payload may change under the stack (not copied on queueing).
        const DATA_VOLATILE          = 0x0040;
        /// Header and payload live in one allocation.
        const STRUCT_DATA_CONTIGUOUS = 0x0080;
        /// Buffer belongs to the receive path.
        const RX                     = 0x0100;
        /// Payload of the whole chain is one allocation.
        const DATA_CONTIGUOUS        = 0x0200;
    }
}

/// Packed allocation kind of a segment: source allocator + flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbufKind {
    src: AllocSrc,
    flags: KindFlags,
}

impl PbufKind {
    /// Reference to WLAN receive memory, released through the driver.
    pub const ESP_RX: Self = Self::new(AllocSrc::EspRx, KindFlags::RX);

    pub const fn new(src: AllocSrc, flags: KindFlags) -> Self {
        Self { src, flags }
    }

    pub const fn src(self) -> AllocSrc {
        self.src
    }

    pub const fn flags(self) -> KindFlags {
        self.flags
    }

    pub const fn is_rx(self) -> bool {
        self.flags.contains(KindFlags::RX)
    }

    /// Packed type word.
    pub const fn bits(self) -> u16 {
        self.src as u16 | self.flags.bits()
    }

    /// Unpack a type word. Unknown sources or flag bits are rejected.
    pub const fn from_bits(bits: u16) -> Option<Self> {
        let src = match AllocSrc::from_bits(bits) {
            Some(src) => src,
            None => return None,
        };
        match KindFlags::from_bits(bits & !AllocSrc::MASK) {
            Some(flags) => Some(Self { src, flags }),
            None => None,
        }
    }
}

/// Buffer types the stack allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbufType {
    /// Header and payload in one heap allocation.
    Ram,
    /// Payload points at static read-only data.
    Rom,
    /// Payload points at memory owned by someone else.
    Ref,
    /// Chain of fixed-size pool buffers.
    Pool,
}

impl PbufType {
    pub const fn kind(self) -> PbufKind {
        match self {
            PbufType::Ram => PbufKind::new(
                AllocSrc::StdHeap,
                KindFlags::DATA_CONTIGUOUS.union(KindFlags::STRUCT_DATA_CONTIGUOUS),
            ),
            PbufType::Rom => PbufKind::new(AllocSrc::StdMempPbuf, KindFlags::empty()),
            PbufType::Ref => PbufKind::new(AllocSrc::StdMempPbuf, KindFlags::DATA_VOLATILE),
            PbufType::Pool => PbufKind::new(
                AllocSrc::StdMempPbufPool,
                KindFlags::RX.union(KindFlags::STRUCT_DATA_CONTIGUOUS),
            ),
        }
    }
}

bitflags! {
    /// Per-buffer flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PbufFlags: u8 {
        /// Last segment of a send: push to the application.
        const PUSH      = 0x01;
        /// Freed through a custom routine instead of the stack allocator.
        const IS_CUSTOM = 0x02;
        /// Received as link-level broadcast.
        const LLBCAST   = 0x08;
        /// Received as link-level multicast.
        const LLMCAST   = 0x10;
    }
}

/// Receive memory owned by the MAC driver.
///
/// The stack borrows the payload for the lifetime of the buffer and hands
/// the frame back through `release` exactly once when the buffer is freed.
pub trait DriverFrame: Send {
    fn payload(&self) -> &[u8];
    fn payload_mut(&mut self) -> &mut [u8];
    /// Return the memory to the driver.
    fn release(self: Box<Self>);
}

enum Storage {
    Heap { buf: Vec<u8>, offset: usize },
    /// `None` until the driver attaches its frame.
    External(Option<Box<dyn DriverFrame>>),
}

/// One contiguous piece of a buffer.
pub struct Segment {
    storage: Storage,
    len: usize,
    kind: PbufKind,
}

impl Segment {
    /// Heap segment with `room` bytes of header space in front of a zeroed
    /// `len`-byte payload. `None` if the heap cannot satisfy the request.
    pub fn heap(room: usize, len: usize, kind: PbufKind) -> Option<Self> {
        let total = room.checked_add(len)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(total).ok()?;
        buf.resize(total, 0);
        Some(Self {
            storage: Storage::Heap { buf, offset: room },
            len,
            kind,
        })
    }

    /// Placeholder for externally owned memory of `len` bytes.
    pub fn external(len: usize, kind: PbufKind) -> Self {
        Self {
            storage: Storage::External(None),
            len,
            kind,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> PbufKind {
        self.kind
    }

    /// True for segments referencing driver-owned memory.
    pub fn is_external(&self) -> bool {
        matches!(self.storage, Storage::External(_))
    }

    pub fn payload(&self) -> &[u8] {
        match &self.storage {
            Storage::Heap { buf, offset } => &buf[*offset..*offset + self.len],
            Storage::External(Some(frame)) => &frame.payload()[..self.len],
            Storage::External(None) => &[],
        }
    }

    /// Writable payload. Empty for an unattached external segment.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        match &mut self.storage {
            Storage::Heap { buf, offset } => &mut buf[*offset..*offset + len],
            Storage::External(Some(frame)) => &mut frame.payload_mut()[..len],
            Storage::External(None) => &mut [],
        }
    }

    /// Free header room in front of the payload.
    pub fn header_room(&self) -> usize {
        match &self.storage {
            Storage::Heap { offset, .. } => *offset,
            _ => 0,
        }
    }

    fn add_header(&mut self, n: usize) -> Result<(), Error> {
        match &mut self.storage {
            Storage::Heap { offset, .. } if *offset >= n => {
                *offset -= n;
                self.len += n;
                Ok(())
            }
            _ => Err(Error::Buf),
        }
    }

    fn remove_header(&mut self, n: usize) -> Result<(), Error> {
        if n > self.len {
            return Err(Error::Val);
        }
        match &mut self.storage {
            Storage::Heap { offset, .. } => *offset += n,
            // Driver memory cannot be re-sliced from this side.
            Storage::External(_) => return Err(Error::Arg),
        }
        self.len -= n;
        Ok(())
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        if let Storage::External(frame) = &mut self.storage {
            if let Some(frame) = frame.take() {
                frame.release();
            }
        }
    }
}

/// A frame, as one or more segments.
pub struct Pbuf {
    segments: Vec<Segment>,
    flags: PbufFlags,
}

impl Pbuf {
    pub fn from_segment(segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(1);
        segments.push(segment);
        Self {
            segments,
            flags: PbufFlags::empty(),
        }
    }

    /// Build a chain. `None` for an empty segment list.
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        Some(Self {
            segments,
            flags: PbufFlags::empty(),
        })
    }

    /// Length of the head segment.
    pub fn len(&self) -> usize {
        self.segments[0].len
    }

    pub fn is_empty(&self) -> bool {
        self.tot_len() == 0
    }

    /// Length of the whole chain.
    pub fn tot_len(&self) -> usize {
        self.segments.iter().map(|s| s.len).sum()
    }

    /// True if the frame continues past the head segment.
    pub fn is_chained(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn head(&self) -> &Segment {
        &self.segments[0]
    }

    /// Allocation kind of the head segment.
    pub fn kind(&self) -> PbufKind {
        self.segments[0].kind
    }

    pub fn flags(&self) -> PbufFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: PbufFlags) {
        self.flags = flags;
    }

    /// Head segment payload.
    pub fn payload(&self) -> &[u8] {
        self.segments[0].payload()
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.segments[0].payload_mut()
    }

    /// The whole frame as one slice, if it is not chained.
    pub fn contiguous_mut(&mut self) -> Option<&mut [u8]> {
        if self.is_chained() {
            return None;
        }
        Some(self.segments[0].payload_mut())
    }

    /// Hand driver receive memory to a reference buffer.
    ///
    /// Only valid on an empty external head segment; the frame is given back
    /// otherwise. The segment length is clamped to the frame payload.
    pub fn attach_frame(
        &mut self,
        frame: Box<dyn DriverFrame>,
    ) -> Result<(), (Error, Box<dyn DriverFrame>)> {
        let head = &mut self.segments[0];
        match &mut head.storage {
            Storage::External(slot @ None) => {
                head.len = head.len.min(frame.payload().len());
                *slot = Some(frame);
                self.flags |= PbufFlags::IS_CUSTOM;
                Ok(())
            }
            _ => Err((Error::Arg, frame)),
        }
    }

    /// Grow the head payload into its header room by `n` bytes.
    pub fn add_header(&mut self, n: usize) -> Result<(), Error> {
        self.segments[0].add_header(n)
    }

    /// Hide `n` bytes at the front of the head payload.
    pub fn remove_header(&mut self, n: usize) -> Result<(), Error> {
        self.segments[0].remove_header(n)
    }

    /// Append `tail` to this chain. `tail`'s flags are discarded.
    pub fn cat(&mut self, mut tail: Pbuf) {
        self.segments.append(&mut tail.segments);
    }

    /// Copy up to `dst.len()` bytes starting `offset` bytes into the chain.
    /// Returns the number of bytes copied.
    pub fn copy_partial(&self, dst: &mut [u8], offset: usize) -> usize {
        let mut skip = offset;
        let mut copied = 0;
        for seg in &self.segments {
            if copied == dst.len() {
                break;
            }
            let payload = seg.payload();
            if skip >= payload.len() {
                skip -= payload.len();
                continue;
            }
            let src = &payload[skip..];
            skip = 0;
            let n = src.len().min(dst.len() - copied);
            dst[copied..copied + n].copy_from_slice(&src[..n]);
            copied += n;
        }
        copied
    }

    /// Write `src` into the chain starting `offset` bytes in.
    pub fn take_at(&mut self, src: &[u8], offset: usize) -> Result<(), Error> {
        let end = offset.checked_add(src.len()).ok_or(Error::Arg)?;
        if end > self.tot_len() {
            return Err(Error::Mem);
        }
        let mut skip = offset;
        let mut written = 0;
        for seg in &mut self.segments {
            if written == src.len() {
                break;
            }
            let payload = seg.payload_mut();
            if skip >= payload.len() {
                skip -= payload.len();
                continue;
            }
            let dst = &mut payload[skip..];
            skip = 0;
            let n = dst.len().min(src.len() - written);
            dst[..n].copy_from_slice(&src[written..written + n]);
            written += n;
        }
        if written == src.len() {
            Ok(())
        } else {
            // Unattached segments in the way.
            Err(Error::Buf)
        }
    }

    /// Write `src` at the start of the chain.
    pub fn take(&mut self, src: &[u8]) -> Result<(), Error> {
        self.take_at(src, 0)
    }

    /// Copy the whole of `src` into this buffer, which must be large enough.
    ///
    /// Fails with `Error::Buf` if a segment of `src` holds fewer bytes than
    /// its length claims (a reference segment with no frame attached).
    pub fn copy_from(&mut self, src: &Pbuf) -> Result<(), Error> {
        if src.tot_len() > self.tot_len() {
            return Err(Error::Arg);
        }
        let mut offset = 0;
        for seg in &src.segments {
            let payload = seg.payload();
            if payload.len() != seg.len {
                return Err(Error::Buf);
            }
            self.take_at(payload, offset)?;
            offset += payload.len();
        }
        Ok(())
    }

    /// Flatten the chain into a new vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.tot_len());
        for seg in &self.segments {
            out.extend_from_slice(seg.payload());
        }
        out
    }

    /// Release the buffer. Returns the number of segments freed.
    pub fn free(self) -> usize {
        self.segments.len()
    }
}

impl core::fmt::Debug for Pbuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pbuf")
            .field("tot_len", &self.tot_len())
            .field("segments", &self.segments.len())
            .field("kind", &self.kind())
            .field("flags", &self.flags)
            .finish()
    }
}
