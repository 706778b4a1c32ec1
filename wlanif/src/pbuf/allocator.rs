/// The stack's buffer allocator.
///
/// `PbufAllocator` is the seam between this crate and whatever memory the
/// embedding system gives the network stack. `HeapAllocator` backs it with
/// the global heap and counts every allocation, which is what the transmit
/// path is checked against ("was a clone made?").
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::{Pbuf, PbufKind, PbufLayer, PbufType, Segment};

/// Buffer allocation as the stack sees it.
///
/// Implementations must be callable from the MAC driver's receive context
/// as well as from the stack's own thread.
pub trait PbufAllocator: Send + Sync {
    /// Allocate a buffer with a `length`-byte payload, leaving header room
    /// for `layer`.
    fn alloc(&self, layer: PbufLayer, length: u16, ty: PbufType) -> Option<Pbuf>;

    /// Allocate a buffer whose payload is supplied later by its owner
    /// (see `Pbuf::attach_frame`).
    fn alloc_reference(&self, length: u16, kind: PbufKind) -> Option<Pbuf>;

    /// Copy a (possibly chained) buffer into one freshly allocated buffer.
    fn clone_chain(&self, layer: PbufLayer, ty: PbufType, p: &Pbuf) -> Option<Pbuf> {
        let length = u16::try_from(p.tot_len()).ok()?;
        let mut q = self.alloc(layer, length, ty)?;
        q.copy_from(p).ok()?;
        Some(q)
    }
}

impl<T: PbufAllocator + ?Sized> PbufAllocator for Arc<T> {
    fn alloc(&self, layer: PbufLayer, length: u16, ty: PbufType) -> Option<Pbuf> {
        (**self).alloc(layer, length, ty)
    }

    fn alloc_reference(&self, length: u16, kind: PbufKind) -> Option<Pbuf> {
        (**self).alloc_reference(length, kind)
    }

    fn clone_chain(&self, layer: PbufLayer, ty: PbufType, p: &Pbuf) -> Option<Pbuf> {
        (**self).clone_chain(layer, ty, p)
    }
}

/// Heap-backed allocator with allocation counters.
///
/// Serves owned heap buffers and driver references. It has no static or
/// pool memory behind it, so `PbufType::Rom` and `PbufType::Pool` requests
/// fail.
pub struct HeapAllocator {
    heap_allocs: AtomicUsize,
    ref_allocs: AtomicUsize,
}

impl HeapAllocator {
    pub const fn new() -> Self {
        Self {
            heap_allocs: AtomicUsize::new(0),
            ref_allocs: AtomicUsize::new(0),
        }
    }

    /// Buffers allocated with their own memory.
    pub fn heap_allocs(&self) -> usize {
        self.heap_allocs.load(Ordering::Relaxed)
    }

    /// Reference buffers handed out (driver receive memory).
    pub fn ref_allocs(&self) -> usize {
        self.ref_allocs.load(Ordering::Relaxed)
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PbufAllocator for HeapAllocator {
    fn alloc(&self, layer: PbufLayer, length: u16, ty: PbufType) -> Option<Pbuf> {
        match ty {
            PbufType::Ram => {
                let seg = Segment::heap(layer.header_room(), usize::from(length), ty.kind())?;
                self.heap_allocs.fetch_add(1, Ordering::Relaxed);
                Some(Pbuf::from_segment(seg))
            }
            PbufType::Ref => self.alloc_reference(length, ty.kind()),
            PbufType::Rom | PbufType::Pool => None,
        }
    }

    fn alloc_reference(&self, length: u16, kind: PbufKind) -> Option<Pbuf> {
        self.ref_allocs.fetch_add(1, Ordering::Relaxed);
        Some(Pbuf::from_segment(Segment::external(usize::from(length), kind)))
    }
}
