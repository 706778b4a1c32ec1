/// Test doubles for the collaborators around the interface glue.
///
/// Simulates the MAC driver, its receive memory, a constrained allocator and
/// the stack's input/output paths entirely in memory, so the glue can be
/// exercised on the host without a radio.
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use smoltcp::wire::Ipv4Address;
use spin::Mutex;

use crate::driver::MacDriver;
use crate::err::{Error, Rejected};
use crate::netif::{Netif, NetifInput, NetifOutput};
use crate::pbuf::{DriverFrame, HeapAllocator, Pbuf, PbufAllocator, PbufKind, PbufLayer, PbufType};

/// Driver receive memory that counts how often it was handed back.
pub struct MockFrame {
    data: Vec<u8>,
    releases: Arc<AtomicUsize>,
}

impl MockFrame {
    pub fn new(data: &[u8], releases: Arc<AtomicUsize>) -> Box<Self> {
        Box::new(Self {
            data: data.to_vec(),
            releases,
        })
    }
}

impl DriverFrame for MockFrame {
    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn release(self: Box<Self>) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the driver saw for one transmitted frame.
#[derive(Debug, Clone)]
pub struct SentFrame {
    pub bytes: Vec<u8>,
    pub segments: usize,
    pub kind: PbufKind,
}

/// MAC driver that records transmitted frames.
pub struct MockDriver {
    sent: Vec<SentFrame>,
    status: i8,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::failing(0)
    }

    /// Driver whose transmit entry always returns `status`.
    pub fn failing(status: i8) -> Self {
        Self {
            sent: Vec::new(),
            status,
        }
    }

    pub fn sent(&self) -> &[SentFrame] {
        &self.sent
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MacDriver for MockDriver {
    fn output_pbuf(&mut self, _netif: &Netif, p: Pbuf) -> i8 {
        self.sent.push(SentFrame {
            bytes: p.to_vec(),
            segments: p.segment_count(),
            kind: p.kind(),
        });
        self.status
    }
}

/// Heap allocator that runs dry after a fixed number of allocations.
pub struct BudgetAllocator {
    inner: HeapAllocator,
    budget: AtomicUsize,
}

impl BudgetAllocator {
    pub fn new(budget: usize) -> Self {
        Self {
            inner: HeapAllocator::default(),
            budget: AtomicUsize::new(budget),
        }
    }

    pub fn inner(&self) -> &HeapAllocator {
        &self.inner
    }

    fn spend(&self) -> bool {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .is_ok()
    }
}

impl PbufAllocator for BudgetAllocator {
    fn alloc(&self, layer: PbufLayer, length: u16, ty: PbufType) -> Option<Pbuf> {
        if !self.spend() {
            return None;
        }
        self.inner.alloc(layer, length, ty)
    }

    fn alloc_reference(&self, length: u16, kind: PbufKind) -> Option<Pbuf> {
        if !self.spend() {
            return None;
        }
        self.inner.alloc_reference(length, kind)
    }
}

/// Stack input path that keeps every frame it accepts.
pub struct RecordingInput {
    frames: Mutex<Vec<Pbuf>>,
    refuse: Option<Error>,
    calls: AtomicUsize,
}

impl RecordingInput {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            refuse: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Input path that hands every frame back with `err`.
    pub fn refusing(err: Error) -> Self {
        Self {
            refuse: Some(err),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Drop every kept frame. Returns how many there were.
    pub fn drain(&self) -> usize {
        let mut frames = self.frames.lock();
        let n = frames.len();
        frames.clear();
        n
    }

    pub fn with_frames<R>(&self, f: impl FnOnce(&[Pbuf]) -> R) -> R {
        f(&self.frames.lock())
    }
}

impl Default for RecordingInput {
    fn default() -> Self {
        Self::new()
    }
}

impl NetifInput for RecordingInput {
    fn input(&self, p: Pbuf, _netif: &Netif) -> Result<(), Rejected> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.refuse {
            return Err(Rejected::returned(err, p));
        }
        self.frames.lock().push(p);
        Ok(())
    }
}

/// Stack IPv4 output that records destinations and discards packets.
#[derive(Default)]
pub struct RecordingOutput {
    dests: Mutex<Vec<Ipv4Address>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dests(&self) -> Vec<Ipv4Address> {
        self.dests.lock().clone()
    }
}

impl NetifOutput for RecordingOutput {
    fn output(&self, _netif: &Netif, p: Pbuf, dest: Ipv4Address) -> Result<(), Rejected> {
        self.dests.lock().push(dest);
        p.free();
        Ok(())
    }
}
