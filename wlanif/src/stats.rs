/// Link-level statistics counters.
///
/// Increment-only from this crate; readers (SNMP, shell) take a snapshot.
use core::sync::atomic::{AtomicU32, Ordering};

/// Counter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStat {
    /// Frames handed to the driver.
    Xmit,
    /// Frames delivered by the driver.
    Recv,
    /// Frames dropped.
    Drop,
    /// Frames too short to carry a link header.
    LenErr,
    /// Out-of-memory on the link path.
    MemErr,
    /// Frames with a protocol type we do not handle.
    ProtErr,
    /// Driver transmit failures.
    Err,
}

#[derive(Default)]
pub struct LinkStats {
    xmit: AtomicU32,
    recv: AtomicU32,
    drop: AtomicU32,
    lenerr: AtomicU32,
    memerr: AtomicU32,
    proterr: AtomicU32,
    err: AtomicU32,
}

/// Point-in-time copy of `LinkStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatsSnapshot {
    pub xmit: u32,
    pub recv: u32,
    pub drop: u32,
    pub lenerr: u32,
    pub memerr: u32,
    pub proterr: u32,
    pub err: u32,
}

impl LinkStats {
    pub const fn new() -> Self {
        Self {
            xmit: AtomicU32::new(0),
            recv: AtomicU32::new(0),
            drop: AtomicU32::new(0),
            lenerr: AtomicU32::new(0),
            memerr: AtomicU32::new(0),
            proterr: AtomicU32::new(0),
            err: AtomicU32::new(0),
        }
    }

    fn counter(&self, stat: LinkStat) -> &AtomicU32 {
        match stat {
            LinkStat::Xmit => &self.xmit,
            LinkStat::Recv => &self.recv,
            LinkStat::Drop => &self.drop,
            LinkStat::LenErr => &self.lenerr,
            LinkStat::MemErr => &self.memerr,
            LinkStat::ProtErr => &self.proterr,
            LinkStat::Err => &self.err,
        }
    }

    #[inline]
    pub fn inc(&self, stat: LinkStat) {
        self.counter(stat).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, stat: LinkStat) -> u32 {
        self.counter(stat).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            xmit: self.get(LinkStat::Xmit),
            recv: self.get(LinkStat::Recv),
            drop: self.get(LinkStat::Drop),
            lenerr: self.get(LinkStat::LenErr),
            memerr: self.get(LinkStat::MemErr),
            proterr: self.get(LinkStat::ProtErr),
            err: self.get(LinkStat::Err),
        }
    }
}
