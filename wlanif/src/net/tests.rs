/// Tests for the smoltcp bridge: RX queue, PHY tokens, and a stack answering
/// ARP over the mock driver.
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use smoltcp::phy::{Device, Medium, RxToken as _, TxToken as _};
use smoltcp::time::Instant;
use smoltcp::wire::{Ipv4Address, Ipv4Cidr};

use super::*;
use crate::err::Error;
use crate::ethernetif::{WlanIf, WlanIfConfig};
use crate::mock::{BudgetAllocator, MockDriver, MockFrame, RecordingOutput};
use crate::netif::Netif;
use crate::pbuf::legacy::LEGACY_PBUF_REF;
use crate::pbuf::{HeapAllocator, Pbuf, PbufAllocator, PbufLayer, PbufType};
use crate::stats::{LinkStat, LinkStats};
use crate::sysparam::MemSysParams;

type TestIf = WlanIf<MockDriver, Arc<HeapAllocator>>;

const OUR_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
const PEER_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x02];

fn setup(rx_capacity: usize) -> (Arc<TestIf>, Arc<HeapAllocator>, WlanDevice) {
    let alloc = Arc::new(HeapAllocator::default());
    let rx = Arc::new(RxQueue::new(rx_capacity));
    let wlan = Arc::new(WlanIf::new(
        MockDriver::new(),
        alloc.clone(),
        Arc::new(RecordingOutput::new()),
        WlanIfConfig::default(),
    ));
    let mut netif = Netif::new(rx.clone());
    wlan.init(Some(&mut netif), &MemSysParams::new()).unwrap();
    // Station start.
    netif.set_hwaddr(OUR_MAC);
    let device = WlanDevice::new(netif, rx, alloc.clone(), wlan.shared_stats());
    (wlan, alloc, device)
}

fn rx_pbuf(wlan: &TestIf, bytes: &[u8], releases: &Arc<AtomicUsize>) -> Pbuf {
    let mut p = wlan
        .sdk_pbuf_alloc(PbufLayer::Raw, bytes.len() as u16, LEGACY_PBUF_REF)
        .unwrap();
    p.attach_frame(MockFrame::new(bytes, releases.clone())).ok().unwrap();
    p
}

fn ipv4_frame() -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&OUR_MAC);
    frame.extend_from_slice(&PEER_MAC);
    frame.extend_from_slice(&[0x08, 0x00]);
    frame.extend_from_slice(&[0x45; 20]);
    frame
}

fn arp_request(sender_ip: [u8; 4], target_ip: [u8; 4]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[0xFF; 6]);
    frame.extend_from_slice(&PEER_MAC);
    frame.extend_from_slice(&[0x08, 0x06]);
    // htype, ptype, hlen, plen, op=request
    frame.extend_from_slice(&[0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01]);
    frame.extend_from_slice(&PEER_MAC);
    frame.extend_from_slice(&sender_ip);
    frame.extend_from_slice(&[0; 6]);
    frame.extend_from_slice(&target_ip);
    frame
}

#[test]
fn rx_queue_refuses_when_full() {
    let (wlan, _alloc, device) = setup(1);
    let releases = Arc::new(AtomicUsize::new(0));

    wlan.input(device.netif(), rx_pbuf(&wlan, &ipv4_frame(), &releases));
    wlan.input(device.netif(), rx_pbuf(&wlan, &ipv4_frame(), &releases));

    // Second frame handed back by the queue and released by the glue.
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(wlan.stats().get(LinkStat::Drop), 1);
}

#[test]
fn rx_queue_input_returns_buffer() {
    let queue = RxQueue::new(0);
    let netif = Netif::new(Arc::new(RxQueue::new(0)));

    let frame = HeapAllocator::default()
        .alloc(PbufLayer::Raw, 5, PbufType::Ram)
        .unwrap();
    let rejected = crate::netif::NetifInput::input(&queue, frame, &netif).unwrap_err();
    assert_eq!(rejected.err, Error::Buf);
    assert!(rejected.pbuf.is_some());
    assert!(queue.is_empty());
}

#[test]
fn receive_token_yields_frame_and_releases_it() {
    let (wlan, _alloc, mut device) = setup(4);
    let releases = Arc::new(AtomicUsize::new(0));
    let frame = ipv4_frame();

    wlan.input(device.netif(), rx_pbuf(&wlan, &frame, &releases));
    let (rx, _tx) = device.receive(Instant::from_millis(0)).unwrap();
    let seen = rx.consume(|buf| buf.to_vec());

    assert_eq!(seen, frame);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(device.receive(Instant::from_millis(0)).is_none());
}

#[test]
fn transmit_token_reaches_driver() {
    let (wlan, alloc, mut device) = setup(4);
    let before = alloc.heap_allocs();

    let tx = device.transmit(Instant::from_millis(0)).unwrap();
    tx.consume(60, |buf| buf.fill(0xAB));

    assert_eq!(alloc.heap_allocs(), before + 1);
    let driver = wlan.driver();
    assert_eq!(driver.sent().len(), 1);
    assert_eq!(driver.sent()[0].bytes, [0xAB; 60].to_vec());
    assert_eq!(wlan.stats().get(LinkStat::Xmit), 1);
}

#[test]
fn transmit_token_without_buffer_counts_drop() {
    let (wlan, _alloc, _device) = setup(4);
    let rx = Arc::new(RxQueue::new(4));
    let mut netif = Netif::new(rx.clone());
    wlan.init(Some(&mut netif), &MemSysParams::new()).unwrap();
    let mut device = WlanDevice::new(netif, rx, Arc::new(BudgetAllocator::new(0)), wlan.shared_stats());

    let tx = device.transmit(Instant::from_millis(0)).unwrap();
    let written = tx.consume(60, |buf| {
        buf.fill(0xCD);
        buf.len()
    });

    assert_eq!(written, 60);
    assert!(wlan.driver().sent().is_empty());
    assert_eq!(wlan.stats().get(LinkStat::MemErr), 1);
    assert_eq!(wlan.stats().get(LinkStat::Drop), 1);
    assert_eq!(wlan.stats().get(LinkStat::Xmit), 0);
}

#[test]
fn capabilities_follow_netif() {
    let (_wlan, _alloc, device) = setup(4);
    let caps = device.capabilities();

    assert_eq!(caps.medium, Medium::Ethernet);
    assert_eq!(caps.max_transmission_unit, 1514);
    assert_eq!(caps.max_burst_size, Some(1));
}

#[test]
fn stack_requires_hardware_address() {
    let alloc = Arc::new(HeapAllocator::default());
    let rx = Arc::new(RxQueue::new(4));
    // Never initialized: hwaddr_len is 0.
    let device = WlanDevice::new(Netif::new(rx.clone()), rx, alloc, Arc::new(LinkStats::new()));
    let cidr = Ipv4Cidr::new(Ipv4Address::new(10, 0, 2, 15), 24);

    assert!(WlanStack::new(device, cidr, None, Instant::from_millis(0)).is_none());
}

#[test]
fn stack_answers_arp_request() {
    let (wlan, _alloc, device) = setup(4);
    let cidr = Ipv4Cidr::new(Ipv4Address::new(10, 0, 2, 15), 24);
    let gateway = Ipv4Address::new(10, 0, 2, 2);
    let mut stack = WlanStack::new(device, cidr, Some(gateway), Instant::from_millis(0)).unwrap();
    let releases = Arc::new(AtomicUsize::new(0));

    let request = arp_request([10, 0, 2, 2], [10, 0, 2, 15]);
    wlan.input(stack.device().netif(), rx_pbuf(&wlan, &request, &releases));
    stack.poll(Instant::from_millis(10));

    assert_eq!(releases.load(Ordering::SeqCst), 1);
    let driver = wlan.driver();
    let reply = driver
        .sent()
        .iter()
        .find(|f| f.bytes.len() >= 42 && f.bytes[12..14] == [0x08, 0x06])
        .expect("no ARP frame transmitted");
    assert_eq!(&reply.bytes[0..6], &PEER_MAC);
    assert_eq!(&reply.bytes[6..12], &OUR_MAC);
    // op = reply, sender = us, target = requester
    assert_eq!(&reply.bytes[20..22], &[0x00, 0x02]);
    assert_eq!(&reply.bytes[28..32], &[10, 0, 2, 15]);
    assert_eq!(&reply.bytes[38..42], &[10, 0, 2, 2]);
}
