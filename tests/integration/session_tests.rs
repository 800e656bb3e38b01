//! Session flow control: single command in flight between the receiver and
//! the worker, and the drop-and-keep-listening path for bad datagrams.
//!
//! These tests run the real loops' building blocks on threads, with a
//! channel-fed network mock standing in for the UDP socket.  The shared
//! event log captures the interleaving so ordering can be asserted.

use core::net::SocketAddr;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use sonoprobe::adapters::spi::SimSpiBus;
use sonoprobe::app::ports::{BoardPort, DatagramPort, LinkMode, MuxTarget, PacerPort, PowerDomain};
use sonoprobe::app::service::ProbeService;
use sonoprobe::app::session::{SessionSignals, receiver_step, worker_step};
use sonoprobe::config::ProbeConfig;
use sonoprobe::error::{Error, NetError};

fn host_addr() -> SocketAddr {
    "192.0.2.9:50007".parse().unwrap()
}

type EventLog = Arc<Mutex<Vec<&'static str>>>;

// ── Thread-safe mocks ─────────────────────────────────────────

/// Network mock: datagrams arrive through a channel, sends go to the log.
struct ChannelNet {
    inbox: mpsc::Receiver<Vec<u8>>,
    log: EventLog,
}

impl DatagramPort for ChannelNet {
    fn send_to(&mut self, _data: &[u8], _dest: SocketAddr) -> Result<usize, NetError> {
        self.log.lock().unwrap().push("send");
        Ok(0)
    }

    fn receive_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), NetError> {
        let datagram = self.inbox.recv().map_err(|_| NetError::ReceiveFailed)?;
        self.log.lock().unwrap().push("recv");
        buf[..datagram.len()].copy_from_slice(&datagram);
        Ok((datagram.len(), host_addr()))
    }
}

/// Reply mock for the worker side; only the send path matters here.
struct LogNet {
    log: EventLog,
}

impl DatagramPort for LogNet {
    fn send_to(&mut self, _data: &[u8], _dest: SocketAddr) -> Result<usize, NetError> {
        self.log.lock().unwrap().push("send");
        Ok(0)
    }

    fn receive_from(&mut self, _buf: &mut [u8]) -> Result<(usize, SocketAddr), NetError> {
        Err(NetError::ReceiveFailed)
    }
}

struct NullBoard;

impl BoardPort for NullBoard {
    fn select_mux(&mut self, _target: MuxTarget) {}
    fn set_power_domain(&mut self, _domain: PowerDomain, _enabled: bool) {}
    fn pulse_fabric_reset(&mut self) {}
    fn set_link_mode(&mut self, _mode: LinkMode) -> Result<(), Error> {
        Ok(())
    }
    fn delay_ns(&mut self, _ns: u32) {}
    fn delay_ms(&mut self, _ms: u32) {}
    fn now_ms(&self) -> u64 {
        0
    }
}

struct NullPacer;

impl PacerPort for NullPacer {
    fn wait_ready(&mut self, _timeout_ms: u32) -> Result<(), Error> {
        Ok(())
    }
    fn shot_count(&self) -> u16 {
        0
    }
    fn reset(&mut self) {}
}

fn worker_service(log: EventLog) -> ProbeService<SimSpiBus, LogNet, NullBoard, NullPacer> {
    ProbeService::new(
        SimSpiBus::new(),
        LogNet { log },
        NullBoard,
        NullPacer,
        ProbeConfig::default(),
    )
}

fn ping_wire() -> Vec<u8> {
    vec![1, 0, 0, 0, 0]
}

// ── Tests ─────────────────────────────────────────────────────

#[test]
fn one_command_in_flight_at_a_time() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let signals: &'static SessionSignals = Box::leak(Box::new(SessionSignals::new()));

    let (tx, rx) = mpsc::channel();
    tx.send(ping_wire()).unwrap();
    tx.send(ping_wire()).unwrap();

    let receiver_log = log.clone();
    let receiver = std::thread::spawn(move || {
        let mut net = ChannelNet {
            inbox: rx,
            log: receiver_log,
        };
        for _ in 0..2 {
            receiver_step(&mut net, signals).unwrap();
        }
    });

    let worker_log = log.clone();
    let worker = std::thread::spawn(move || {
        let mut service = worker_service(worker_log);
        for _ in 0..2 {
            let frame = signals.wait_received();
            worker_step(&mut service, &frame).unwrap();
            signals.notify_executed();
        }
    });

    receiver.join().unwrap();
    worker.join().unwrap();

    // The receiver may not accept the second datagram before the first is
    // fully executed (the ping reply is the last step of execution).
    assert_eq!(*log.lock().unwrap(), vec!["recv", "send", "recv", "send"]);
}

#[test]
fn malformed_datagram_is_dropped_without_waking_the_worker() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let signals = SessionSignals::new();

    let (tx, rx) = mpsc::channel();
    // Invalid count of zero.
    tx.send(vec![0, 0, 0, 0, 0]).unwrap();

    let mut net = ChannelNet { inbox: rx, log };

    // Completes without blocking on "executed" — a dropped datagram never
    // enters the handshake.
    receiver_step(&mut net, &signals).unwrap();
    assert!(!signals.has_pending());
}

#[test]
fn worker_decodes_and_executes_the_frame_it_was_handed() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let signals = SessionSignals::new();

    let (tx, rx) = mpsc::channel();
    tx.send(ping_wire()).unwrap();

    let mut net = ChannelNet {
        inbox: rx,
        log: log.clone(),
    };

    // Unblock the receiver from the far side, as the worker loop would.
    let frame = std::thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let frame = signals.wait_received();
            signals.notify_executed();
            frame
        });
        receiver_step(&mut net, &signals).unwrap();
        handle.join().unwrap()
    });

    assert_eq!(frame.peer, host_addr());

    let mut service = worker_service(log.clone());
    worker_step(&mut service, &frame).unwrap();
    assert_eq!(service.peer(), Some(host_addr()));
    assert_eq!(*log.lock().unwrap(), vec!["recv", "send"]);
}
