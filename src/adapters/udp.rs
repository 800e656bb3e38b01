//! UDP datagram adapter.
//!
//! Wraps the platform UDP socket (lwIP on the probe, the host stack in
//! tests) behind [`DatagramPort`].  Sends larger than one datagram are
//! transparently fragmented into sequential full-size chunks followed by a
//! remainder chunk; the receiving side reassembles by packet count.

use core::net::SocketAddr;
use std::net::UdpSocket;

use log::error;

use crate::app::ports::DatagramPort;
use crate::config::MAX_DATAGRAM_SIZE;
use crate::error::NetError;

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind on all interfaces at `port` (0 picks an ephemeral port).
    pub fn bind(port: u16) -> Result<Self, NetError> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).map_err(|e| {
            error!("UDP bind on port {port} failed: {e}");
            NetError::NotBound
        })?;
        Ok(Self { socket })
    }

    /// Second handle onto the same socket — the receiver task and the
    /// worker's reply path share one endpoint.
    pub fn try_clone(&self) -> Result<Self, NetError> {
        self.socket
            .try_clone()
            .map(|socket| Self { socket })
            .map_err(|e| {
                error!("UDP socket clone failed: {e}");
                NetError::NotBound
            })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.socket.local_addr().map_err(|_| NetError::NotBound)
    }
}

impl DatagramPort for UdpTransport {
    fn send_to(&mut self, data: &[u8], dest: SocketAddr) -> Result<usize, NetError> {
        let mut total = 0;
        for chunk in data.chunks(MAX_DATAGRAM_SIZE) {
            total += self.socket.send_to(chunk, dest).map_err(|e| {
                error!("UDP send to {dest} failed: {e}");
                NetError::SendFailed
            })?;
        }
        Ok(total)
    }

    fn receive_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), NetError> {
        self.socket.recv_from(buf).map_err(|e| {
            error!("UDP receive failed: {e}");
            NetError::ReceiveFailed
        })
    }
}
