#![allow(dead_code)] // Some variants are reserved for adapter-level failures

//! Unified error types for the SonoProbe firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the dispatcher's first-failure-aborts fold
//! uniform.  All variants are `Copy` so they can be passed between the
//! session tasks without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command batch could not be decoded.
    Decode(DecodeError),
    /// A decoded command could not be dispatched.
    Dispatch(DispatchError),
    /// The SPI link to the acquisition fabric failed.
    Bus(BusError),
    /// The UDP link to the controlling host failed.
    Net(NetError),
    /// No pool slot could be claimed during a streaming transfer.
    SlotExhausted,
    /// The fabric data-ready interrupt did not arrive in time.
    ReadyTimeout,
    /// A verified register write read back a different value.
    VerifyMismatch {
        addr: u16,
        expected: u32,
        read: u32,
    },
    /// Peripheral or subsystem initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Net(e) => write!(f, "net: {e}"),
            Self::SlotExhausted => write!(f, "buffer pool exhausted"),
            Self::ReadyTimeout => write!(f, "timed out waiting for data-ready"),
            Self::VerifyMismatch {
                addr,
                expected,
                read,
            } => write!(
                f,
                "register 0x{addr:04X}: wrote 0x{expected:08X}, read back 0x{read:08X}"
            ),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The command count is zero or exceeds the batch capacity.
    InvalidCount,
    /// A command id byte does not map to a known command.
    InvalidId,
    /// An entry extends past the end of the datagram.
    Truncated,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCount => write!(f, "invalid command count"),
            Self::InvalidId => write!(f, "unknown command id"),
            Self::Truncated => write!(f, "batch truncated"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The args slice is shorter than the command's minimum.
    InvalidArgument,
    /// No handler is bound to the command id.
    UnknownCommand,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::UnknownCommand => write!(f, "unknown command"),
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Byte-transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The transfer could not be started or failed mid-flight.
    TransferFailed,
    /// A transfer is already in flight.
    Busy,
    /// Completion was awaited with no transfer in flight.
    NotStarted,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransferFailed => write!(f, "transfer failed"),
            Self::Busy => write!(f, "transfer already in flight"),
            Self::NotStarted => write!(f, "no transfer in flight"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Network-transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    SendFailed,
    ReceiveFailed,
    /// The socket is not bound, or no peer is known to reply to.
    NotBound,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed => write!(f, "send failed"),
            Self::ReceiveFailed => write!(f, "receive failed"),
            Self::NotBound => write!(f, "socket not bound"),
        }
    }
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
