//! Wire protocol: typed commands and the binary batch codec.
//!
//! One inbound datagram carries one batch.  The codec turns the raw payload
//! into an ordered [`CommandBatch`](command::CommandBatch) of zero-copy
//! [`Command`](command::Command)s; the dispatcher in
//! [`app::service`](crate::app::service) executes them in order.

pub mod codec;
pub mod command;
