//! Binary command-batch codec.
//!
//! Wire format (all integers little-endian):
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ count (u16)  │ count × [ id (u8) │ len (u16) │ args (len B) ]│
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Decoding is all-or-nothing: the first invalid field abandons the whole
//! batch and no partial result is surfaced.  Args are zero-copy windows into
//! the source buffer.  Per-command minimum lengths are *not* checked here —
//! that contract belongs to the dispatcher.

use log::warn;

use super::command::{Command, CommandBatch, CommandId};
use crate::config::MAX_COMMANDS;
use crate::error::DecodeError;

/// Decode one datagram payload into a command batch.
pub fn decode(buffer: &[u8]) -> Result<CommandBatch<'_>, DecodeError> {
    if buffer.len() < 2 {
        return Err(DecodeError::Truncated);
    }

    let count = u16::from_le_bytes([buffer[0], buffer[1]]) as usize;
    if count == 0 || count > MAX_COMMANDS {
        warn!("{count} is an invalid command count (1 - {MAX_COMMANDS})");
        return Err(DecodeError::InvalidCount);
    }

    let mut batch = CommandBatch::with_capacity(count);
    let mut index = 2;

    for _ in 0..count {
        if buffer.len() < index + 3 {
            return Err(DecodeError::Truncated);
        }

        let Some(id) = CommandId::from_u8(buffer[index]) else {
            warn!(
                "{} is an invalid command id, max. valid is {}",
                buffer[index],
                CommandId::COUNT - 1
            );
            return Err(DecodeError::InvalidId);
        };

        let length = u16::from_le_bytes([buffer[index + 1], buffer[index + 2]]) as usize;
        index += 3;

        if buffer.len() < index + length {
            return Err(DecodeError::Truncated);
        }

        batch.push(Command {
            id,
            args: &buffer[index..index + length],
        });
        index += length;
    }

    Ok(batch)
}

/// Encode commands into the batch wire format.
///
/// Inverse of [`decode`]; used by host-side tooling and tests.  Each args
/// slice must fit a u16 length field.
pub fn encode(commands: &[Command<'_>]) -> Result<Vec<u8>, DecodeError> {
    if commands.is_empty() || commands.len() > MAX_COMMANDS {
        return Err(DecodeError::InvalidCount);
    }

    let total: usize = 2 + commands.iter().map(|c| 3 + c.args.len()).sum::<usize>();
    let mut out = Vec::with_capacity(total);

    out.extend_from_slice(&(commands.len() as u16).to_le_bytes());
    for command in commands {
        out.push(command.id as u8);
        out.extend_from_slice(&(command.args.len() as u16).to_le_bytes());
        out.extend_from_slice(command.args);
    }

    Ok(out)
}
