//! Typed commands and the per-datagram batch container.

// ---------------------------------------------------------------------------
// Command identity
// ---------------------------------------------------------------------------

/// Closed enumeration of every command the probe understands.
///
/// The discriminants are the wire ids — do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    /// Reply with the probe identity string.
    Ping = 0,
    /// Latch the reply-enable flag.
    EnableReplies = 1,
    /// Route the shared SPI bus to one of the front-end chips.
    SelectMux = 2,
    /// Raw SPI transfer of the args bytes.
    WriteBus = 3,
    /// Verified write to a controller-fabric register.
    WriteFabric = 4,
    /// Write to an analog-front-end register (plain or TGC space).
    WriteFrontEnd = 5,
    /// Write to a transmit-driver register.
    WriteTxDriver = 6,
    /// Busy delay in nanoseconds.
    DelayNs = 7,
    /// Sleep in milliseconds.
    SleepMs = 8,
    /// Switch one power domain on or off.
    SetPowerDomain = 9,
    /// Run the shot-acquisition loop.
    TriggerShot = 10,
}

impl CommandId {
    /// Total number of commands — ids at or above this are invalid.
    pub const COUNT: usize = 11;

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Ping),
            1 => Some(Self::EnableReplies),
            2 => Some(Self::SelectMux),
            3 => Some(Self::WriteBus),
            4 => Some(Self::WriteFabric),
            5 => Some(Self::WriteFrontEnd),
            6 => Some(Self::WriteTxDriver),
            7 => Some(Self::DelayNs),
            8 => Some(Self::SleepMs),
            9 => Some(Self::SetPowerDomain),
            10 => Some(Self::TriggerShot),
            _ => None,
        }
    }

    /// Fewest args bytes a well-formed command carries.
    ///
    /// Enforced by the dispatcher, not the codec.  `DelayNs` requires eight
    /// bytes even though its handler consumes four — the width is fixed by
    /// the host-side protocol table.
    pub const fn min_args_len(self) -> usize {
        match self {
            Self::Ping => 0,
            Self::EnableReplies | Self::SelectMux | Self::WriteBus => 1,
            Self::WriteFabric => 5,
            Self::WriteFrontEnd => 4,
            Self::WriteTxDriver => 6,
            Self::DelayNs => 8,
            Self::SleepMs => 4,
            Self::SetPowerDomain => 2,
            Self::TriggerShot => 6,
        }
    }
}

// ---------------------------------------------------------------------------
// Command and batch
// ---------------------------------------------------------------------------

/// One decoded command.
///
/// `args` is a window into the datagram the command was decoded from; it is
/// never copied and cannot outlive that buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub id: CommandId,
    pub args: &'a [u8],
}

/// Ordered command sequence decoded from a single datagram.
///
/// Insertion order is execution order.  A batch is rebuilt from scratch for
/// every datagram and is never persisted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommandBatch<'a> {
    commands: Vec<Command<'a>>,
}

impl<'a> CommandBatch<'a> {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            commands: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, command: Command<'a>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Command<'a>> {
        self.commands.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Command<'a>> {
        self.commands.iter()
    }
}

impl<'a, 'b> IntoIterator for &'b CommandBatch<'a> {
    type Item = &'b Command<'a>;
    type IntoIter = core::slice::Iter<'b, Command<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
