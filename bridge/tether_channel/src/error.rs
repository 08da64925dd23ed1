use std::io;

use tether_ir::ModuleName;

/// Coarse classification of transport failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Peer closed, refused or reset the connection.
    Unreachable,
    /// No answer within the channel's timeout.
    Timeout,
    /// A frame could not be encoded or decoded.
    Codec,
    /// The peer answered with something other than what was asked for.
    Protocol,
    /// The peer raised an error while importing the module.
    Remote,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Unreachable => "unreachable",
            TransportKind::Timeout => "timeout",
            TransportKind::Codec => "codec",
            TransportKind::Protocol => "protocol",
            TransportKind::Remote => "remote error",
        }
    }
}

/// Why `import_module` failed.
///
/// `NotFound` is an answer; `Transport` means no usable answer arrived.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("module `{name}` not found on remote peer")]
    NotFound { name: ModuleName },
    #[error("{} failure: {message}", kind.as_str())]
    Transport {
        kind: TransportKind,
        message: String,
    },
}

impl ChannelError {
    #[cold]
    pub fn not_found(name: &ModuleName) -> Self {
        ChannelError::NotFound { name: name.clone() }
    }

    #[cold]
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        ChannelError::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChannelError::NotFound { .. })
    }

    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            ChannelError::NotFound { .. } => None,
            ChannelError::Transport { kind, .. } => Some(*kind),
        }
    }
}

impl From<io::Error> for ChannelError {
    #[cold]
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportKind::Timeout,
            io::ErrorKind::InvalidData => TransportKind::Codec,
            _ => TransportKind::Unreachable,
        };
        ChannelError::transport(kind, err.to_string())
    }
}

impl From<bincode::Error> for ChannelError {
    #[cold]
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => ChannelError::from(io),
            other => ChannelError::transport(TransportKind::Codec, other.to_string()),
        }
    }
}
