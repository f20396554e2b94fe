//! The crate's closed error set (spec §7).

use std::fmt;

/// Errors surfaced by the IPFIX codec.
///
/// The variant set is closed: every failure mode the core can produce is
/// named here, each carrying enough context (template ids, offsets, byte
/// samples) to diagnose the failure without re-running the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A template lookup (internal or external) found nothing for the id.
    TemplateNotFound { template_id: u16 },
    /// The internal or external template table has no free id left to
    /// auto-assign.
    TemplateFull,
    /// A mutator was called on a template already sealed into a Session.
    TemplateImmutable,
    /// A fixed-length field was appended with a length the element's data
    /// type does not allow under reduced-length encoding rules.
    LaxSize { field: String, len: u16 },
    /// No room to append the record, or no record left in the current
    /// message, with automatic-next-message mode disabled.
    EndOfMessage,
    /// The transport has no further messages.
    EndOfStream,
    /// The message or set framing is malformed: bad version, inconsistent
    /// length, truncated set, or a field length invalid for its type.
    MalformedMessage { context: String, sample: Vec<u8> },
    /// Disconnected-read mode: the caller's buffer holds less than a full
    /// message. `needed` is the number of additional octets required.
    BufferTooSmall { needed: usize },
    /// The underlying transport failed.
    IoError { message: String },
    /// A non-blocking/interruptible read produced nothing.
    NoDataReady,
    /// A write failed because the remote end closed the connection.
    PeerClosed,
    /// A build-time operation referenced an element absent from the model.
    UnknownElement { pen: u32, id: u16 },
    /// Transport setup failed.
    ConnectionFailed { message: String },
    /// Mis-ordered API use, e.g. an unnamed `TemplateInfo` on an external
    /// template add, or switching domains mid-message.
    SetupError { message: String },
    /// Reserved for functionality not yet implemented by this crate.
    NotImplemented { what: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TemplateNotFound { template_id } => {
                write!(f, "template {template_id} not found")
            }
            Error::TemplateFull => write!(f, "no free template id to auto-assign"),
            Error::TemplateImmutable => {
                write!(f, "template is sealed and cannot be mutated")
            }
            Error::LaxSize { field, len } => {
                write!(f, "length {len} is not valid for field {field}")
            }
            Error::EndOfMessage => write!(f, "end of message"),
            Error::EndOfStream => write!(f, "end of stream"),
            Error::MalformedMessage { context, sample } => {
                write!(
                    f,
                    "malformed message: {context} (sample: {})",
                    hex_sample(sample)
                )
            }
            Error::BufferTooSmall { needed } => {
                write!(f, "buffer too small, need {needed} more bytes")
            }
            Error::IoError { message } => write!(f, "io error: {message}"),
            Error::NoDataReady => write!(f, "no data ready"),
            Error::PeerClosed => write!(f, "peer closed the connection"),
            Error::UnknownElement { pen, id } => {
                write!(f, "unknown element (pen={pen}, id={id})")
            }
            Error::ConnectionFailed { message } => {
                write!(f, "connection failed: {message}")
            }
            Error::SetupError { message } => write!(f, "setup error: {message}"),
            Error::NotImplemented { what } => write!(f, "not implemented: {what}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::EndOfStream,
            std::io::ErrorKind::WouldBlock => Error::NoDataReady,
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe => {
                Error::PeerClosed
            }
            _ => Error::IoError {
                message: e.to_string(),
            },
        }
    }
}

fn hex_sample(sample: &[u8]) -> String {
    sample.iter().map(|b| format!("{b:02x}")).collect()
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
