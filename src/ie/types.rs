use serde::Serialize;

/// The IE data types named in spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    OctetArray,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    MacAddr,
    String,
    DateSeconds,
    DateMilliseconds,
    DateMicroseconds,
    DateNanoseconds,
    Ipv4Addr,
    Ipv6Addr,
    BasicList,
    SubTemplateList,
    SubTemplateMultiList,
}

impl DataType {
    /// True for the three RFC 6313 structured data types.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            DataType::BasicList | DataType::SubTemplateList | DataType::SubTemplateMultiList
        )
    }

    /// True for `string`/`octetArray`, the two types that may be encoded
    /// either fixed- or variable-length.
    pub fn is_varlen_capable(self) -> bool {
        matches!(self, DataType::String | DataType::OctetArray)
    }

    /// Validates a caller-chosen wire length against this type's
    /// field-length validation table (spec §4.2).
    pub fn validate_len(self, len: u16) -> bool {
        match self {
            DataType::Uint8 | DataType::Int8 | DataType::Bool => len == 1,
            DataType::Uint16 | DataType::Int16 => (1..=2).contains(&len),
            DataType::Uint32 | DataType::Int32 => (1..=4).contains(&len),
            DataType::Uint64 | DataType::Int64 => (1..=8).contains(&len),
            DataType::Float32 => len == 4,
            DataType::Float64 => len == 4 || len == 8,
            DataType::MacAddr => len == 6,
            DataType::Ipv4Addr | DataType::DateSeconds => len == 4,
            DataType::Ipv6Addr => len == 16,
            DataType::DateMilliseconds
            | DataType::DateMicroseconds
            | DataType::DateNanoseconds => len == 8,
            DataType::String | DataType::OctetArray => {
                len == crate::ie::VARLEN || (1..=65534).contains(&len)
            }
            DataType::BasicList | DataType::SubTemplateList | DataType::SubTemplateMultiList => {
                len == crate::ie::VARLEN
            }
        }
    }

    /// The natural (non-reduced) default length for this type, when one
    /// exists; `None` for the inherently variable types.
    pub fn natural_len(self) -> Option<u16> {
        match self {
            DataType::Uint8 | DataType::Int8 | DataType::Bool => Some(1),
            DataType::Uint16 | DataType::Int16 => Some(2),
            DataType::Uint32 | DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Uint64 | DataType::Int64 | DataType::Float64 => Some(8),
            DataType::MacAddr => Some(6),
            DataType::Ipv4Addr | DataType::DateSeconds => Some(4),
            DataType::Ipv6Addr => Some(16),
            DataType::DateMilliseconds
            | DataType::DateMicroseconds
            | DataType::DateNanoseconds => Some(8),
            DataType::String | DataType::OctetArray => None,
            DataType::BasicList | DataType::SubTemplateList | DataType::SubTemplateMultiList => {
                None
            }
        }
    }
}
