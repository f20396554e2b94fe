//! Per-field wire transcoding: scalar endian/reduced-length/variable-length
//! encoding and decoding (spec §4.4 "Appending a record" step 3, "Reading
//! a record"). List fields are dispatched to [`super::lists`].

use crate::error::{Error, Result};
use crate::ie::{DataType, InfoElement};
use crate::template::TemplateField;
use crate::value::FieldValue;
use nom::bytes::complete::take;
use nom::number::complete::{be_f32, be_f64, be_i8, be_u16, be_u32, be_u64, be_u8};
use nom::IResult;
use std::net::{Ipv4Addr, Ipv6Addr};

type NomResult<'a, T> = IResult<&'a [u8], T>;

/// Writes the RFC 7011 variable-length prefix (1 octet for lengths 0..254,
/// the 3-octet extended form `0xFF` + 2-octet length otherwise) followed
/// by `bytes`.
pub fn write_varlen(buf: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() < 255 {
        buf.push(bytes.len() as u8);
    } else {
        buf.push(0xFF);
        buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    }
    buf.extend_from_slice(bytes);
}

/// Reads an RFC 7011 variable-length prefix and the content it announces.
pub fn read_varlen(input: &[u8]) -> NomResult<&[u8]> {
    let (input, first) = be_u8(input)?;
    let (input, len) = if first == 0xFF {
        be_u16(input)?
    } else {
        (input, first as u16)
    };
    take(len as usize)(input)
}

fn to_malformed(context: &str, sample: &[u8]) -> Error {
    Error::MalformedMessage {
        context: context.to_string(),
        sample: sample.iter().take(16).copied().collect(),
    }
}

/// Encodes one scalar (non-list) value at `field.len` octets, truncating
/// or widening numeric types for reduced-length encoding. `value` is
/// `None` when the external field has no matching internal field (spec
/// §4.4 step 3 "absent -> zero bytes").
pub fn encode_scalar(buf: &mut Vec<u8>, field: &TemplateField, value: Option<&FieldValue>) -> Result<()> {
    let Some(value) = value else {
        if field.is_varlen() {
            write_varlen(buf, &[]);
        } else {
            buf.resize(buf.len() + field.len as usize, 0);
        }
        return Ok(());
    };
    encode_value(buf, field.canon.data_type, field.len, value)
}

pub(crate) fn encode_value(buf: &mut Vec<u8>, dt: DataType, len: u16, value: &FieldValue) -> Result<()> {
    match (dt, value) {
        (DataType::Uint8, FieldValue::Uint(v)) => buf.push(*v as u8),
        (DataType::Bool, FieldValue::Bool(v)) => buf.push(if *v { 1 } else { 0 }),
        (DataType::Uint16 | DataType::Uint32 | DataType::Uint64, FieldValue::Uint(v)) => {
            encode_uint(buf, *v, len)
        }
        (DataType::Int8, FieldValue::Int(v)) => buf.push(*v as u8),
        (DataType::Int16 | DataType::Int32 | DataType::Int64, FieldValue::Int(v)) => {
            encode_uint(buf, *v as u64, len)
        }
        (DataType::Float32, FieldValue::Float32(v)) => buf.extend_from_slice(&v.to_be_bytes()),
        (DataType::Float64, FieldValue::Float64(v)) if len == 8 => {
            buf.extend_from_slice(&v.to_be_bytes())
        }
        (DataType::Float64, FieldValue::Float64(v)) if len == 4 => {
            buf.extend_from_slice(&(*v as f32).to_be_bytes())
        }
        (DataType::MacAddr, FieldValue::Mac(m)) => buf.extend_from_slice(m),
        (DataType::Ipv4Addr, FieldValue::Ipv4(addr)) => buf.extend_from_slice(&addr.octets()),
        (DataType::Ipv6Addr, FieldValue::Ipv6(addr)) => buf.extend_from_slice(&addr.octets()),
        (DataType::DateSeconds, FieldValue::DateSeconds(v)) => {
            buf.extend_from_slice(&v.to_be_bytes())
        }
        (DataType::DateMilliseconds, FieldValue::DateMilliseconds(v))
        | (DataType::DateMicroseconds, FieldValue::DateMicroseconds(v))
        | (DataType::DateNanoseconds, FieldValue::DateNanoseconds(v)) => {
            buf.extend_from_slice(&v.to_be_bytes())
        }
        (DataType::String | DataType::OctetArray, FieldValue::String(s)) => {
            encode_bytes(buf, s.as_bytes(), len)
        }
        (DataType::String | DataType::OctetArray, FieldValue::OctetArray(bytes)) => {
            encode_bytes(buf, bytes, len)
        }
        (_, FieldValue::Absent) => {
            if len == crate::ie::VARLEN {
                write_varlen(buf, &[]);
            } else {
                buf.resize(buf.len() + len as usize, 0);
            }
        }
        _ => return Err(to_malformed("value does not match field data type", &[])),
    }
    Ok(())
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8], len: u16) {
    if len == crate::ie::VARLEN {
        write_varlen(buf, bytes);
    } else {
        let len = len as usize;
        if bytes.len() >= len {
            buf.extend_from_slice(&bytes[..len]);
        } else {
            buf.extend_from_slice(bytes);
            buf.resize(buf.len() + (len - bytes.len()), 0);
        }
    }
}

/// Writes the low `len` octets of `v`, big-endian (reduced-length
/// encoding truncates; `len` greater than the natural width is not
/// produced by a validated template, but is zero-extended defensively).
fn encode_uint(buf: &mut Vec<u8>, v: u64, len: u16) {
    let full = v.to_be_bytes();
    let len = len as usize;
    if len >= 8 {
        buf.resize(buf.len() + (len - 8), 0);
        buf.extend_from_slice(&full);
    } else {
        buf.extend_from_slice(&full[8 - len..]);
    }
}

fn decode_uint(input: &[u8], len: u16) -> NomResult<u64> {
    let (input, bytes) = take(len as usize)(input)?;
    let mut acc = 0u64;
    for b in bytes {
        acc = (acc << 8) | *b as u64;
    }
    Ok((input, acc))
}

/// Decodes one scalar (non-list) value described by `field`.
pub fn decode_scalar<'a>(input: &'a [u8], field: &TemplateField) -> Result<(&'a [u8], FieldValue)> {
    decode_value(input, field.canon.as_ref(), field.len)
        .map_err(|_| to_malformed(&format!("truncated field {}", field.canon.name), input))
}

pub(crate) fn decode_value<'a>(input: &'a [u8], ie: &InfoElement, len: u16) -> NomResult<'a, FieldValue> {
    match ie.data_type {
        DataType::Uint8 => {
            let (i, v) = be_u8(input)?;
            Ok((i, FieldValue::Uint(v as u64)))
        }
        DataType::Bool => {
            let (i, v) = be_u8(input)?;
            Ok((i, FieldValue::Bool(v != 0)))
        }
        DataType::Uint16 | DataType::Uint32 | DataType::Uint64 => {
            let (i, v) = decode_uint(input, len)?;
            Ok((i, FieldValue::Uint(v)))
        }
        DataType::Int8 => {
            let (i, v) = be_i8(input)?;
            Ok((i, FieldValue::Int(v as i64)))
        }
        DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let (i, v) = decode_uint(input, len)?;
            let shift = 64 - (len as u32 * 8);
            let signed = ((v << shift) as i64) >> shift;
            Ok((i, FieldValue::Int(signed)))
        }
        DataType::Float32 => {
            let (i, v) = be_f32(input)?;
            Ok((i, FieldValue::Float32(v)))
        }
        DataType::Float64 if len == 8 => {
            let (i, v) = be_f64(input)?;
            Ok((i, FieldValue::Float64(v)))
        }
        DataType::Float64 => {
            let (i, v) = be_f32(input)?;
            Ok((i, FieldValue::Float64(v as f64)))
        }
        DataType::MacAddr => {
            let (i, bytes) = take(6usize)(input)?;
            let mut mac = [0u8; 6];
            mac.copy_from_slice(bytes);
            Ok((i, FieldValue::Mac(mac)))
        }
        DataType::Ipv4Addr => {
            let (i, v) = be_u32(input)?;
            Ok((i, FieldValue::Ipv4(Ipv4Addr::from(v))))
        }
        DataType::Ipv6Addr => {
            let (i, v) = nom::number::complete::be_u128(input)?;
            Ok((i, FieldValue::Ipv6(Ipv6Addr::from(v))))
        }
        DataType::DateSeconds => {
            let (i, v) = be_u32(input)?;
            Ok((i, FieldValue::DateSeconds(v)))
        }
        DataType::DateMilliseconds => {
            let (i, v) = be_u64(input)?;
            Ok((i, FieldValue::DateMilliseconds(v)))
        }
        DataType::DateMicroseconds => {
            let (i, v) = be_u64(input)?;
            Ok((i, FieldValue::DateMicroseconds(v)))
        }
        DataType::DateNanoseconds => {
            let (i, v) = be_u64(input)?;
            Ok((i, FieldValue::DateNanoseconds(v)))
        }
        DataType::String => {
            let (i, bytes) = read_fixed_or_varlen(input, len)?;
            Ok((i, FieldValue::String(String::from_utf8_lossy(bytes).into_owned())))
        }
        DataType::OctetArray => {
            let (i, bytes) = read_fixed_or_varlen(input, len)?;
            Ok((i, FieldValue::OctetArray(bytes.to_vec())))
        }
        DataType::BasicList | DataType::SubTemplateList | DataType::SubTemplateMultiList => {
            unreachable!("list fields are decoded by super::lists")
        }
    }
}

pub(crate) fn read_fixed_or_varlen(input: &[u8], len: u16) -> NomResult<&[u8]> {
    if len == crate::ie::VARLEN {
        read_varlen(input)
    } else {
        take(len as usize)(input)
    }
}
