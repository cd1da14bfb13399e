//! Wire codec for control messages.
//!
//! OSC 1.0 message layout: NUL-terminated strings padded to 4 bytes, a
//! type tag string beginning with `,`, and big-endian argument payloads.
//! A datagram with no type tag string decodes as a message with no
//! arguments (legacy senders omit it).

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;

use vireo_events::{ControlMessage, ControlValue};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram ended unexpectedly")]
    UnexpectedEof,
    #[error("address must start with '/'")]
    BadAddress,
    #[error("type tag string must start with ','")]
    BadTypeTags,
    #[error("unsupported type tag '{0}'")]
    UnsupportedTag(char),
    #[error("string argument is not valid utf-8")]
    BadUtf8,
    #[error("blob length out of range")]
    BadBlobLength,
}

/// Encode a message into a datagram.
pub fn encode(msg: &ControlMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    write_padded_string(&mut buf, &msg.addr);

    let mut tags = String::with_capacity(msg.args.len() + 1);
    tags.push(',');
    for arg in &msg.args {
        tags.push(arg.type_tag());
    }
    write_padded_string(&mut buf, &tags);

    for arg in &msg.args {
        match arg {
            ControlValue::Int32(v) => buf.extend_from_slice(&v.to_be_bytes()),
            ControlValue::Int64(v) => buf.extend_from_slice(&v.to_be_bytes()),
            ControlValue::Float32(v) => buf.extend_from_slice(&v.to_be_bytes()),
            ControlValue::Float64(v) => buf.extend_from_slice(&v.to_be_bytes()),
            ControlValue::String(s) | ControlValue::Symbol(s) => write_padded_string(&mut buf, s),
            ControlValue::Blob(bytes) => {
                buf.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
                buf.extend_from_slice(bytes);
                pad(&mut buf);
            }
            // T, F and N carry no payload
            ControlValue::Bool(_) | ControlValue::Nil => {}
        }
    }
    buf
}

/// Decode a datagram into a message.
pub fn decode(buf: &[u8]) -> Result<ControlMessage, DecodeError> {
    let mut cur = Cursor::new(buf);

    let addr = read_padded_string(&mut cur)?;
    if !addr.starts_with('/') {
        return Err(DecodeError::BadAddress);
    }
    let mut msg = ControlMessage::new(addr);

    if cur.position() as usize >= buf.len() {
        return Ok(msg);
    }
    let tags = read_padded_string(&mut cur)?;
    if !tags.starts_with(',') {
        return Err(DecodeError::BadTypeTags);
    }

    for tag in tags.chars().skip(1) {
        let value = match tag {
            'i' => ControlValue::Int32(
                cur.read_i32::<BigEndian>()
                    .map_err(|_| DecodeError::UnexpectedEof)?,
            ),
            'h' => ControlValue::Int64(
                cur.read_i64::<BigEndian>()
                    .map_err(|_| DecodeError::UnexpectedEof)?,
            ),
            'f' => ControlValue::Float32(
                cur.read_f32::<BigEndian>()
                    .map_err(|_| DecodeError::UnexpectedEof)?,
            ),
            'd' => ControlValue::Float64(
                cur.read_f64::<BigEndian>()
                    .map_err(|_| DecodeError::UnexpectedEof)?,
            ),
            's' => ControlValue::String(read_padded_string(&mut cur)?),
            'S' => ControlValue::Symbol(read_padded_string(&mut cur)?),
            'b' => ControlValue::Blob(read_blob(&mut cur)?),
            'T' => ControlValue::Bool(true),
            'F' => ControlValue::Bool(false),
            'N' => ControlValue::Nil,
            other => return Err(DecodeError::UnsupportedTag(other)),
        };
        msg.args.push(value);
    }

    Ok(msg)
}

fn pad(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn write_padded_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    pad(buf);
}

fn read_padded_string(cur: &mut Cursor<&[u8]>) -> Result<String, DecodeError> {
    let buf = *cur.get_ref();
    let start = cur.position() as usize;
    if start >= buf.len() {
        return Err(DecodeError::UnexpectedEof);
    }
    let nul = buf[start..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::UnexpectedEof)?;
    let s = std::str::from_utf8(&buf[start..start + nul])
        .map_err(|_| DecodeError::BadUtf8)?
        .to_string();
    // Consume the terminator plus padding; tolerate a short final pad.
    let padded = (nul + 1 + 3) & !3;
    cur.set_position((start + padded).min(buf.len()) as u64);
    Ok(s)
}

fn read_blob(cur: &mut Cursor<&[u8]>) -> Result<Vec<u8>, DecodeError> {
    let len = cur
        .read_i32::<BigEndian>()
        .map_err(|_| DecodeError::UnexpectedEof)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::BadBlobLength)?;
    let buf = *cur.get_ref();
    let start = cur.position() as usize;
    if start + len > buf.len() {
        return Err(DecodeError::BadBlobLength);
    }
    let bytes = buf[start..start + len].to_vec();
    let padded = (len + 3) & !3;
    cur.set_position((start + padded).min(buf.len()) as u64);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_int_message() {
        // "/a\0\0" ",i\0\0" 5
        let buf = [b'/', b'a', 0, 0, b',', b'i', 0, 0, 0, 0, 0, 5];
        let msg = decode(&buf).unwrap();
        assert_eq!(msg.addr, "/a");
        assert_eq!(msg.args, vec![ControlValue::Int32(5)]);
    }

    #[test]
    fn test_decode_string_padding() {
        // "/s\0\0" ",s\0\0" "hey\0"
        let buf = [
            b'/', b's', 0, 0, b',', b's', 0, 0, b'h', b'e', b'y', 0,
        ];
        let msg = decode(&buf).unwrap();
        assert_eq!(msg.args, vec![ControlValue::String("hey".into())]);
    }

    #[test]
    fn test_decode_no_type_tags_means_no_args() {
        let buf = [b'/', b'a', 0, 0];
        let msg = decode(&buf).unwrap();
        assert_eq!(msg.addr, "/a");
        assert!(msg.args.is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_address() {
        let buf = [b'a', 0, 0, 0];
        assert_eq!(decode(&buf), Err(DecodeError::BadAddress));
    }

    #[test]
    fn test_decode_rejects_unsupported_tag() {
        let buf = [b'/', b'a', 0, 0, b',', b'q', 0, 0];
        assert_eq!(decode(&buf), Err(DecodeError::UnsupportedTag('q')));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let buf = [b'/', b'a', 0, 0, b',', b'i', 0, 0, 0, 0];
        assert_eq!(decode(&buf), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_roundtrip_mixed_args() {
        let msg = ControlMessage::new("/vireo/load")
            .with_arg(ControlValue::String("demo.lua".into()))
            .with_arg(ControlValue::Int32(42))
            .with_arg(ControlValue::Int64(1 << 40))
            .with_arg(ControlValue::Float32(3.5))
            .with_arg(ControlValue::Float64(2.25))
            .with_arg(ControlValue::Symbol("sym".into()))
            .with_arg(ControlValue::Bool(true))
            .with_arg(ControlValue::Bool(false))
            .with_arg(ControlValue::Nil)
            .with_arg(ControlValue::Blob(vec![1, 2, 3]));
        let decoded = decode(&encode(&msg)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_encode_is_4_byte_aligned() {
        let msg = ControlMessage::new("/x")
            .with_arg(ControlValue::String("odd".into()))
            .with_arg(ControlValue::Blob(vec![9]));
        assert_eq!(encode(&msg).len() % 4, 0);
    }
}
