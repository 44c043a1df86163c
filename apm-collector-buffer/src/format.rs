//! The segment buffer stores records back to back, each behind its own length prefix.
//! There is no file header and no separator between records.
//!
//! ```ignore
//! +--------~--------+--------~--------+--------~--------+-------~-------+
//! | len of payload  |     payload     | len of payload  |    payload    | ...
//! +--------~--------+--------~--------+--------~--------+-------~-------+
//! ```
//!
//! The length is an unsigned LEB128 varint: 7 bits per byte, least significant group first,
//! the high bit set on every byte but the last. A payload of 300 bytes is thus prefixed by
//! `0xAC 0x02`.
//!
//! A frame is either complete or truncated; a truncated frame at the tail of a file means
//! the writer has not finished it (or crashed in the middle of it).

use thiserror::Error;

/// A u64 needs at most 10 groups of 7 bits.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErr {
    #[error("Varint is longer than {MAX_VARINT_LEN} bytes")]
    VarintOverflow,
    #[error("Not Enough Bytes: the record might be truncated.")]
    NotEnoughBytes,
}

/// Number of bytes `value` takes as a varint.
pub fn varint_size(mut value: u64) -> usize {
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Returns the value and the number of bytes consumed.
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize), FormatErr> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(FormatErr::VarintOverflow);
        }
        let group = (byte & 0x7F) as u64;
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(FormatErr::VarintOverflow);
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() >= MAX_VARINT_LEN {
        Err(FormatErr::VarintOverflow)
    } else {
        Err(FormatErr::NotEnoughBytes)
    }
}

/// Size of a record on disk, prefix included.
pub fn frame_size(payload_len: usize) -> usize {
    varint_size(payload_len as u64) + payload_len
}

/// Prefix `payload` with its length.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(frame_size(payload.len()));
    encode_varint(payload.len() as u64, &mut buf);
    buf.extend_from_slice(payload);
    buf
}

/// Parse the frame at the start of `bytes`. Returns the payload and the size of the whole
/// frame.
pub fn read_frame(bytes: &[u8]) -> Result<(&[u8], usize), FormatErr> {
    let (len, prefix) = decode_varint(bytes)?;
    let len = usize::try_from(len).map_err(|_| FormatErr::VarintOverflow)?;
    let end = prefix.checked_add(len).ok_or(FormatErr::VarintOverflow)?;
    if bytes.len() < end {
        return Err(FormatErr::NotEnoughBytes);
    }
    Ok((&bytes[prefix..end], end))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_varint() {
        for (value, encoded) in [
            (0u64, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (300, vec![0xAC, 0x02]),
            (16_384, vec![0x80, 0x80, 0x01]),
        ] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            assert_eq!(buf, encoded);
            assert_eq!(varint_size(value), encoded.len());
            assert_eq!(decode_varint(&encoded), Ok((value, encoded.len())));
        }

        let mut buf = Vec::new();
        encode_varint(u64::MAX, &mut buf);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(decode_varint(&buf), Ok((u64::MAX, MAX_VARINT_LEN)));

        assert_eq!(decode_varint(&[0x80, 0x80]), Err(FormatErr::NotEnoughBytes));
        assert_eq!(decode_varint(&[0xFF; 11]), Err(FormatErr::VarintOverflow));
    }

    #[test]
    fn test_frame() {
        let payload = vec![7u8; 300];
        let mut bytes = frame(&payload);
        assert_eq!(bytes.len(), 302);
        assert_eq!(frame_size(300), 302);
        bytes.extend_from_slice(&frame(b"hi"));

        let (first, size) = read_frame(&bytes).unwrap();
        assert_eq!(first, payload.as_slice());
        assert_eq!(size, 302);
        let (second, size) = read_frame(&bytes[302..]).unwrap();
        assert_eq!(second, b"hi");
        assert_eq!(size, 3);

        // torn tail
        assert_eq!(
            read_frame(&bytes[302..304]),
            Err(FormatErr::NotEnoughBytes)
        );
        assert_eq!(read_frame(&[]), Err(FormatErr::NotEnoughBytes));
    }
}
