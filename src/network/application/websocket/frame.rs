//! RFC 6455 frame layout.
//!
//! ```text
//!  0               1               2               3
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |         (16/64, optional)     |
//! |N|V|V|V|       |S|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Masking-key (0 or 4 bytes, present when MASK is set)      |
//! +---------------------------------------------------------------+
//! |                         Payload Data                          |
//! +---------------------------------------------------------------+
//! ```
//!
//! Outgoing frames are always final and masked, with at most a 16-bit length.
//! Incoming frames may use any length form.

use crate::network::error::Error;
use heapless::Vec;

pub const FIN: u8 = 0x80;
pub const MASK: u8 = 0x80;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// Largest payload [`encode_header`] accepts.
pub const MAX_SEND_LEN: usize = u16::MAX as usize;

/// Longest possible client frame header: 2 + 2 length + 4 mask.
pub const MAX_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x0F {
            0x0 => Some(Opcode::Continuation),
            0x1 => Some(Opcode::Text),
            0x2 => Some(Opcode::Binary),
            0x8 => Some(Opcode::Close),
            0x9 => Some(Opcode::Ping),
            0xA => Some(Opcode::Pong),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: Opcode,
    pub mask: Option<[u8; 4]>,
    pub length: u64,
}

/// Build the header of a final, masked frame.
pub fn encode_header(opcode: Opcode, length: usize, mask: [u8; 4]) -> Result<Vec<u8, MAX_HEADER_LEN>, Error> {
    let mut header = Vec::new();
    let mut put = |b: u8| header.push(b).map_err(|_| Error::CapacityExceeded);

    put(FIN | opcode.bits())?;
    if length > MAX_SEND_LEN {
        return Err(Error::CapacityExceeded);
    } else if length > 125 {
        put(MASK | LEN_16)?;
        put((length >> 8) as u8)?;
        put((length & 0xFF) as u8)?;
    } else {
        put(MASK | length as u8)?;
    }
    for b in mask {
        put(b)?;
    }
    Ok(header)
}

/// XOR `data` with the mask key. `offset` is the position of `data[0]`
/// within the payload, so a payload can be masked in chunks.
pub fn apply_mask(data: &mut [u8], mask: [u8; 4], offset: usize) {
    for (i, b) in data.iter_mut().enumerate() {
        *b ^= mask[(offset + i) % 4];
    }
}

/// Parse a frame header from a byte source.
pub fn read_header<F>(mut next: F) -> Result<FrameHeader, Error>
where
    F: FnMut() -> Result<u8, Error>,
{
    let first = next()?;
    let opcode = Opcode::from_bits(first).ok_or(Error::ProtocolError)?;
    let second = next()?;

    let length = match second & !MASK {
        LEN_16 => ((next()? as u64) << 8) | next()? as u64,
        LEN_64 => {
            let mut length = 0u64;
            for _ in 0..8 {
                length = (length << 8) | next()? as u64;
            }
            length
        }
        short => short as u64,
    };

    let mask = if second & MASK != 0 {
        Some([next()?, next()?, next()?, next()?])
    } else {
        None
    };

    Ok(FrameHeader {
        fin: first & FIN != 0,
        opcode,
        mask,
        length,
    })
}

/// Encode a complete final, masked frame into `out`.
pub fn encode<const N: usize>(opcode: Opcode, payload: &[u8], mask: [u8; 4], out: &mut Vec<u8, N>) -> Result<(), Error> {
    let header = encode_header(opcode, payload.len(), mask)?;
    out.extend_from_slice(&header).map_err(|_| Error::CapacityExceeded)?;
    let start = out.len();
    out.extend_from_slice(payload).map_err(|_| Error::CapacityExceeded)?;
    apply_mask(&mut out[start..], mask, 0);
    Ok(())
}

/// Decode one complete frame from `input`, unmasking its payload into `out`.
///
/// Returns the header and the number of bytes consumed.
pub fn decode<const N: usize>(input: &[u8], out: &mut Vec<u8, N>) -> Result<(FrameHeader, usize), Error> {
    let mut pos = 0;
    let header = read_header(|| {
        let b = *input.get(pos).ok_or(Error::ProtocolError)?;
        pos += 1;
        Ok(b)
    })?;

    let len = usize::try_from(header.length).map_err(|_| Error::CapacityExceeded)?;
    let payload = input.get(pos..pos + len).ok_or(Error::ProtocolError)?;
    let start = out.len();
    out.extend_from_slice(payload).map_err(|_| Error::CapacityExceeded)?;
    if let Some(mask) = header.mask {
        apply_mask(&mut out[start..], mask, 0);
    }
    Ok((header, pos + len))
}
