//! gRPC-Web length-prefixed framing.
//!
//! Every frame is `flag (1 byte) | length (u32, big-endian) | payload`. Flag
//! `0x00` marks a data frame, flag `0x80` a trailer frame carrying
//! `grpc-status` / `grpc-message` as HTTP/1 header lines.

use bytes::{BufMut, Bytes, BytesMut};
use tsb_core::{errors::Error, Result};

pub const HEADER_LEN: usize = 5;
pub const DATA_FRAME: u8 = 0x00;
pub const TRAILER_FLAG: u8 = 0x80;

/// How to treat response bodies that do not hold a complete data frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameMode {
    /// Short or unframed bodies are decode errors.
    #[default]
    Strict,
    /// Pass through what is there: unframed bodies as-is, a truncated
    /// payload as the bytes after the header.
    Lenient,
}

/// Status carried by a trailer frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrpcStatus {
    pub code: u32,
    pub message: String,
}

pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(DATA_FRAME);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Extract the leading data frame of a response body.
///
/// A non-zero `grpc-status` in a trailer frame is returned as an error.
/// A trailers-only body with status 0 yields an empty message.
pub fn decode_frame(body: &[u8], mode: FrameMode) -> Result<Bytes> {
    let Some((flag, declared)) = read_header(body) else {
        return match mode {
            FrameMode::Strict => Err(Error::Decode(format!(
                "response of {} bytes is shorter than a frame header",
                body.len()
            ))),
            FrameMode::Lenient => Ok(Bytes::copy_from_slice(body)),
        };
    };

    if flag & TRAILER_FLAG != 0 {
        let trailers = &body[HEADER_LEN..body.len().min(HEADER_LEN + declared)];
        check_status(parse_trailers(trailers))?;
        return Ok(Bytes::new());
    }

    if flag != DATA_FRAME {
        return match mode {
            FrameMode::Strict => Err(Error::Decode(format!(
                "unsupported frame flag {flag:#04x}"
            ))),
            FrameMode::Lenient => Ok(Bytes::copy_from_slice(body)),
        };
    }

    let end = HEADER_LEN + declared;
    if body.len() < end {
        return match mode {
            FrameMode::Strict => Err(Error::Decode(format!(
                "frame declares {declared} bytes but only {} arrived",
                body.len() - HEADER_LEN
            ))),
            FrameMode::Lenient => Ok(Bytes::copy_from_slice(&body[HEADER_LEN..])),
        };
    }

    let message = Bytes::copy_from_slice(&body[HEADER_LEN..end]);
    if let Some((next_flag, len)) = read_header(&body[end..]) {
        if next_flag & TRAILER_FLAG != 0 {
            let start = end + HEADER_LEN;
            let trailers = &body[start..body.len().min(start + len)];
            check_status(parse_trailers(trailers))?;
        }
    }
    Ok(message)
}

fn read_header(body: &[u8]) -> Option<(u8, usize)> {
    if body.len() < HEADER_LEN {
        return None;
    }
    let len = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
    Some((body[0], len))
}

/// Parse `grpc-status` / `grpc-message` out of a trailer frame payload.
pub fn parse_trailers(payload: &[u8]) -> Option<GrpcStatus> {
    let text = String::from_utf8_lossy(payload);
    let mut code = None;
    let mut message = String::new();
    for line in text.split("\r\n").flat_map(|l| l.split('\n')) {
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        match k.trim().to_ascii_lowercase().as_str() {
            "grpc-status" => code = v.trim().parse::<u32>().ok(),
            "grpc-message" => message = v.trim().to_string(),
            _ => {}
        }
    }
    code.map(|code| GrpcStatus { code, message })
}

fn check_status(status: Option<GrpcStatus>) -> Result<()> {
    match status {
        Some(s) if s.code != 0 => Err(Error::External(format!(
            "grpc-status {}: {}",
            s.code, s.message
        ))),
        _ => Ok(()),
    }
}
