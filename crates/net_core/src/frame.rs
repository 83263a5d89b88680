//! Length framing for envelope messages on a byte stream.
//!
//! Format (little-endian):
//! - 4-byte magic `GSF1`
//! - u32 LEN (bytes of payload)
//! - [u8; LEN] payload (a JSON envelope message)
//!
//! Multiplexed streams delimit messages without peeking into payloads.

const FRAME_MAGIC: [u8; 4] = *b"GSF1";
const MAX_FRAME_LEN: usize = 1_048_576; // 1 MiB cap for safety

/// Append one framed message to `out`.
pub fn write_msg(out: &mut Vec<u8>, payload: &[u8]) {
    out.extend_from_slice(&FRAME_MAGIC);
    let len = u32::try_from(payload.len()).unwrap_or(0);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
}

/// Read one framed message from the front of `inp`, advancing it past the
/// frame. The returned slice borrows from the original buffer.
pub fn read_msg<'a>(inp: &mut &'a [u8]) -> anyhow::Result<&'a [u8]> {
    use anyhow::bail;
    if inp.len() < 8 {
        bail!("short frame header");
    }
    if inp[0..4] != FRAME_MAGIC {
        bail!("bad frame magic");
    }
    let mut lenb = [0u8; 4];
    lenb.copy_from_slice(&inp[4..8]);
    let len = u32::from_le_bytes(lenb) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame too large: {len} > {MAX_FRAME_LEN}");
    }
    if inp.len() < 8 + len {
        bail!("short frame payload");
    }
    let payload = &inp[8..8 + len];
    *inp = &inp[8 + len..];
    Ok(payload)
}
