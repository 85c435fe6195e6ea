//! Demuxing for the engine's attached log streams.
//!
//! Containers without a TTY get their stdout/stderr multiplexed into
//! frames: an 8-byte header (stream type, three zero bytes, payload length
//! as a big-endian u32) followed by the payload.

const FRAME_HEADER_LEN: usize = 8;

/// Concatenate the payloads of a multiplexed log stream; plain text passes
/// through unchanged.
pub fn demux_log_stream(raw: &[u8]) -> String {
    if !looks_multiplexed(raw) {
        return String::from_utf8_lossy(raw).into_owned();
    }

    let mut text = String::new();
    let mut rest = raw;
    while rest.len() >= FRAME_HEADER_LEN {
        let length = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let end = (FRAME_HEADER_LEN + length).min(rest.len());
        text.push_str(&String::from_utf8_lossy(&rest[FRAME_HEADER_LEN..end]));
        rest = &rest[end..];
    }
    text
}

/// Frame headers start with the stream type (0..=2) and three zero bytes;
/// anything else is already plain text.
fn looks_multiplexed(raw: &[u8]) -> bool {
    raw.len() >= FRAME_HEADER_LEN && raw[0] <= 2 && raw[1] == 0 && raw[2] == 0 && raw[3] == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(stream: u8, payload: &str) -> Vec<u8> {
        let mut bytes = vec![stream, 0, 0, 0];
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(payload.as_bytes());
        bytes
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(demux_log_stream(b"hello world!\n"), "hello world!\n");
    }

    #[test]
    fn empty_input_yields_empty_text() {
        assert_eq!(demux_log_stream(b""), "");
    }

    #[test]
    fn multiplexed_frames_are_concatenated() {
        let mut raw = frame(1, "out: starting\n");
        raw.extend(frame(2, "err: warming up\n"));
        raw.extend(frame(1, "out: ready\n"));

        assert_eq!(
            demux_log_stream(&raw),
            "out: starting\nerr: warming up\nout: ready\n"
        );
    }

    #[test]
    fn truncated_final_frame_keeps_what_arrived() {
        let mut raw = frame(1, "complete\n");
        let mut cut = frame(1, "partial payload");
        cut.truncate(cut.len() - 8);
        raw.extend(cut);

        assert_eq!(demux_log_stream(&raw), "complete\npartial");
    }
}
