//! Terminal escape-sequence stripping.
//!
//! Shell output is shown as plain text, so every control sequence a shell or
//! line editor emits (cursor movement, colors, window titles, charset
//! switches) is removed before display.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Remove terminal escape sequences from `buf` in place.
///
/// The buffer is treated as a NUL-terminated string: everything from the
/// first NUL byte on is dropped. Recognised sequences are removed and the
/// remaining bytes shift left. A sequence that is still open at the end of
/// the buffer is removed up to the end rather than guessing a terminator.
///
/// Stripping is idempotent: the output never contains an ESC byte.
pub fn strip_escape_codes(buf: &mut Vec<u8>) {
    if let Some(nul) = buf.iter().position(|&b| b == 0) {
        buf.truncate(nul);
    }

    let len = buf.len();
    let mut read = 0;
    let mut write = 0;

    while read < len {
        if buf[read] == ESC {
            read = sequence_end(buf, read);
            continue;
        }
        buf[write] = buf[read];
        write += 1;
        read += 1;
    }

    buf.truncate(write);
}

/// Return a stripped copy of `data`.
pub fn stripped(data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    strip_escape_codes(&mut buf);
    buf
}

/// Index just past the sequence whose ESC byte sits at `start`.
fn sequence_end(buf: &[u8], start: usize) -> usize {
    let len = buf.len();
    let Some(&kind) = buf.get(start + 1) else {
        return len;
    };

    match kind {
        // CSI: parameters and intermediates, then one final byte
        b'[' => {
            let mut i = start + 2;
            while i < len {
                match buf[i] {
                    0x40..=0x7e => return i + 1,
                    0x20..=0x3f => i += 1,
                    // Malformed; keep the offending byte as text
                    _ => return i,
                }
            }
            len
        }
        // OSC may end with BEL as well as ST
        b']' => string_end(buf, start + 2, true),
        // DCS, SOS, PM, APC
        b'P' | b'X' | b'^' | b'_' => string_end(buf, start + 2, false),
        // nF: intermediates then a final byte, e.g. ESC ( B
        0x20..=0x2f => {
            let mut i = start + 1;
            while i < len && (0x20..=0x2f).contains(&buf[i]) {
                i += 1;
            }
            if i < len && (0x30..=0x7e).contains(&buf[i]) {
                i + 1
            } else {
                i
            }
        }
        // Two-byte Fp/Fe/Fs sequences, e.g. ESC = or ESC M
        0x30..=0x7e => start + 2,
        // ESC followed by a control byte: drop the ESC alone
        _ => start + 1,
    }
}

/// Find the end of a control string starting at `from`, terminated by ST
/// (`ESC \`) or, when `bel_ends` is set, by BEL.
fn string_end(buf: &[u8], from: usize, bel_ends: bool) -> usize {
    let len = buf.len();
    let mut i = from;
    while i < len {
        match buf[i] {
            BEL if bel_ends => return i + 1,
            ESC => {
                return match buf.get(i + 1) {
                    Some(b'\\') => i + 2,
                    // A new sequence starts here; it gets stripped on its own
                    Some(_) => i,
                    None => len,
                };
            }
            _ => i += 1,
        }
    }
    len
}
