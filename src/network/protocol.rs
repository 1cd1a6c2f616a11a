//! Device Line Protocol
//!
//! Text wire format between field devices and the server.
//! Every line is CRLF-terminated on output; input accepts LF or CRLF.
//!
//! ```text
//! device -> server   H<alliance><element>      handshake, e.g. HRA, HBS
//! server -> device   OK | NO                   handshake acknowledgement
//! device -> server   RA | RS | A | C           note scored, amp / coop button
//! server -> device   L? H? C? A?               display updates
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::game::messages::Message;
use crate::game::types::{Alliance, FieldElement};

/// First character of a handshake line.
pub const HANDSHAKE_MARKER: char = 'H';

/// Positive handshake acknowledgement.
pub const ACK_OK: &str = "OK";

/// Negative handshake acknowledgement.
pub const ACK_NO: &str = "NO";

/// Line terminator used for everything the server writes.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Protocol errors. Never fatal to the match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// First line was not a valid device identifier.
    #[error("Malformed handshake: {0:?}")]
    MalformedHandshake(String),

    /// Post-handshake line not in the device's grammar.
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),
}

/// Strip a trailing line terminator.
pub fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Read one input line, without its terminator.
///
/// Bytes that are not UTF-8 are replaced rather than failing the read, so
/// line noise decodes as an unknown command. `None` at end of stream.
pub async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(trim_line(&String::from_utf8_lossy(buf)).to_string()))
}

/// Frame an outbound line.
pub fn frame(line: &str) -> String {
    format!("{}{}", line, LINE_TERMINATOR)
}

/// Decode a handshake line into the slot it claims.
pub fn decode_handshake(line: &str) -> Result<(Alliance, FieldElement), ProtocolError> {
    let trimmed = trim_line(line);
    let malformed = || ProtocolError::MalformedHandshake(trimmed.to_string());

    let mut chars = trimmed.chars();
    let (Some(marker), Some(alliance), Some(element), None) =
        (chars.next(), chars.next(), chars.next(), chars.next())
    else {
        return Err(malformed());
    };

    if marker != HANDSHAKE_MARKER {
        return Err(malformed());
    }

    let alliance = Alliance::from_code(alliance).ok_or_else(malformed)?;
    let element = FieldElement::from_code(element).ok_or_else(malformed)?;
    Ok((alliance, element))
}

/// Encode the handshake a device sends for its slot.
pub fn encode_handshake(alliance: Alliance, element: FieldElement) -> String {
    let alliance = match alliance {
        Alliance::Red => 'R',
        Alliance::Blue => 'B',
    };
    let element = match element {
        FieldElement::Amp => 'A',
        FieldElement::Speaker => 'S',
    };
    format!("{}{}{}", HANDSHAKE_MARKER, alliance, element)
}

/// Decode a score report (`R` followed by the element letter).
///
/// Both device kinds accept it; only the first two characters are read.
pub fn decode_score(line: &str) -> Option<Message> {
    let mut chars = line.chars();
    if chars.next() != Some('R') {
        return None;
    }
    match chars.next() {
        Some('A') => Some(Message::Score { element: FieldElement::Amp }),
        Some('S') => Some(Message::Score { element: FieldElement::Speaker }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_handshake_accepts_valid_ids() {
        assert_eq!(decode_handshake("HRA\n"), Ok((Alliance::Red, FieldElement::Amp)));
        assert_eq!(decode_handshake("HBS\n"), Ok((Alliance::Blue, FieldElement::Speaker)));
        assert_eq!(decode_handshake("HRS\r\n"), Ok((Alliance::Red, FieldElement::Speaker)));
        assert_eq!(decode_handshake("HBA"), Ok((Alliance::Blue, FieldElement::Amp)));
    }

    #[test]
    fn test_handshake_rejects_malformed() {
        for line in ["XRA\n", "HRX\n", "HXA\n", "", "\n", "HR\n", "HRAS\n", "hra\n", " HRA\n"] {
            assert!(
                matches!(decode_handshake(line), Err(ProtocolError::MalformedHandshake(_))),
                "{:?} should be rejected",
                line,
            );
        }
    }

    #[test]
    fn test_encode_handshake() {
        assert_eq!(encode_handshake(Alliance::Red, FieldElement::Amp), "HRA");
        assert_eq!(encode_handshake(Alliance::Blue, FieldElement::Speaker), "HBS");
    }

    #[test]
    fn test_decode_score() {
        assert_eq!(decode_score("RA"), Some(Message::Score { element: FieldElement::Amp }));
        assert_eq!(decode_score("RS"), Some(Message::Score { element: FieldElement::Speaker }));
        assert_eq!(decode_score("RSX"), Some(Message::Score { element: FieldElement::Speaker }));
        assert_eq!(decode_score("R"), None);
        assert_eq!(decode_score("RX"), None);
        assert_eq!(decode_score("A"), None);
    }

    #[test]
    fn test_frame() {
        assert_eq!(frame(ACK_OK), "OK\r\n");
        assert_eq!(trim_line("L1\r\n"), "L1");
    }

    #[tokio::test]
    async fn test_read_line_tolerates_invalid_utf8() {
        let mut input: &[u8] = b"\xff\xfe\r\nRA\nC";
        let mut buf = Vec::new();

        let noise = read_line(&mut input, &mut buf).await.unwrap().unwrap();
        assert_eq!(decode_score(&noise), None);
        assert_eq!(read_line(&mut input, &mut buf).await.unwrap().as_deref(), Some("RA"));
        assert_eq!(read_line(&mut input, &mut buf).await.unwrap().as_deref(), Some("C"));
        assert_eq!(read_line(&mut input, &mut buf).await.unwrap(), None);
    }

    proptest! {
        #[test]
        fn prop_handshake_decode_is_total(line in ".{0,8}") {
            if let Ok((alliance, element)) = decode_handshake(&line) {
                prop_assert_eq!(encode_handshake(alliance, element), trim_line(&line));
            }
        }
    }
}
