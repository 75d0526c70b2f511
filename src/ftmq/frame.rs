use std::fmt;

/// Header synchronization byte, sent twice in front of every frame
pub const HEADER_BYTE: u8 = 0x40;

/// Number of header bytes preceding a packet
pub const HEADER_LEN: usize = 2;

/// Payload size in bytes
pub const PAYLOAD_LEN: usize = 4;

/// Identifier plus payload
pub const PACKET_LEN: usize = 1 + PAYLOAD_LEN;

/// Complete frame on the wire, header included
pub const FRAME_LEN: usize = HEADER_LEN + PACKET_LEN;

/// One complete FTMQ message: identifier byte and four raw payload bytes.
///
/// The payload is kept untyped here. Its interpretation (integer, float or
/// plain bytes) is decided by the lookup table entry matching the identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    pub identifier: u8,
    pub payload: [u8; PAYLOAD_LEN],
}

impl Frame {
    pub fn new(identifier: u8, payload: [u8; PAYLOAD_LEN]) -> Self {
        Self {
            identifier,
            payload,
        }
    }

    /// Handshake frame written once when the serial link comes up.
    ///
    /// Identifier `0x00` with an all-zero payload signals a reset to the
    /// serial peer.
    pub fn startup() -> Self {
        Self::new(0x00, [0; PAYLOAD_LEN])
    }

    /// Wire representation of this frame
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        encode(self.identifier, self.payload)
    }

    /// Builds a frame from an identifier byte followed by the payload
    pub(crate) fn from_packet(packet: &[u8; PACKET_LEN]) -> Self {
        let mut payload = [0; PAYLOAD_LEN];
        payload.copy_from_slice(&packet[1..]);
        Self::new(packet[0], payload)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "id=0x{:02X} payload=[{:02X} {:02X} {:02X} {:02X}]",
            self.identifier, self.payload[0], self.payload[1], self.payload[2], self.payload[3]
        )
    }
}

/// Encodes an identifier and payload into the 7-byte wire format.
///
/// Pure function; writing the bytes to the UART is up to the caller.
pub fn encode(identifier: u8, payload: [u8; PAYLOAD_LEN]) -> [u8; FRAME_LEN] {
    let mut out = [0; FRAME_LEN];
    out[..HEADER_LEN].fill(HEADER_BYTE);
    out[HEADER_LEN] = identifier;
    out[HEADER_LEN + 1..].copy_from_slice(&payload);
    out
}
