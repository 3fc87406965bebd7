//! Frame opcodes.

use std::fmt;

/// Frame type tag carried in the low four bits of the first header byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Continuation of a fragmented message.
    Continuation,
    /// UTF-8 text payload.
    Text,
    /// Opaque binary payload.
    Binary,
    /// Connection close.
    Close,
    /// Keep-alive probe; answered with a pong.
    Ping,
    /// Reply to a ping.
    Pong,
    /// Any value RFC 6455 reserves for future use.
    Reserved(u8),
}

impl Opcode {
    /// Decode an opcode from the low nibble of `bits`.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }

    /// Four-bit wire value of this opcode.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(bits) => bits & 0x0F,
        }
    }

    /// Whether this opcode names a control frame (close, ping, pong or a
    /// reserved control value).
    #[must_use]
    pub const fn is_control(self) -> bool { self.bits() & 0x08 != 0 }
}

impl From<u8> for Opcode {
    fn from(bits: u8) -> Self { Self::from_bits(bits) }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuation => f.write_str("continuation"),
            Self::Text => f.write_str("text"),
            Self::Binary => f.write_str("binary"),
            Self::Close => f.write_str("close"),
            Self::Ping => f.write_str("ping"),
            Self::Pong => f.write_str("pong"),
            Self::Reserved(bits) => write!(f, "reserved({bits:#x})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0x0, Opcode::Continuation)]
    #[case(0x1, Opcode::Text)]
    #[case(0x2, Opcode::Binary)]
    #[case(0x8, Opcode::Close)]
    #[case(0x9, Opcode::Ping)]
    #[case(0xA, Opcode::Pong)]
    #[case(0x3, Opcode::Reserved(0x3))]
    #[case(0xF, Opcode::Reserved(0xF))]
    fn decodes_low_nibble(#[case] bits: u8, #[case] expected: Opcode) {
        assert_eq!(Opcode::from_bits(bits), expected);
        assert_eq!(Opcode::from_bits(bits | 0x80), expected);
        assert_eq!(expected.bits(), bits);
    }

    #[rstest]
    #[case(Opcode::Close, true)]
    #[case(Opcode::Ping, true)]
    #[case(Opcode::Pong, true)]
    #[case(Opcode::Reserved(0xB), true)]
    #[case(Opcode::Text, false)]
    #[case(Opcode::Continuation, false)]
    #[case(Opcode::Reserved(0x3), false)]
    fn classifies_control_frames(#[case] opcode: Opcode, #[case] control: bool) {
        assert_eq!(opcode.is_control(), control);
    }
}
