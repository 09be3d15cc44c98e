// DNS message model shared by the parsers and the encoders

use std::fmt;

use crate::errors::DnsWireError;

/// Size of the fixed message header on the wire: six 16-bit fields.
pub const HEADER_LEN: usize = 12;

/// Largest UDP datagram this server handles (RFC 1035 section 4.2.1, no
/// EDNS0).
pub const MAX_DATAGRAM_LEN: usize = 512;

/// Longest label the wire format can carry. The top two bits of the length
/// octet are the label type, leaving 6 bits for the length.
pub const MAX_LABEL_LEN: usize = 63;

/// Longest encoded name, terminator included (RFC 1035 section 2.3.4).
pub const MAX_NAME_LEN: usize = 255;

/// NOERROR response code.
pub const RCODE_NOERROR: u8 = 0;

/// NOTIMP response code, used for opcodes this server does not implement.
pub const RCODE_NOTIMP: u8 = 4;

/// The header's 16-bit flags word, held as its eight named sub-fields.
///
/// The decomposition is the value this crate works with; the packed word
/// only exists at the wire boundary, produced by [`HeaderFlags::to_wire`]
/// and consumed by [`HeaderFlags::from_wire`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderFlags {
    pub qr: bool,   // Query or Response, bit 15
    pub opcode: u8, // Operation code, bits 11-14
    pub aa: bool,   // Authoritative answer, bit 10
    pub tc: bool,   // Truncated, bit 9
    pub rd: bool,   // Recursion desired, bit 8
    pub ra: bool,   // Recursion available, bit 7
    pub z: u8,      // Reserved for future use, bits 4-6
    pub rcode: u8,  // Response code, bits 0-3
}

impl HeaderFlags {
    /// Splits a wire flags word into its sub-fields. The eight fields tile
    /// the word exactly, so no input can fail.
    pub fn from_wire(word: u16) -> Self {
        Self {
            qr: (word & 0x8000) != 0,
            opcode: ((word & 0x7800) >> 11) as u8,
            aa: (word & 0x0400) != 0,
            tc: (word & 0x0200) != 0,
            rd: (word & 0x0100) != 0,
            ra: (word & 0x0080) != 0,
            z: ((word & 0x0070) >> 4) as u8,
            rcode: (word & 0x000F) as u8,
        }
    }

    /// Packs the sub-fields back into a wire word. The multi-bit fields
    /// are range-checked first: an out-of-range opcode, z, or rcode fails
    /// with [`DnsWireError::FieldOverflow`] instead of bleeding into the
    /// neighboring fields.
    pub fn to_wire(&self) -> Result<u16, DnsWireError> {
        check_width("opcode", self.opcode as usize, 4)?;
        check_width("z", self.z as usize, 3)?;
        check_width("rcode", self.rcode as usize, 4)?;

        let mut word: u16 = 0;
        if self.qr {
            word |= 0x8000;
        }
        word |= (self.opcode as u16) << 11;
        if self.aa {
            word |= 0x0400;
        }
        if self.tc {
            word |= 0x0200;
        }
        if self.rd {
            word |= 0x0100;
        }
        if self.ra {
            word |= 0x0080;
        }
        word |= (self.z as u16) << 4;
        word |= self.rcode as u16;

        Ok(word)
    }
}

/// Range-checks a value against the bits its wire field allocates.
pub(crate) fn check_width(
    field: &'static str,
    value: usize,
    bits: u32,
) -> Result<(), DnsWireError> {
    if value >> bits != 0 {
        return Err(DnsWireError::FieldOverflow { field, value, bits });
    }
    Ok(())
}

/// The fixed 12-byte message header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16, // Packet identifier, echoed into the response
    pub flags: HeaderFlags,
    pub qdcount: u16, // Number of questions
    pub ancount: u16, // Number of answers
    pub nscount: u16, // Number of authority records
    pub arcount: u16, // Number of additional records
}

/// One entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String, // Domain name in dotted form
    pub qtype: u16, // Query type (e.g., A, AAAA, CNAME) https://www.rfc-editor.org/rfc/rfc1035#section-3.2.2
    pub qclass: u16, // Query class (e.g., IN for Internet) https://www.rfc-editor.org/rfc/rfc1035#section-3.2.4
}

impl fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qtype, self.qclass)
    }
}

/// One resource record. RDATA stays raw bytes so records of unknown types
/// survive a decode/encode trip byte-exact. RDLENGTH is not stored; the
/// encoder derives it from the data it actually writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResourceRecord {
    pub name: String,   // Owner name in dotted form
    pub rtype: u16,     // Resource type (e.g., A, AAAA, CNAME)
    pub rclass: u16,    // Resource class (e.g., IN for Internet)
    pub ttl: u32,       // Time to live in seconds
    pub rdata: Vec<u8>, // Resource data, uninterpreted
}

/// A complete DNS message: one header and the four sections in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsResourceRecord>,
    pub authorities: Vec<DnsResourceRecord>,
    pub additionals: Vec<DnsResourceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_round_trip_exhaustive() {
        // The eight sub-fields tile all 16 bits, so unpacking and repacking
        // must reproduce every possible word, and every decomposition must
        // survive the reverse trip.
        for word in 0..=u16::MAX {
            let flags = HeaderFlags::from_wire(word);
            let packed = flags.to_wire().unwrap();
            assert_eq!(packed, word);
            assert_eq!(HeaderFlags::from_wire(packed), flags);
        }
    }

    #[test]
    fn from_wire_splits_known_words() {
        // 0x8180: standard response with RD and RA set
        let flags = HeaderFlags::from_wire(0x8180);
        assert!(flags.qr);
        assert_eq!(flags.opcode, 0);
        assert!(!flags.aa);
        assert!(!flags.tc);
        assert!(flags.rd);
        assert!(flags.ra);
        assert_eq!(flags.z, 0);
        assert_eq!(flags.rcode, 0);

        // 0x0100: plain recursive query
        let flags = HeaderFlags::from_wire(0x0100);
        assert!(!flags.qr);
        assert_eq!(flags.opcode, 0);
        assert!(flags.rd);
        assert!(!flags.ra);

        // 0x2C01: opcode 5, AA set, rcode 1
        let flags = HeaderFlags::from_wire(0x2C01);
        assert!(!flags.qr);
        assert_eq!(flags.opcode, 5);
        assert!(flags.aa);
        assert_eq!(flags.rcode, 1);
    }

    #[test]
    fn setting_one_field_leaves_the_rest_alone() {
        let baseline = HeaderFlags {
            qr: true,
            opcode: 9,
            aa: false,
            tc: true,
            rd: false,
            ra: true,
            z: 5,
            rcode: 11,
        };

        for opcode in 0..16u8 {
            let flags = HeaderFlags { opcode, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { opcode: baseline.opcode, ..reread }, baseline);
        }
        for z in 0..8u8 {
            let flags = HeaderFlags { z, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { z: baseline.z, ..reread }, baseline);
        }
        for rcode in 0..16u8 {
            let flags = HeaderFlags { rcode, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { rcode: baseline.rcode, ..reread }, baseline);
        }
        for qr in [false, true] {
            let flags = HeaderFlags { qr, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { qr: baseline.qr, ..reread }, baseline);
        }
        for aa in [false, true] {
            let flags = HeaderFlags { aa, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { aa: baseline.aa, ..reread }, baseline);
        }
        for tc in [false, true] {
            let flags = HeaderFlags { tc, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { tc: baseline.tc, ..reread }, baseline);
        }
        for rd in [false, true] {
            let flags = HeaderFlags { rd, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { rd: baseline.rd, ..reread }, baseline);
        }
        for ra in [false, true] {
            let flags = HeaderFlags { ra, ..baseline };
            let reread = HeaderFlags::from_wire(flags.to_wire().unwrap());
            assert_eq!(reread, flags);
            assert_eq!(HeaderFlags { ra: baseline.ra, ..reread }, baseline);
        }
    }

    #[test]
    fn opcode_overflow_is_rejected() {
        let flags = HeaderFlags {
            opcode: 16, // one past the 4-bit maximum
            aa: true,
            tc: true,
            rd: true,
            ..HeaderFlags::default()
        };
        let err = flags.to_wire().unwrap_err();
        assert!(matches!(
            err,
            DnsWireError::FieldOverflow {
                field: "opcode",
                value: 16,
                ..
            }
        ));
    }

    #[test]
    fn z_overflow_is_rejected() {
        let flags = HeaderFlags {
            z: 8,
            ..HeaderFlags::default()
        };
        let err = flags.to_wire().unwrap_err();
        assert!(matches!(
            err,
            DnsWireError::FieldOverflow { field: "z", value: 8, .. }
        ));
    }

    #[test]
    fn rcode_overflow_is_rejected() {
        let flags = HeaderFlags {
            rcode: 16,
            ..HeaderFlags::default()
        };
        let err = flags.to_wire().unwrap_err();
        assert!(matches!(
            err,
            DnsWireError::FieldOverflow {
                field: "rcode",
                value: 16,
                ..
            }
        ));
    }
}
