use crate::protocol::{DnsHeader, DnsMessage, HeaderFlags, RCODE_NOERROR, RCODE_NOTIMP};

/// Builds the reply to one decoded request.
///
/// The identifier is echoed so the client can match the reply to its
/// query, QR marks the message as a response, and OPCODE and RD are
/// echoed from the request. RCODE is NOERROR for a standard query and
/// NOTIMP for any other opcode. AA, TC, RA and Z are always cleared, and
/// all four sections are left empty; this server answers but does not
/// resolve.
pub fn build_response(request: &DnsMessage) -> DnsMessage {
    let flags = HeaderFlags {
        qr: true,
        opcode: request.header.flags.opcode,
        aa: false,
        tc: false,
        rd: request.header.flags.rd,
        ra: false,
        z: 0,
        rcode: match request.header.flags.opcode {
            0 => RCODE_NOERROR,
            _ => RCODE_NOTIMP,
        },
    };

    let header = DnsHeader {
        id: request.header.id,
        flags,
        // Counts are recomputed from the section lengths at encode time.
        qdcount: 0,
        ancount: 0,
        nscount: 0,
        arcount: 0,
    };

    DnsMessage {
        header,
        questions: Vec::new(),
        answers: Vec::new(),
        authorities: Vec::new(),
        additionals: Vec::new(),
    }
}
