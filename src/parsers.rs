use nom::{
    self,
    bytes::complete::take,
    number::complete::{be_u16, be_u32, be_u8},
    IResult,
};

use crate::errors::DnsWireError;
use crate::protocol::{
    DnsHeader, DnsMessage, DnsQuestion, DnsResourceRecord, HeaderFlags, HEADER_LEN, MAX_LABEL_LEN,
};

/// nom result alias carrying [`DnsWireError`], so decode failures keep
/// their kind all the way out of the parser layer.
pub type WireResult<'a, O> = IResult<&'a [u8], O, DnsWireError>;

/// Parses the fixed 12-byte header: six big-endian 16-bit integers in wire
/// order, with the flags word split into its named sub-fields.
pub fn parse_dns_header(input: &[u8]) -> WireResult<'_, DnsHeader> {
    if input.len() < HEADER_LEN {
        return Err(nom::Err::Failure(DnsWireError::truncated(
            HEADER_LEN,
            input.len(),
        )));
    }

    let (input, id) = be_u16(input)?;
    let (input, flags) = be_u16(input)?;
    let (input, qdcount) = be_u16(input)?;
    let (input, ancount) = be_u16(input)?;
    let (input, nscount) = be_u16(input)?;
    let (input, arcount) = be_u16(input)?;

    Ok((
        input,
        DnsHeader {
            id,
            flags: HeaderFlags::from_wire(flags),
            qdcount,
            ancount,
            nscount,
            arcount,
        },
    ))
}

/// Recursively parses a domain name, following the RFC 1035 compression
/// scheme through `datagram`. `jumps` records every pointer target already
/// followed in this name; a target seen twice means the chain is cyclic
/// and would never terminate.
fn parse_name_labels<'a>(
    datagram: &'a [u8],
    input: &'a [u8],
    jumps: &mut Vec<usize>,
) -> WireResult<'a, Vec<String>> {
    let (i, length) = be_u8(input)?;

    match length {
        l if (l & 0b1100_0000) == 0b1100_0000 => {
            let (i, next_byte) = be_u8(i)?;
            let target = (u16::from_be_bytes([l, next_byte]) & 0x3FFF) as usize;

            if jumps.contains(&target) {
                return Err(nom::Err::Failure(DnsWireError::CompressionLoop {
                    offset: target,
                }));
            }
            if target >= datagram.len() {
                return Err(nom::Err::Failure(DnsWireError::MalformedSection(format!(
                    "compression pointer to offset {} in a {} byte message",
                    target,
                    datagram.len()
                ))));
            }

            jumps.push(target);
            let (_, labels) = parse_name_labels(datagram, &datagram[target..], jumps)?;
            // A pointer always ends the name; decoding resumes after the
            // two pointer bytes.
            Ok((i, labels))
        }
        0 => Ok((i, Vec::new())),
        l if (l as usize) <= MAX_LABEL_LEN => {
            let len = l as usize;
            if i.len() < len {
                return Err(nom::Err::Failure(DnsWireError::truncated(len, i.len())));
            }
            let (i, label_bytes) = take(len)(i)?;
            let label = String::from_utf8_lossy(label_bytes).to_string();
            let (i, mut next_labels) = parse_name_labels(datagram, i, jumps)?;
            let mut labels = vec![label];
            labels.append(&mut next_labels);
            Ok((i, labels))
        }
        _ => Err(nom::Err::Failure(DnsWireError::MalformedSection(format!(
            "reserved label type {:#b} in a name length octet",
            length >> 6
        )))),
    }
}

/// Parses a domain name and joins its labels into dotted form.
fn parse_domain_name<'a>(datagram: &'a [u8], input: &'a [u8]) -> WireResult<'a, String> {
    let mut jumps = Vec::new();
    let (i, labels) = parse_name_labels(datagram, input, &mut jumps)?;
    Ok((i, labels.join(".")))
}

/// Parses one question entry. The full datagram rides along so the name
/// can resolve compression pointers.
fn parse_dns_question<'a>(datagram: &'a [u8], input: &'a [u8]) -> WireResult<'a, DnsQuestion> {
    let (input, name) = parse_domain_name(datagram, input)?;
    let (input, qtype) = be_u16(input)?;
    let (input, qclass) = be_u16(input)?;

    Ok((
        input,
        DnsQuestion {
            name,
            qtype,
            qclass,
        },
    ))
}

/// Parses one resource record. RDATA is kept as raw bytes, so records of
/// types this server does not know still decode.
fn parse_dns_record<'a>(datagram: &'a [u8], input: &'a [u8]) -> WireResult<'a, DnsResourceRecord> {
    let (input, name) = parse_domain_name(datagram, input)?;
    let (input, rtype) = be_u16(input)?;
    let (input, rclass) = be_u16(input)?;
    let (input, ttl) = be_u32(input)?;
    let (input, rdlength) = be_u16(input)?;

    let rdlength = rdlength as usize;
    if input.len() < rdlength {
        return Err(nom::Err::Failure(DnsWireError::MalformedSection(format!(
            "record declares {} bytes of data, {} available",
            rdlength,
            input.len()
        ))));
    }
    let (input, rdata) = take(rdlength)(input)?;

    Ok((
        input,
        DnsResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            rdata: rdata.to_vec(),
        },
    ))
}

/// Truncation while a counted section still owes entries means the declared
/// count cannot be satisfied; reclassify it so the failure names the
/// section. Pointer loops and other structural errors keep their kind.
fn section_shortfall(
    err: nom::Err<DnsWireError>,
    section: &'static str,
    parsed: u16,
    declared: u16,
) -> nom::Err<DnsWireError> {
    err.map(|e| match e {
        DnsWireError::TruncatedInput { .. } => DnsWireError::MalformedSection(format!(
            "{} section declares {} records but input ends after {}",
            section, declared, parsed
        )),
        other => other,
    })
}

fn parse_record_section<'a>(
    datagram: &'a [u8],
    input: &'a [u8],
    count: u16,
    section: &'static str,
) -> WireResult<'a, Vec<DnsResourceRecord>> {
    let mut records = Vec::with_capacity(count as usize);
    let mut remaining = input;
    for parsed in 0..count {
        let (i, record) = parse_dns_record(datagram, remaining)
            .map_err(|e| section_shortfall(e, section, parsed, count))?;
        records.push(record);
        remaining = i;
    }
    Ok((remaining, records))
}

/// Parses a complete DNS message: the header, then exactly the number of
/// questions and records the header declares, in wire order.
pub fn parse_dns_message(input: &[u8]) -> WireResult<'_, DnsMessage> {
    // Keep a reference to the start of the datagram for resolving
    // compression offsets.
    let datagram = input;

    let (mut remaining, header) = parse_dns_header(datagram)?;

    let mut questions = Vec::with_capacity(header.qdcount as usize);
    for parsed in 0..header.qdcount {
        let (i, question) = parse_dns_question(datagram, remaining)
            .map_err(|e| section_shortfall(e, "question", parsed, header.qdcount))?;
        questions.push(question);
        remaining = i;
    }

    let (remaining, answers) =
        parse_record_section(datagram, remaining, header.ancount, "answer")?;
    let (remaining, authorities) =
        parse_record_section(datagram, remaining, header.nscount, "authority")?;
    let (remaining, additionals) =
        parse_record_section(datagram, remaining, header.arcount, "additional")?;

    Ok((
        remaining,
        DnsMessage {
            header,
            questions,
            answers,
            authorities,
            additionals,
        },
    ))
}
