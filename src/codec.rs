//! DNS message codec for tokio_util
//!
//! Decoder and Encoder implementations bridging the wire parsers and
//! writers to tokio's framing traits, so the serving loop hands whole
//! datagrams in and gets whole datagrams back.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::errors::DnsWireError;
use crate::parsers::parse_dns_message;
use crate::protocol::{
    check_width, DnsHeader, DnsMessage, DnsQuestion, DnsResourceRecord, HEADER_LEN, MAX_LABEL_LEN,
    MAX_NAME_LEN,
};

/// DNS message codec for use with tokio_util framed streams. Stateless;
/// one instance handles any number of datagrams.
#[derive(Debug, Default)]
pub struct DnsCodec;

impl DnsCodec {
    /// Create a new DNS codec instance
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for DnsCodec {
    type Item = DnsMessage;
    type Error = DnsWireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Each UDP datagram carries one complete message, so missing bytes
        // will never arrive later; a short input is an error, not a "wait".
        let input = src.as_ref();

        match parse_dns_message(input) {
            Ok((remaining, message)) => {
                // Drop the consumed prefix. Trailing bytes past the declared
                // sections are left in the buffer.
                let consumed = input.len() - remaining.len();
                let _ = src.split_to(consumed);

                Ok(Some(message))
            }
            Err(nom::Err::Incomplete(needed)) => {
                let needed = match needed {
                    nom::Needed::Size(n) => input.len() + n.get(),
                    nom::Needed::Unknown => input.len() + 1,
                };

                Err(DnsWireError::truncated(needed, src.len()))
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                debug!("DNS message decode failed: {}", e);

                Err(e)
            }
        }
    }
}

impl Encoder<DnsMessage> for DnsCodec {
    type Error = DnsWireError;

    fn encode(&mut self, item: DnsMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        debug!("DnsCodec::encode called for message ID {}", item.header.id);

        // The counts on the wire always describe the sections actually
        // serialized, never whatever a stale header claimed.
        let mut corrected_header = item.header;
        corrected_header.qdcount = section_len("qdcount", item.questions.len())?;
        corrected_header.ancount = section_len("ancount", item.answers.len())?;
        corrected_header.nscount = section_len("nscount", item.authorities.len())?;
        corrected_header.arcount = section_len("arcount", item.additionals.len())?;

        self.encode_header(&corrected_header, dst)?;

        for question in &item.questions {
            self.encode_question(question, dst)?;
        }

        // The three record sections share one wire layout.
        for record in item
            .answers
            .iter()
            .chain(&item.authorities)
            .chain(&item.additionals)
        {
            self.encode_record(record, dst)?;
        }

        Ok(())
    }
}

/// A section's length must fit its 16-bit header count.
fn section_len(field: &'static str, len: usize) -> Result<u16, DnsWireError> {
    check_width(field, len, 16)?;
    Ok(len as u16)
}

impl DnsCodec {
    /// Encode the 12-byte message header. The flags word is packed, and
    /// range-checked, before anything is written, so a failed encode
    /// leaves `dst` untouched.
    fn encode_header(&self, header: &DnsHeader, dst: &mut BytesMut) -> Result<(), DnsWireError> {
        let flags = header.flags.to_wire()?;

        dst.reserve(HEADER_LEN);
        dst.put_u16(header.id);
        dst.put_u16(flags);
        dst.put_u16(header.qdcount);
        dst.put_u16(header.ancount);
        dst.put_u16(header.nscount);
        dst.put_u16(header.arcount);

        Ok(())
    }

    /// Encode a domain name as a sequence of labels, each prefixed by its
    /// length, terminated by a null byte. Names are always written
    /// uncompressed; compression pointers are only ever followed on decode.
    fn encode_domain_name(&self, name: &str, dst: &mut BytesMut) -> Result<(), DnsWireError> {
        // Empty labels come from a trailing dot, or from the root name.
        let labels: Vec<&str> = name.split('.').filter(|label| !label.is_empty()).collect();

        // Validate every label and the total length before writing a byte.
        let mut total = 1; // null terminator
        for label in &labels {
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsWireError::FieldOverflow {
                    field: "label length",
                    value: label.len(),
                    bits: 6,
                });
            }
            total += 1 + label.len();
        }
        if total > MAX_NAME_LEN {
            return Err(DnsWireError::FieldOverflow {
                field: "name length",
                value: total,
                bits: 8,
            });
        }
        dst.reserve(total);

        for label in labels {
            dst.put_u8(label.len() as u8);
            dst.put_slice(label.as_bytes());
        }
        dst.put_u8(0);

        Ok(())
    }

    fn encode_question(
        &self,
        question: &DnsQuestion,
        dst: &mut BytesMut,
    ) -> Result<(), DnsWireError> {
        self.encode_domain_name(&question.name, dst)?;
        dst.put_u16(question.qtype);
        dst.put_u16(question.qclass);

        Ok(())
    }

    fn encode_record(
        &self,
        record: &DnsResourceRecord,
        dst: &mut BytesMut,
    ) -> Result<(), DnsWireError> {
        // RDLENGTH is derived from the data actually written, and must fit
        // its 16-bit field.
        check_width("rdlength", record.rdata.len(), 16)?;

        self.encode_domain_name(&record.name, dst)?;
        dst.put_u16(record.rtype);
        dst.put_u16(record.rclass);
        dst.put_u32(record.ttl);
        dst.put_u16(record.rdata.len() as u16);
        dst.put_slice(&record.rdata);

        Ok(())
    }
}
