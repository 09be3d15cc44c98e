mod cli;
mod codec;
mod errors;
mod parsers;
mod protocol;
mod response_builder;

use std::net::SocketAddr;

use anyhow::Context;
use bytes::BytesMut;
use codec::DnsCodec;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::codec::{Decoder, Encoder};

use tracing::{debug, error, info, Level};

use crate::protocol::MAX_DATAGRAM_LEN;
use crate::response_builder::build_response;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = cli::Args::parse_args();

    let sock = bind_udp(args.listen())?;

    // Create a new DNS codec instance.
    let mut codec = DnsCodec::new();
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    info!("DNS server listening on {}", args.listen());

    loop {
        let (len, addr) = match sock.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!("Error receiving datagram: {}", e);
                continue;
            }
        };
        debug!("Received {} bytes from {}", len, addr);

        // Create a BytesMut from the received data
        let mut bytes_mut = BytesMut::from(&buf[..len]);

        // Use the codec to decode the DNS message
        match codec.decode(&mut bytes_mut) {
            Ok(Some(message)) => {
                debug!(
                    "Successfully decoded DNS message from {}: {:?}",
                    addr, message.header
                );

                debug!(
                    target: "minidns::message_details",
                    message_id = message.header.id,
                    query_response = if message.header.flags.qr { "Response" } else { "Query" },
                    opcode = message.header.flags.opcode,
                    authoritative = message.header.flags.aa,
                    truncated = message.header.flags.tc,
                    recursion_desired = message.header.flags.rd,
                    recursion_available = message.header.flags.ra,
                    response_code = match message.header.flags.rcode {
                        0 => "NOERROR",
                        1 => "FORMERR",
                        2 => "SERVFAIL",
                        3 => "NXDOMAIN",
                        4 => "NOTIMP",
                        5 => "REFUSED",
                        _ => "UNKNOWN"
                    },
                    question_count = message.header.qdcount,
                    answer_count = message.header.ancount,
                    authority_count = message.header.nscount,
                    additional_count = message.header.arcount,
                    "DNS message header parsed successfully"
                );

                for question in message.questions.iter() {
                    debug!("Question from {}: {}", addr, question);
                }

                let response = build_response(&message);

                // Encode the response message
                let mut response_buf = BytesMut::new();
                match codec.encode(response, &mut response_buf) {
                    Ok(()) => match sock.send_to(&response_buf, addr).await {
                        Ok(response_len) => {
                            info!("Sent DNS response ({} bytes) to {}", response_len, addr);
                        }
                        Err(e) => {
                            error!("Failed to send response to {}: {}", addr, e);
                        }
                    },
                    Err(e) => {
                        // A response we built ourselves failing to encode is
                        // a bug; report it and answer nothing rather than
                        // send corrupt bytes.
                        error!("Failed to encode DNS response for {}: {}", addr, e);
                    }
                }
            }
            Ok(None) => {
                info!("No complete message in datagram from {}, ignoring", addr);
            }
            Err(e) => {
                error!("Discarding datagram from {}: {}", addr, e);
                // Continue processing other datagrams even if one fails
            }
        }
    }
}

/// Bind the serving socket. SO_REUSEPORT is set before bind so a
/// supervised restart can take the port over immediately instead of
/// failing with "Address already in use".
fn bind_udp(addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket =
        Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).context("socket creation failed")?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("bind to {} failed", addr))?;

    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}
