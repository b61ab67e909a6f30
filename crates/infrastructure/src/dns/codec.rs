//! Wire codec for DNS messages.
//!
//! Thin layer over `hickory-proto`: byte slices in and out for the
//! listeners and the recursor exchanger, plus the two byte length prefix
//! framing DNS uses over TCP.

use std::io;

use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use fleet_dns_domain::DnsError;

/// Largest message expressible in the TCP length prefix.
pub const MAX_TCP_MESSAGE_SIZE: usize = 65535;

pub fn decode_message(bytes: &[u8]) -> Result<Message, DnsError> {
    Message::from_vec(bytes).map_err(|e| DnsError::MessageDecoding(e.to_string()))
}

pub fn encode_message(message: &Message) -> Result<Vec<u8>, DnsError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| DnsError::MessageEncoding(e.to_string()))?;
    Ok(buf)
}

/// Writes one length-prefixed DNS message to a TCP-style stream.
pub async fn write_framed<S>(stream: &mut S, bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    if bytes.len() > MAX_TCP_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("DNS message too large for TCP framing: {} bytes", bytes.len()),
        ));
    }

    stream.write_all(&(bytes.len() as u16).to_be_bytes()).await?;
    stream.write_all(bytes).await?;
    stream.flush().await
}

/// Reads one length-prefixed DNS message from a TCP-style stream.
pub async fn read_framed<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 2];
    stream.read_exact(&mut prefix).await?;
    let length = u16::from_be_bytes(prefix) as usize;

    let mut bytes = vec![0u8; length];
    stream.read_exact(&mut bytes).await?;
    Ok(bytes)
}
