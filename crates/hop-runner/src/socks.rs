//! Minimal SOCKS5 client (RFC 1928): no authentication, CONNECT only

use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::scan::Dialer;

const SOCKS_VERSION: u8 = 0x05;
const AUTH_NONE: u8 = 0x00;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;
const REPLY_SUCCEEDED: u8 = 0x00;

/// Connects to targets through a SOCKS5 proxy such as `ssh -D`
#[derive(Debug, Clone, Copy)]
pub struct Socks5Dialer {
    proxy: SocketAddr,
}

impl Socks5Dialer {
    pub fn new(proxy: SocketAddr) -> Self {
        Self { proxy }
    }

    pub fn proxy(&self) -> SocketAddr {
        self.proxy
    }
}

#[async_trait]
impl Dialer for Socks5Dialer {
    type Stream = TcpStream;

    async fn dial(&self, target: SocketAddr) -> io::Result<TcpStream> {
        let mut stream = TcpStream::connect(self.proxy).await?;
        negotiate(&mut stream).await?;
        connect(&mut stream, target).await?;
        Ok(stream)
    }
}

async fn negotiate(stream: &mut TcpStream) -> io::Result<()> {
    // VER + NMETHODS + METHODS
    stream.write_all(&[SOCKS_VERSION, 1, AUTH_NONE]).await?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await?;
    if reply[0] != SOCKS_VERSION {
        return Err(protocol_error(format!("unexpected SOCKS version {}", reply[0])));
    }
    if reply[1] != AUTH_NONE {
        return Err(protocol_error("proxy requires authentication".to_string()));
    }
    Ok(())
}

async fn connect(stream: &mut TcpStream, target: SocketAddr) -> io::Result<()> {
    // VER + CMD + RSV + ATYP + DST.ADDR + DST.PORT
    let mut request = vec![SOCKS_VERSION, CMD_CONNECT, 0x00];
    match target.ip() {
        IpAddr::V4(ip) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        }
        IpAddr::V6(ip) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&ip.octets());
        }
    }
    request.extend_from_slice(&target.port().to_be_bytes());
    stream.write_all(&request).await?;

    // VER + REP + RSV + ATYP
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    if header[0] != SOCKS_VERSION {
        return Err(protocol_error(format!("unexpected SOCKS version {}", header[0])));
    }
    if header[1] != REPLY_SUCCEEDED {
        return Err(reply_error(header[1]));
    }

    // BND.ADDR + BND.PORT, unused but must be drained
    let addr_len = match header[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
        other => return Err(protocol_error(format!("unknown address type {other}"))),
    };
    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).await?;

    Ok(())
}

fn protocol_error(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn reply_error(code: u8) -> io::Error {
    let (kind, text) = match code {
        0x01 => (io::ErrorKind::Other, "general SOCKS server failure"),
        0x02 => (io::ErrorKind::PermissionDenied, "connection not allowed by ruleset"),
        0x03 => (io::ErrorKind::Other, "network unreachable"),
        0x04 => (io::ErrorKind::Other, "host unreachable"),
        0x05 => (io::ErrorKind::ConnectionRefused, "connection refused"),
        0x06 => (io::ErrorKind::TimedOut, "TTL expired"),
        0x07 => (io::ErrorKind::Unsupported, "command not supported"),
        0x08 => (io::ErrorKind::Unsupported, "address type not supported"),
        _ => (io::ErrorKind::Other, "unknown SOCKS error"),
    };
    io::Error::new(kind, format!("{text} (code {code:#04x})"))
}
