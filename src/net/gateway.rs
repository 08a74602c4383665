//! The listener half of component B: accepts inbound TCP connections and
//! hands them to the reactor as new slab entries.

use mio::net::TcpListener;
use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr};

pub struct Gateway {
    listener: TcpListener,
}

impl Gateway {
    pub fn bind(addr: &str, port: u16) -> io::Result<Self> {
        let socket_addr: SocketAddr = format!("{addr}:{port}").parse().map_err(|e| {
            io::Error::new(ErrorKind::InvalidInput, format!("invalid listen address: {e}"))
        })?;
        Ok(Self {
            listener: TcpListener::bind(socket_addr)?,
        })
    }

    pub fn listener_mut(&mut self) -> &mut TcpListener {
        &mut self.listener
    }

    /// Accepts every pending connection in a loop until `WouldBlock`
    /// (edge-triggered readiness per spec.md §4.1).
    pub fn accept_all(&mut self) -> io::Result<Vec<(mio::net::TcpStream, Ipv4Addr)>> {
        let mut accepted = Vec::new();
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let ip = match peer.ip() {
                        std::net::IpAddr::V4(v4) => v4,
                        std::net::IpAddr::V6(v6) => v6.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
                    };
                    accepted.push((stream, ip));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(accepted)
    }
}
