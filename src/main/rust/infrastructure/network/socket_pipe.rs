use std::net::{IpAddr, SocketAddr, TcpListener, UdpSocket};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{PipeEndpoint, PipeEndpointFactory};
use crate::domain::value_objects::{
    Direction, InternalConnectOptions, InternalPipeOptions, PipeProtocol,
};

enum Socket {
    Udp(UdpSocket),
    Tcp {
        listener: TcpListener,
        peer: Option<SocketAddr>,
    },
}

/// Pipe endpoint bound to a local socket
pub struct SocketEndpoint {
    port: u16,
    direction: Direction,
    socket: Mutex<Option<Socket>>,
}

impl SocketEndpoint {
    fn socket(&self) -> MutexGuard<'_, Option<Socket>> {
        self.socket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_open(&self) -> bool {
        self.socket().is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.socket().as_ref()? {
            Socket::Udp(socket) => socket.local_addr().ok(),
            Socket::Tcp { listener, .. } => listener.local_addr().ok(),
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        match self.socket().as_ref()? {
            Socket::Udp(socket) => socket.peer_addr().ok(),
            Socket::Tcp { peer, .. } => *peer,
        }
    }
}

impl PipeEndpoint for SocketEndpoint {
    fn local_port(&self) -> u16 {
        self.port
    }

    fn connect(&self, options: &InternalConnectOptions) -> Result<()> {
        let peer = options.peer();
        let mut socket = self.socket();

        match socket.as_mut() {
            Some(Socket::Udp(udp)) => udp.connect(peer).map_err(|e| {
                DomainError::TransportCreationFailed(format!("connect to {}: {}", peer, e))
            })?,
            Some(Socket::Tcp { peer: slot, .. }) => *slot = Some(peer),
            None => {
                return Err(DomainError::TransportCreationFailed(format!(
                    "endpoint on port {} is closed",
                    self.port
                )))
            }
        }

        tracing::debug!(port = self.port, direction = %self.direction, %peer, "internal endpoint paired");
        Ok(())
    }

    fn close(&self) {
        if self.socket().take().is_some() {
            tracing::debug!(port = self.port, "internal endpoint closed");
        }
    }
}

/// Opens internal pipe endpoints on local UDP or TCP sockets
#[derive(Debug, Default)]
pub struct SocketPipeFactory;

impl SocketPipeFactory {
    pub fn new() -> Self {
        Self
    }
}

impl PipeEndpointFactory for SocketPipeFactory {
    fn open(
        &self,
        ip: IpAddr,
        port: u16,
        direction: Direction,
        options: &InternalPipeOptions,
    ) -> Result<Arc<dyn PipeEndpoint>> {
        let addr = SocketAddr::new(ip, port);
        let socket = match options.protocol {
            PipeProtocol::Udp => UdpSocket::bind(addr).map(Socket::Udp),
            PipeProtocol::Tcp => {
                TcpListener::bind(addr).map(|listener| Socket::Tcp { listener, peer: None })
            }
        }
        .map_err(|e| DomainError::TransportCreationFailed(format!("bind {}: {}", addr, e)))?;

        Ok(Arc::new(SocketEndpoint {
            port,
            direction,
            socket: Mutex::new(Some(socket)),
        }))
    }
}
