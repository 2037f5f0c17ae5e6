//! # Raw TCP Transport
//!
//! Networked label printers listen on TCP port 9100 and interpret whatever
//! bytes arrive as printer language. There is no framing on the way in;
//! replies (to `~HS` and friends) come back on the same socket.
//!
//! Timeouts are applied by [`PrinterTransport`](super::PrinterTransport),
//! not here.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::{Connection, Connector};

const READ_BUF_SIZE: usize = 512;

/// Opens plain TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn Connection>> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        debug!(host, port, "TCP connection established");
        Ok(Box::new(TcpConnection {
            stream: Some(stream),
        }))
    }
}

/// A TCP stream that can be closed explicitly and idempotently.
pub struct TcpConnection {
    stream: Option<TcpStream>,
}

impl TcpConnection {
    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let stream = self.stream()?;
        stream.write_all(data).await?;
        stream.flush().await
    }

    async fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        let stream = self.stream()?;
        let mut buf = [0u8; READ_BUF_SIZE];
        let n = stream.read(&mut buf).await?;
        Ok(buf[..n].to_vec())
    }

    async fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => {
                // Peer may already be gone; the socket is released on drop either way.
                if let Err(e) = stream.shutdown().await {
                    debug!(error = %e, "shutdown after peer closed");
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}
