use axum::serve::Listener;
use log::*;
use service::ConnectionCounter;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

/// TCP listener that keeps a live count of the connections it has accepted.
pub struct CountingListener {
    inner: TcpListener,
    connections: ConnectionCounter,
}

impl CountingListener {
    pub async fn bind<A: ToSocketAddrs>(addr: A, connections: ConnectionCounter) -> io::Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        Ok(Self { inner, connections })
    }
}

impl Listener for CountingListener {
    type Io = CountedStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        // Accept errors are retried by the inner listener
        let (stream, addr) = <TcpListener as Listener>::accept(&mut self.inner).await;
        self.connections.opened();
        trace!("Accepted connection from {addr}");

        let stream = CountedStream {
            inner: stream,
            connections: self.connections.clone(),
        };
        (stream, addr)
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// Accepted connection; decrements the open connection count when dropped.
pub struct CountedStream {
    inner: TcpStream,
    connections: ConnectionCounter,
}

impl Drop for CountedStream {
    fn drop(&mut self) {
        self.connections.closed();
    }
}

impl AsyncRead for CountedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for CountedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_accepted_connections_until_dropped() {
        let connections = ConnectionCounter::new();
        let mut listener = CountingListener::bind("127.0.0.1:0", connections.clone())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (accepted, _) = listener.accept().await;
        assert_eq!(connections.current(), 1);

        drop(accepted);
        assert_eq!(connections.current(), 0);
    }
}
