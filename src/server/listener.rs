use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{error, info};

use super::client::ClientConnection;
use crate::backend::PoolConnector;
use crate::service::ServiceFacade;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const LISTEN_BACKLOG: u32 = 1024;

// -----------------------------------------------------------------------------
// ----- Server ----------------------------------------------------------------

pub struct Server<C: PoolConnector> {
    listener: TcpListener,
    facade: Arc<ServiceFacade<C>>,
}

// -----------------------------------------------------------------------------
// ----- Server: Static --------------------------------------------------------

impl<C: PoolConnector> Server<C> {
    /// Must be called from inside a tokio runtime.
    pub fn bind(addr: SocketAddr, facade: Arc<ServiceFacade<C>>) -> std::io::Result<Self> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };

        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;

        Ok(Self { listener, facade })
    }
}

// -----------------------------------------------------------------------------
// ----- Server: Public --------------------------------------------------------

impl<C: PoolConnector> Server<C> {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept clients until `shutdown` resolves. Clients already connected
    /// keep their tasks; only accepting stops.
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("listening on {}", self.local_addr()?);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("no longer accepting connections");
                    break;
                }

                accept_res = self.listener.accept() => {
                    let (stream, peer) = match accept_res {
                        Ok(v) => v,
                        Err(e) => { error!("accept error: {e}"); continue; }
                    };

                    let _ = stream.set_nodelay(true);

                    let facade = self.facade.clone();
                    tokio::spawn(async move {
                        let conn = ClientConnection::new(stream, peer, facade);

                        if let Err(e) = conn.serve().await {
                            error!("client {peer} error: {e}");
                        }
                    });
                }
            }
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
