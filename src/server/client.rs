use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};
use tracing::{debug, error};

use super::frame::{Reply, Request};
use crate::backend::PoolConnector;
use crate::service::ServiceFacade;

// -----------------------------------------------------------------------------
// ----- ClientConnection ------------------------------------------------------

/// One accepted socket. Requests are handled in arrival order, one at a time,
/// so replies come back in the same order.
pub(crate) struct ClientConnection<C: PoolConnector> {
    peer: SocketAddr,
    lines: Lines<BufReader<OwnedReadHalf>>,
    outbox: mpsc::UnboundedSender<Bytes>,
    facade: Arc<ServiceFacade<C>>,
}

// -----------------------------------------------------------------------------
// ----- ClientConnection: Static ----------------------------------------------

impl<C: PoolConnector> ClientConnection<C> {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr, facade: Arc<ServiceFacade<C>>) -> Self {
        let (reader, writer) = stream.into_split();

        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel::<Bytes>();
        spawn_writer_task(writer, outbox_rx);

        Self {
            peer,
            lines: BufReader::new(reader).lines(),
            outbox: outbox_tx,
            facade,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ClientConnection: Public ----------------------------------------------

impl<C: PoolConnector> ClientConnection<C> {
    pub(crate) async fn serve(mut self) -> std::io::Result<()> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let reply = dispatch(&self.facade, line).await;
            let frame = reply.to_bytes().map_err(std::io::Error::other)?;

            if self.outbox.send(frame).is_err() {
                // writer is gone; the socket is dead
                break;
            }
        }

        debug!("client {} disconnected", self.peer);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Dispatch ----------------------------------------------------

pub(crate) async fn dispatch<C: PoolConnector>(facade: &ServiceFacade<C>, line: &str) -> Reply {
    let request = match Request::parse(line) {
        Ok(request) => request,
        Err(e) => return Reply::bad_request(format!("malformed request: {e}")),
    };

    debug!(op = request.op(), "dispatching request");

    match request {
        Request::GetConnection(req) => Reply::from_result(facade.get_connection(req).await),
        Request::ReleaseConnection(req) => Reply::from_result(facade.release_connection(req)),
        Request::GetPoolStats(req) => Reply::from_result(facade.get_pool_stats(req)),
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn spawn_writer_task(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(mut buf) = rx.recv().await {
            if let Err(e) = writer.write_all_buf(&mut buf).await {
                error!("reply write failed: {e}");
                break;
            }

            // coalesce bursts to cut syscalls
            while let Ok(mut more) = rx.try_recv() {
                if writer.write_all_buf(&mut more).await.is_err() {
                    return;
                }
            }
        }

        let _ = writer.shutdown().await;
    });
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
