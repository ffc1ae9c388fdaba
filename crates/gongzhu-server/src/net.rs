//! TCP accept loop and per-connection plumbing.

use std::net::SocketAddr;
use std::sync::Arc;

use gongzhu_protocol::{ClientMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::table::Table;
use crate::{ServerConfig, ServerError};

/// The listening socket plus the one table it feeds.
pub struct GameServer {
    listener: TcpListener,
    table: Arc<Table>,
}

impl GameServer {
    /// Binds the listening socket and creates the table.
    ///
    /// # Errors
    /// Returns [`ServerError::Io`] if the address cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Self {
            table: Table::new(config),
            listener,
        })
    }

    /// The bound address. Useful when binding to port zero in tests.
    ///
    /// # Errors
    /// Returns [`ServerError::Io`] if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Runs the table driver and the accept loop forever.
    pub async fn run(self) {
        tokio::spawn(Arc::clone(&self.table).run_driver());
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "connection accepted");
                    let table = Arc::clone(&self.table);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, table).await
                        {
                            debug!(peer = %peer, error = %e, "connection ended");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Drives one connection: greets it, negotiates a seat, then hands the
/// read half to the seat's listener until the connection closes.
async fn handle_connection(
    stream: TcpStream,
    table: Arc<Table>,
) -> Result<(), ServerError> {
    let (read_half, mut write_half) = stream.into_split();
    let (outbound, mut outbox) =
        mpsc::unbounded_channel::<ServerMessage>();

    // Writer task: serializes every outbound message onto the socket.
    tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            let line = format!("{msg}\n");
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let send = |msg: ServerMessage| {
        // A failed send means the writer task is gone; the read side
        // will observe the close shortly.
        let _ = outbound.send(msg);
    };
    send(ServerMessage::Welcome);

    let mut lines = BufReader::new(read_half).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        match ClientMessage::parse(&line) {
            Ok(ClientMessage::SitDown {
                seat,
                avatar,
                name,
            }) => {
                match table
                    .seat_player(seat, avatar, name, outbound.clone())
                    .await
                {
                    Ok(agent) => {
                        agent.run_listener(table, lines).await;
                        return Ok(());
                    }
                    Err(e) => {
                        debug!(seat = %seat, error = %e, "sit-down rejected");
                        send(ServerMessage::DoNotSit);
                    }
                }
            }
            Ok(other) => {
                warn!(message = ?other, "message before sit-down ignored");
            }
            Err(e) => {
                warn!(error = %e, line = %line, "ignoring unparseable line");
            }
        }
    }
}
