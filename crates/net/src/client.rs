//! TCP client for the initiative tracker
//!
//! One-shot requests (login, directory listings, encounter fetches) open a
//! short-lived connection, exchange a single request/response pair, and
//! close. [`Client::connect`] instead upgrades the connection to a
//! persistent [`Session`] that receives room snapshots and kick signals.

use std::net::SocketAddr;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientEvent, Request, Response, ServerEvent};

/// Entry point for talking to a server.
#[derive(Debug, Clone, Copy)]
pub struct Client {
    addr: SocketAddr,
}

impl Client {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Send one request, read one response, close.
    pub async fn request(&self, request: Request) -> Result<Response> {
        let stream = TcpStream::connect(self.addr).await?;
        let (mut reader, mut writer) = tokio::io::split(stream);
        write_frame(&mut writer, &request).await?;
        read_frame(&mut reader).await
    }

    /// Create-or-login a GM session. A `LoginOk` response means the room
    /// exists (freshly created or reused across a reconnect).
    pub async fn login_gm(&self, name: &str, password: &str) -> Result<Response> {
        self.request(Request::LoginGm {
            name: name.to_string(),
            password: password.to_string(),
        })
        .await
    }

    /// Directory of GMs currently running a session.
    pub async fn list_gms(&self) -> Result<Response> {
        self.request(Request::ListGms).await
    }

    /// The named GM's encounter templates.
    pub async fn fetch_encounters(&self, gm_name: &str) -> Result<Response> {
        self.request(Request::FetchEncounters {
            gm_name: gm_name.to_string(),
        })
        .await
    }

    /// Administrative room deletion.
    pub async fn delete_room(&self, gm_name: &str) -> Result<Response> {
        self.request(Request::DeleteRoom {
            gm_name: gm_name.to_string(),
        })
        .await
    }

    /// Effective host/port the server believes clients should use.
    pub async fn server_config(&self) -> Result<Response> {
        self.request(Request::ServerConfig).await
    }

    /// Open a persistent session against a GM's room.
    ///
    /// The server answers with either an immediate `room-update` snapshot
    /// or an `error` event followed by disconnection; both arrive through
    /// [`Session::next_event`].
    pub async fn connect(&self, gm_name: &str, gm: bool) -> Result<Session> {
        info!(addr = %self.addr, gm_name, gm, "Connecting session");

        let stream = TcpStream::connect(self.addr).await?;
        let (reader, mut writer) = tokio::io::split(stream);

        write_frame(
            &mut writer,
            &Request::Connect {
                gm_name: gm_name.to_string(),
                gm,
            },
        )
        .await?;

        let (event_tx, event_rx) = mpsc::channel(64);
        let read_task = tokio::spawn(read_task(reader, event_tx));

        Ok(Session {
            writer: Some(writer),
            event_rx,
            read_task,
        })
    }
}

/// A live session: send events, receive snapshots and kicks.
pub struct Session {
    writer: Option<WriteHalf<TcpStream>>,
    event_rx: mpsc::Receiver<ServerEvent>,
    read_task: tokio::task::JoinHandle<()>,
}

impl Session {
    /// Next event from the server; `None` once the connection is gone.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.event_rx.recv().await
    }

    /// Send a session event.
    pub async fn send(&mut self, event: ClientEvent) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::NotConnected)?;
        write_frame(writer, &event).await
    }

    /// Drop the transport; the server sees a plain disconnect. Both halves
    /// of the split stream have to go away for the socket to close.
    pub fn disconnect(&mut self) {
        self.writer = None;
        self.read_task.abort();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

/// Forward inbound frames to the session's event channel until the
/// transport closes.
async fn read_task(mut reader: ReadHalf<TcpStream>, event_tx: mpsc::Sender<ServerEvent>) {
    loop {
        match read_frame::<_, ServerEvent>(&mut reader).await {
            Ok(event) => {
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(Error::ConnectionClosed) => {
                debug!("Server closed the connection");
                break;
            }
            Err(e) => {
                debug!(error = %e, "Read error");
                break;
            }
        }
    }
}
