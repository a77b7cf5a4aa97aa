//! TCP server for the initiative tracker
//!
//! Owns the room store and identity tracker. Every mutating session event
//! follows the same pattern: take the state lock, apply the mutation, then
//! broadcast the full room snapshot to every connection joined to that
//! room. Kicks for removed players go out before the snapshot.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use skirmish_core::{
    load_encounter, ClearPolicy, ConnId, GmDirectory, IdentityTracker, RoomStore,
};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientEvent, Request, Response, ServerEvent};

/// Outbound queue depth per connection
const SESSION_QUEUE: usize = 64;

/// A joined connection's registration.
struct Session {
    room: String,
    gm: bool,
    tx: mpsc::Sender<ServerEvent>,
}

/// Server state shared across connection tasks.
///
/// The write lock is held across each full read-mutate-broadcast-collect
/// sequence, so no connection ever observes a partial mutation.
struct ServerState {
    store: RoomStore,
    tracker: IdentityTracker,
    sessions: HashMap<ConnId, Session>,
}

impl ServerState {
    /// Snapshot event plus the senders of every session joined to `room`.
    fn broadcast_set(&self, room: &str) -> Option<(ServerEvent, Vec<mpsc::Sender<ServerEvent>>)> {
        let snapshot = ServerEvent::room_update(self.store.state(room)?);
        let targets = self
            .sessions
            .values()
            .filter(|s| s.room == room)
            .map(|s| s.tx.clone())
            .collect();
        Some((snapshot, targets))
    }

    /// Senders for every connection tracked to the given entry.
    fn kick_set(&self, entry: Uuid) -> Vec<mpsc::Sender<ServerEvent>> {
        self.tracker
            .connections_for(entry)
            .into_iter()
            .filter_map(|conn| self.sessions.get(&conn).map(|s| s.tx.clone()))
            .collect()
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener on
    pub bind: IpAddr,
    /// Bind port; 0 picks a free one
    pub port: u16,
    /// Host name/address reported by the `server-config` request
    pub advertised_host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: crate::DEFAULT_PORT,
            advertised_host: "localhost".to_string(),
        }
    }
}

/// Server handle
pub struct Server {
    addr: SocketAddr,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start serving.
    pub async fn start(config: ServerConfig, directory: Arc<dyn GmDirectory>) -> Result<Self> {
        let addr = SocketAddr::new(config.bind, config.port);
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let state = Arc::new(RwLock::new(ServerState {
            store: RoomStore::new(),
            tracker: IdentityTracker::new(),
            sessions: HashMap::new(),
        }));

        let shared = Arc::new(Shared {
            state: state.clone(),
            directory,
            advertised_host: config.advertised_host,
            port: bound_addr.port(),
        });

        tokio::spawn(accept_loop(listener, shared, shutdown_tx.subscribe()));

        Ok(Server {
            addr: bound_addr,
            state,
            shutdown_tx,
        })
    }

    /// The server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of sessions currently joined to a room (diagnostics)
    pub async fn session_count(&self, room: &str) -> usize {
        let state = self.state.read().await;
        state.sessions.values().filter(|s| s.room == room).count()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Immutable context shared by all connection tasks.
struct Shared {
    state: Arc<RwLock<ServerState>>,
    directory: Arc<dyn GmDirectory>,
    advertised_host: String,
    port: u16,
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        let shared = shared.clone();
                        tokio::spawn(handle_connection(stream, addr, shared));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single connection: first frame decides one-shot vs session.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, shared: Arc<Shared>) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    let request: Request = match read_frame(&mut reader).await {
        Ok(request) => request,
        Err(Error::ConnectionClosed) => return,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Bad initial frame");
            return;
        }
    };

    match request {
        Request::Connect { gm_name, gm } => {
            run_session(reader, writer, addr, shared, gm_name, gm).await;
        }
        other => {
            let response = handle_request(other, &shared).await;
            if let Err(e) = write_frame(&mut writer, &response).await {
                debug!(addr = %addr, error = %e, "One-shot reply failed");
            }
        }
    }
}

/// Answer a one-shot request.
async fn handle_request(request: Request, shared: &Shared) -> Response {
    match request {
        Request::LoginGm { name, password } => {
            let Some(profile) = shared.directory.lookup(&name) else {
                warn!(%name, "Login rejected: unknown GM");
                return Response::LoginFailed {
                    message: "Invalid credentials".to_string(),
                };
            };
            if !profile.check_password(&password) {
                warn!(%name, "Login rejected: bad password");
                return Response::LoginFailed {
                    message: "Invalid credentials".to_string(),
                };
            }
            // Idempotent: an existing room is reused so a GM can reconnect
            // without losing board state
            let mut state = shared.state.write().await;
            state.store.create_room(&name);
            info!(%name, "GM logged in");
            Response::LoginOk { gm_name: name }
        }

        Request::ListGms => {
            let state = shared.state.read().await;
            Response::GmList {
                gms: state.store.active_keys(),
            }
        }

        Request::FetchEncounters { gm_name } => {
            let state = shared.state.read().await;
            if !state.store.has_room(&gm_name) {
                return Response::Error {
                    message: "Room does not exist".to_string(),
                };
            }
            let encounters = shared
                .directory
                .lookup(&gm_name)
                .map(|p| p.encounters)
                .unwrap_or_default();
            Response::EncounterList { encounters }
        }

        Request::DeleteRoom { gm_name } => {
            let mut state = shared.state.write().await;
            let _ = state.store.delete_room(&gm_name);
            info!(%gm_name, "Room deleted");
            Response::RoomDeleted
        }

        Request::ServerConfig => Response::ServerConfig {
            host: shared.advertised_host.clone(),
            port: shared.port,
        },

        Request::Connect { .. } => unreachable!("connect handled by caller"),
    }
}

/// Run a persistent session: validate the room, register, snapshot, then
/// dispatch events until the transport closes.
async fn run_session(
    mut reader: ReadHalf<TcpStream>,
    writer: WriteHalf<TcpStream>,
    addr: SocketAddr,
    shared: Arc<Shared>,
    room: String,
    gm: bool,
) {
    let conn: ConnId = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(SESSION_QUEUE);

    // Connect-time validation is the only per-room check; handlers trust
    // the room afterwards because rooms are never auto-deleted mid-session.
    {
        let mut state = shared.state.write().await;
        let Some(room_state) = state.store.state(&room) else {
            warn!(addr = %addr, %room, "Rejected: room does not exist");
            drop(state);
            let mut writer = writer;
            let _ = write_frame(
                &mut writer,
                &ServerEvent::Error {
                    message: "Room does not exist".to_string(),
                },
            )
            .await;
            return;
        };
        let snapshot = ServerEvent::room_update(room_state);
        state.sessions.insert(
            conn,
            Session {
                room: room.clone(),
                gm,
                tx: tx.clone(),
            },
        );
        // Joined connections immediately get the full current state so a
        // reconnecting client is never left stale
        let _ = tx.send(snapshot).await;
    }

    info!(addr = %addr, %conn, %room, gm, "Session joined");

    let writer_handle = tokio::spawn(writer_task(writer, rx));

    loop {
        match read_frame::<_, ClientEvent>(&mut reader).await {
            Ok(event) => {
                handle_event(event, conn, &room, gm, &shared).await;
            }
            Err(Error::ConnectionClosed) => {
                debug!(%conn, "Connection closed");
                break;
            }
            Err(e) => {
                // Malformed payloads close the offending connection; room
                // state is untouched
                warn!(%conn, error = %e, "Read error");
                break;
            }
        }
    }

    writer_handle.abort();
    {
        let mut state = shared.state.write().await;
        state.sessions.remove(&conn);
        state.tracker.untrack(conn);
    }

    info!(%conn, %room, "Session disconnected");
}

/// Writer task - sends events to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<ServerEvent>) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &event).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

/// Apply one session event: mutate under the write lock, collect kick and
/// broadcast targets, send after the lock drops.
async fn handle_event(event: ClientEvent, conn: ConnId, room: &str, gm: bool, shared: &Shared) {
    let mut kicks: Vec<mpsc::Sender<ServerEvent>> = Vec::new();

    let broadcast_set = {
        let mut state = shared.state.write().await;

        match event {
            ClientEvent::JoinRoom(player) => {
                // A reloading tab reclaims its seat instead of creating a
                // ghost entry
                let existing =
                    state
                        .store
                        .find_returning_player(room, &player.name, &player.color);
                match existing {
                    Some(id) => {
                        debug!(%conn, %id, "Rejoin matched existing entry");
                        state.tracker.track(conn, id);
                    }
                    None => {
                        if let Some(entry) = state.store.add_player(room, player) {
                            state.tracker.track(conn, entry.id);
                        }
                    }
                }
            }

            ClientEvent::AddMonster(monster) => {
                let _ = state.store.add_monster(room, monster);
            }

            ClientEvent::UpdateEntry(entry) => {
                let _ = state.store.update_entry(room, entry);
            }

            ClientEvent::ReorderEntries { from, to } => {
                let _ = state.store.reorder_entries(room, from, to);
            }

            ClientEvent::NextTurn => {
                let _ = state.store.next_turn(room);
            }

            ClientEvent::RemoveEntry { id } => {
                let is_player = state
                    .store
                    .entry_by_id(room, id)
                    .map(|e| !e.is_monster)
                    .unwrap_or(false);
                if state.store.remove_entry(room, id).applied() && is_player {
                    // Monsters never kick: no connection owns them
                    kicks.extend(state.kick_set(id));
                    state.tracker.untrack_entry(id);
                }
            }

            ClientEvent::ToggleHidden { id } => {
                let _ = state.store.toggle_hidden(room, id);
            }

            ClientEvent::SortByInitiative => {
                let _ = state.store.sort_by_initiative(room);
            }

            ClientEvent::ClearAllPlayers => {
                for id in state.store.clear_all_entries(room) {
                    kicks.extend(state.kick_set(id));
                    state.tracker.untrack_entry(id);
                }
            }

            ClientEvent::LoadEncounter {
                encounter_name,
                clear_room,
                clear_players,
                clear_monsters,
            } => {
                let Some(template) = shared
                    .directory
                    .lookup(room)
                    .and_then(|p| p.encounter(&encounter_name).cloned())
                else {
                    debug!(%conn, room, %encounter_name, "Unknown encounter template");
                    return;
                };
                let policy = ClearPolicy::from_flags(
                    clear_room,
                    clear_players,
                    clear_monsters.unwrap_or(false),
                );
                let outcome = load_encounter(
                    &mut state.store,
                    room,
                    &template,
                    policy,
                    &mut rand::thread_rng(),
                );
                for id in outcome.kicked_players {
                    kicks.extend(state.kick_set(id));
                    state.tracker.untrack_entry(id);
                }
            }
        }

        debug!(%conn, room, gm, "Event applied");
        state.broadcast_set(room)
    };

    // Kick signals go out before the room-state broadcast
    for tx in kicks {
        let _ = tx.send(ServerEvent::Kicked).await;
    }

    if let Some((snapshot, targets)) = broadcast_set {
        for tx in targets {
            let _ = tx.send(snapshot.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use skirmish_core::{
        EncounterTemplate, GmProfile, MonsterTemplate, NewMonster, NewPlayer, StaticDirectory,
    };
    use std::time::Duration;
    use tokio::time::timeout;

    fn directory() -> Arc<dyn GmDirectory> {
        Arc::new(StaticDirectory::new([GmProfile {
            name: "Alice".to_string(),
            password: "secret".to_string(),
            encounters: vec![EncounterTemplate {
                name: "Encounter 1".to_string(),
                monsters: vec![MonsterTemplate {
                    name: "Bad Guy 1".to_string(),
                    roll: Some(17),
                    color: Some("#000000".to_string()),
                    hidden: None,
                }],
            }],
        }]))
    }

    async fn start_server() -> Server {
        Server::start(
            ServerConfig {
                port: 0,
                ..ServerConfig::default()
            },
            directory(),
        )
        .await
        .unwrap()
    }

    async fn next_event(session: &mut crate::client::Session) -> ServerEvent {
        timeout(Duration::from_secs(5), session.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("session closed")
    }

    fn player(name: &str) -> NewPlayer {
        NewPlayer {
            name: name.to_string(),
            roll: 10,
            color: "#336699".to_string(),
            text_color: None,
        }
    }

    #[tokio::test]
    async fn test_binds_to_configured_address() {
        let server = Server::start(
            ServerConfig {
                bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 0,
                advertised_host: "localhost".to_string(),
            },
            directory(),
        )
        .await
        .unwrap();

        assert_eq!(server.addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));

        // The loopback listener still serves requests
        let response = Client::new(server.addr()).list_gms().await.unwrap();
        assert_eq!(response, Response::GmList { gms: vec![] });

        server.shutdown();
    }

    #[tokio::test]
    async fn test_login_creates_room_idempotently() {
        let server = start_server().await;
        let addr = server.addr();

        let response = Client::new(addr).login_gm("Alice", "secret").await.unwrap();
        assert_eq!(
            response,
            Response::LoginOk {
                gm_name: "Alice".to_string()
            }
        );

        // Second login reuses the room
        let response = Client::new(addr).login_gm("Alice", "secret").await.unwrap();
        assert!(matches!(response, Response::LoginOk { .. }));

        let gms = Client::new(addr).list_gms().await.unwrap();
        assert_eq!(gms, Response::GmList { gms: vec!["Alice".to_string()] });

        server.shutdown();
    }

    #[tokio::test]
    async fn test_bad_credentials_rejected_without_room() {
        let server = start_server().await;
        let addr = server.addr();

        let response = Client::new(addr).login_gm("Alice", "wrong").await.unwrap();
        assert!(matches!(response, Response::LoginFailed { .. }));

        let gms = Client::new(addr).list_gms().await.unwrap();
        assert_eq!(gms, Response::GmList { gms: vec![] });

        server.shutdown();
    }

    #[tokio::test]
    async fn test_connect_to_unknown_room_errors() {
        let server = start_server().await;

        let mut session = Client::new(server.addr())
            .connect("Nobody", false)
            .await
            .unwrap();
        let event = next_event(&mut session).await;
        assert!(matches!(event, ServerEvent::Error { .. }));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_join_broadcasts_full_snapshot() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let mut gm = Client::new(addr).connect("Alice", true).await.unwrap();
        // Joined connections get the snapshot immediately
        assert!(matches!(
            next_event(&mut gm).await,
            ServerEvent::RoomUpdate { ref entries, .. } if entries.is_empty()
        ));

        let mut bob = Client::new(addr).connect("Alice", false).await.unwrap();
        let _ = next_event(&mut bob).await;
        assert_eq!(server.session_count("Alice").await, 2);

        bob.send(ClientEvent::JoinRoom(player("Bob"))).await.unwrap();

        // Both the GM and Bob see the mutation
        for session in [&mut gm, &mut bob] {
            match next_event(session).await {
                ServerEvent::RoomUpdate { entries, .. } => {
                    assert_eq!(entries.len(), 1);
                    assert_eq!(entries[0].name, "Bob");
                    assert!(!entries[0].is_monster);
                }
                other => panic!("wrong event: {other:?}"),
            }
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_remove_player_kicks_their_connection() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let mut gm = Client::new(addr).connect("Alice", true).await.unwrap();
        let _ = next_event(&mut gm).await;

        let mut dee = Client::new(addr).connect("Alice", false).await.unwrap();
        let _ = next_event(&mut dee).await;
        dee.send(ClientEvent::JoinRoom(player("Dee"))).await.unwrap();
        let _ = next_event(&mut dee).await;

        let dee_id = match next_event(&mut gm).await {
            ServerEvent::RoomUpdate { entries, .. } => entries[0].id,
            other => panic!("wrong event: {other:?}"),
        };

        gm.send(ClientEvent::RemoveEntry { id: dee_id }).await.unwrap();

        // Dee's connection gets the kick before the snapshot
        assert!(matches!(next_event(&mut dee).await, ServerEvent::Kicked));
        match next_event(&mut gm).await {
            ServerEvent::RoomUpdate { entries, .. } => assert!(entries.is_empty()),
            other => panic!("wrong event: {other:?}"),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_clear_all_players_kicks_everyone_and_empties_board() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let mut gm = Client::new(addr).connect("Alice", true).await.unwrap();
        let _ = next_event(&mut gm).await;
        gm.send(ClientEvent::AddMonster(NewMonster {
            name: "Ogre".to_string(),
            roll: 12,
            color: "#000".to_string(),
            hidden: false,
        }))
        .await
        .unwrap();
        let _ = next_event(&mut gm).await;

        let mut bob = Client::new(addr).connect("Alice", false).await.unwrap();
        let _ = next_event(&mut bob).await;
        bob.send(ClientEvent::JoinRoom(player("Bob"))).await.unwrap();
        let _ = next_event(&mut bob).await;
        let _ = next_event(&mut gm).await;

        gm.send(ClientEvent::ClearAllPlayers).await.unwrap();

        assert!(matches!(next_event(&mut bob).await, ServerEvent::Kicked));
        // Monsters go too, even though only players are kicked
        match next_event(&mut gm).await {
            ServerEvent::RoomUpdate {
                entries,
                current_turn_index,
            } => {
                assert!(entries.is_empty());
                assert_eq!(current_turn_index, 0);
            }
            other => panic!("wrong event: {other:?}"),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_rejoin_reclaims_existing_entry() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let mut first_tab = Client::new(addr).connect("Alice", false).await.unwrap();
        let _ = next_event(&mut first_tab).await;
        first_tab
            .send(ClientEvent::JoinRoom(player("Bob")))
            .await
            .unwrap();
        let _ = next_event(&mut first_tab).await;

        // Same name and color from a fresh connection: no ghost entry
        let mut second_tab = Client::new(addr).connect("Alice", false).await.unwrap();
        let _ = next_event(&mut second_tab).await;
        second_tab
            .send(ClientEvent::JoinRoom(player("Bob")))
            .await
            .unwrap();

        match next_event(&mut second_tab).await {
            ServerEvent::RoomUpdate { entries, .. } => assert_eq!(entries.len(), 1),
            other => panic!("wrong event: {other:?}"),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_load_encounter_applies_template() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let mut gm = Client::new(addr).connect("Alice", true).await.unwrap();
        let _ = next_event(&mut gm).await;

        gm.send(ClientEvent::LoadEncounter {
            encounter_name: "Encounter 1".to_string(),
            clear_room: false,
            clear_players: false,
            clear_monsters: None,
        })
        .await
        .unwrap();

        match next_event(&mut gm).await {
            ServerEvent::RoomUpdate { entries, .. } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].name, "Bad Guy 1");
                assert_eq!(entries[0].roll, 17);
                assert!(entries[0].is_monster);
            }
            other => panic!("wrong event: {other:?}"),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_fetch_encounters_and_server_config() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let response = Client::new(addr).fetch_encounters("Alice").await.unwrap();
        match response {
            Response::EncounterList { encounters } => {
                assert_eq!(encounters.len(), 1);
                assert_eq!(encounters[0].name, "Encounter 1");
            }
            other => panic!("wrong response: {other:?}"),
        }

        let response = Client::new(addr).server_config().await.unwrap();
        assert_eq!(
            response,
            Response::ServerConfig {
                host: "localhost".to_string(),
                port: addr.port(),
            }
        );

        server.shutdown();
    }

    #[tokio::test]
    async fn test_delete_room_then_connect_fails() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let response = Client::new(addr).delete_room("Alice").await.unwrap();
        assert_eq!(response, Response::RoomDeleted);

        let mut session = Client::new(addr).connect("Alice", false).await.unwrap();
        assert!(matches!(
            next_event(&mut session).await,
            ServerEvent::Error { .. }
        ));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_turn_rotation_over_the_wire() {
        let server = start_server().await;
        let addr = server.addr();
        Client::new(addr).login_gm("Alice", "secret").await.unwrap();

        let mut gm = Client::new(addr).connect("Alice", true).await.unwrap();
        let _ = next_event(&mut gm).await;

        for name in ["Bob", "Cara"] {
            gm.send(ClientEvent::JoinRoom(player(name))).await.unwrap();
            let _ = next_event(&mut gm).await;
        }

        gm.send(ClientEvent::NextTurn).await.unwrap();
        match next_event(&mut gm).await {
            ServerEvent::RoomUpdate {
                current_turn_index, ..
            } => assert_eq!(current_turn_index, 1),
            other => panic!("wrong event: {other:?}"),
        }

        server.shutdown();
    }
}
