//! Client connection management for the authoritative server
//!
//! This module handles the server-side management of connected clients:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Address tracking for response routing and event delivery
//! - Capacity enforcement
//!
//! Combat requests are not buffered here: they are forwarded straight to the
//! world and validated against authoritative state on arrival, so there is
//! nothing to replay and nothing to reorder.

use log::info;
use shared::EntityId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Represents a connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server; doubles as the
    /// combatant id in the world
    pub id: EntityId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: EntityId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// Returns true if no packets have been received from this client
    /// within the timeout duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Provides centralized control over client connections, enforces the
/// server capacity limit, and maps addresses to combatant ids so incoming
/// requests can be attributed to the right requester.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<EntityId, Client>,
    /// Next available client ID for new connections
    next_client_id: EntityId,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection.
    ///
    /// Returns Some(client_id) if successful, None if the server is at
    /// capacity. Each client gets a unique ID and is associated with their
    /// network address for response routing.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<EntityId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let client = Client::new(client_id, addr);
        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, client);

        Some(client_id)
    }

    /// Removes a client from the server. Returns true if the client was
    /// found and removed, false if they were already gone.
    pub fn remove_client(&mut self, client_id: EntityId) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address.
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<EntityId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Marks a client as alive; called for every packet they send.
    pub fn touch(&mut self, client_id: EntityId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Checks for and removes timed-out clients, returning their ids so the
    /// world can despawn the matching combatants.
    pub fn check_timeouts(&mut self) -> Vec<EntityId> {
        let timeout = Duration::from_secs(5);
        let timed_out: Vec<EntityId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(*client_id);
        }

        timed_out
    }

    /// Gets all client IDs and their network addresses for packet
    /// distribution during the broadcast phase of the game loop.
    pub fn get_client_addrs(&self) -> Vec<(EntityId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
