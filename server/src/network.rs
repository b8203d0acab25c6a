//! Server network layer handling UDP communications and game loop coordination

use crate::bots::{BOT_ID_BASE, DEFAULT_AIM_INACCURACY};
use crate::client_manager::ClientManager;
use crate::projectile::StaticGeometry;
use crate::world::World;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{EntityId, Packet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: EntityId,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<EntityId>,
    },
}

/// Main server coordinating networking and the authoritative combat world
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: World,
    tick_duration: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        bot_count: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let mut world = World::new(Box::new(StaticGeometry::open_arena()));
        for i in 0..bot_count {
            world.spawn_bot(BOT_ID_BASE + i as EntityId, DEFAULT_AIM_INACCURACY);
        }

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            world,
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Address the server socket is bound to; handy when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<EntityId>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Processes incoming packets: connection management directly, combat
    /// requests through the world's gateway where every precondition is
    /// re-validated. Rejected requests change nothing and answer nothing.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                // Remove existing connection if present
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(existing_id);
                    self.world.despawn(existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                if let Some(client_id) = client_id {
                    self.world.spawn_player(client_id);
                    let response = Packet::Connected { client_id };
                    self.send_packet(&response, addr).await;
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                }
            }

            Packet::Disconnect => {
                if let Some(client_id) = self.client_at(addr).await {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(client_id);
                    self.world.despawn(client_id);
                }
            }

            Packet::RequestFire {
                origin,
                direction,
                speed: _,
            } => {
                if let Some(client_id) = self.client_at(addr).await {
                    self.touch(client_id).await;
                    let outcome = self.world.request_fire(client_id, origin, direction);
                    debug!("Fire request from {}: {:?}", client_id, outcome);
                }
            }

            Packet::RequestReload => {
                if let Some(client_id) = self.client_at(addr).await {
                    self.touch(client_id).await;
                    self.world.request_reload(client_id);
                }
            }

            Packet::RequestRespawn { ignore_alive_check } => {
                if let Some(client_id) = self.client_at(addr).await {
                    self.touch(client_id).await;
                    self.world.request_respawn(client_id, ignore_alive_check);
                }
            }

            Packet::RequestShield => {
                if let Some(client_id) = self.client_at(addr).await {
                    self.touch(client_id).await;
                    self.world.request_shield(client_id);
                }
            }

            Packet::RequestPulse => {
                if let Some(client_id) = self.client_at(addr).await {
                    self.touch(client_id).await;
                    self.world.request_pulse(client_id);
                }
            }

            Packet::SwitchWeapon { weapon } => {
                if let Some(client_id) = self.client_at(addr).await {
                    self.touch(client_id).await;
                    self.world.switch_weapon(client_id, weapon);
                }
            }

            Packet::PositionUpdate { position } => {
                if let Some(client_id) = self.client_at(addr).await {
                    self.touch(client_id).await;
                    self.world.update_position(client_id, position);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn client_at(&self, addr: SocketAddr) -> Option<EntityId> {
        let clients = self.clients.read().await;
        clients.find_client_by_addr(addr)
    }

    async fn touch(&self, client_id: EntityId) {
        let mut clients = self.clients.write().await;
        clients.touch(client_id);
    }

    /// Delivers this tick's events, filtered per receiver so owner-targeted
    /// feedback (damage indicator, countdown, empty click) stays private.
    async fn deliver_events(&mut self) {
        let events = self.world.drain_events();
        if events.is_empty() {
            return;
        }

        let seq = self.world.tick_count();
        let client_addrs = {
            let clients = self.clients.read().await;
            clients.get_client_addrs()
        };

        for (client_id, addr) in client_addrs {
            let visible: Vec<_> = events
                .iter()
                .filter(|e| e.to.includes(client_id))
                .map(|e| e.event.clone())
                .collect();

            if visible.is_empty() {
                continue;
            }
            let packet = Packet::Events {
                seq,
                events: visible,
            };
            self.send_packet(&packet, addr).await;
        }
    }

    /// Broadcasts the authoritative state snapshot to all connected clients
    async fn broadcast_snapshot(&mut self) {
        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };

        if client_count == 0 {
            return;
        }

        let (combatants, projectiles) = self.world.snapshot();

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let timestamp_safe = (timestamp.min(u64::MAX as u128)) as u64;

        let packet = Packet::Snapshot {
            tick: self.world.tick_count(),
            timestamp: timestamp_safe,
            combatants,
            projectiles,
        };

        self.broadcast_packet(&packet, None).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.world.despawn(client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.world.assign_bot_targets();
                    self.world.step(dt);
                    self.deliver_events().await;
                    self.broadcast_snapshot().await;

                    // Periodic monitoring
                    if self.world.tick_count() % 150 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };

                        if client_count > 0 {
                            debug!(
                                "Tick {}: {} clients, {} combatants, {} projectiles",
                                self.world.tick_count(),
                                client_count,
                                self.world.registry().len(),
                                self.world.projectile_count()
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
