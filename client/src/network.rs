//! Client network loop: connect, send requests, consume replicated state.

use crate::game::ClientCombatState;
use crate::input::{ClientIntent, DemoPilot};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    connected: bool,

    pub state: ClientCombatState,
    pilot: DemoPilot,

    fake_ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        fire_period: f64,
        shield_period: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            connected: false,
            state: ClientCombatState::new(),
            pilot: DemoPilot::new(fire_period, shield_period),
            fake_ping_ms,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.state.client_id = Some(client_id);
                self.connected = true;
            }

            Packet::Snapshot {
                tick,
                combatants,
                projectiles,
                ..
            } => {
                self.state.apply_snapshot(tick, combatants, projectiles);
            }

            Packet::Events { seq, events } => {
                self.state.apply_events(seq, events);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.state.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Turns pilot intents into requests. Fire intents are gated by local
    /// prediction so we do not spam requests the authority would reject,
    /// and the predicted tracer plays immediately.
    async fn send_intents(&mut self) {
        if !self.connected {
            return;
        }

        let intents = self.pilot.decide(&self.state);
        for intent in intents {
            let packet = match intent {
                ClientIntent::Fire { origin, direction } => {
                    if !self.state.try_predict_fire(direction) {
                        continue;
                    }
                    let speed = self
                        .state
                        .me()
                        .map(|me| me.weapon.spec().bullet_speed)
                        .unwrap_or_default();
                    Packet::RequestFire {
                        origin,
                        direction,
                        speed,
                    }
                }
                ClientIntent::Reload => Packet::RequestReload,
                ClientIntent::Respawn => Packet::RequestRespawn {
                    ignore_alive_check: false,
                },
                ClientIntent::Shield => Packet::RequestShield,
            };

            if let Err(e) = self.send_packet(&packet).await {
                error!("Error sending request: {}", e);
            }
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut intent_interval = interval(Duration::from_millis(50));
        let mut update_interval = interval(Duration::from_millis(16));

        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet);
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = intent_interval.tick() => {
                    self.send_intents().await;
                },

                _ = update_interval.tick() => {
                    self.state.update(0.016);
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    break;
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
