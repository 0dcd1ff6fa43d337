//! Client-side login flow and world replica.

use std::time::{Duration, Instant};

use homestead_protocol::{
    ClientServerChatboxMessage, ClientServerEntityUpdate, ClientServerPlayerAuthenticate,
    ClientServerRequestHashedPassword, ClientServerTestUdp, ClientServerWorldLoaded, EntityId,
    EntityType, Packet, PlayerId, ServerClientSendHashedPassword,
};
use homestead_session::{SessionError, hash_password, verify_password};
use homestead_world::{ClientCharacterData, ClientWorld};
use tracing::{debug, info, trace, warn};

use crate::{HomesteadError, NetworkClient};

/// How often the test datagram repeats until a world is assigned.
pub const TEST_UDP_INTERVAL: Duration = Duration::from_millis(100);

/// Where a [`ClientSession`] is in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the server's stored hash of our password.
    RequestingHash,
    /// Login sent, waiting for our player id.
    Authenticating,
    /// Logged in. Probing the datagram channel until the server assigns
    /// a world.
    Probing,
    InWorld,
    /// The password didn't match the stored hash.
    Rejected,
}

/// Logs a player in and keeps a replica of the world they are in.
#[derive(Debug)]
pub struct ClientSession {
    client: NetworkClient,
    username: String,
    password: String,
    state: SessionState,
    player_id: PlayerId,
    world: Option<ClientWorld>,
    started: Instant,
    last_frame: Instant,
    last_test_udp: Option<Instant>,
    last_update_time: u64,
}

impl ClientSession {
    /// Starts logging in by asking for the stored password hash.
    ///
    /// # Errors
    /// Whatever [`NetworkClient::send`] returns.
    pub fn start(
        client: NetworkClient,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, HomesteadError> {
        let username = username.into();
        client.send(
            &ClientServerRequestHashedPassword {
                user_name: username.clone(),
            }
            .into(),
        )?;
        let now = Instant::now();
        Ok(Self {
            client,
            username,
            password: password.into(),
            state: SessionState::RequestingHash,
            player_id: PlayerId::NONE,
            world: None,
            started: now,
            last_frame: now,
            last_test_udp: None,
            last_update_time: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The replica of the current world, once one is loaded.
    pub fn world(&self) -> Option<&ClientWorld> {
        self.world.as_ref()
    }

    pub fn client(&self) -> &NetworkClient {
        &self.client
    }

    /// Entity id of the character we control, once the server has sent
    /// it.
    pub fn local_entity(&self) -> Option<EntityId> {
        self.world
            .as_ref()?
            .local_character()
            .map(|c| c.entity_id)
    }

    /// Processes everything received, sends a test datagram if one is
    /// due, and advances interpolation. Call once per frame.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the password is wrong, or a send
    /// error.
    pub fn update(&mut self) -> Result<usize, HomesteadError> {
        self.update_at(Instant::now())
    }

    /// [`update`](Self::update) with an explicit frame time.
    ///
    /// # Errors
    /// See [`update`](Self::update).
    pub fn update_at(&mut self, now: Instant) -> Result<usize, HomesteadError> {
        let packets = self.client.drain();
        let count = packets.len();
        for packet in packets {
            self.handle_packet(packet)?;
        }

        if self.state == SessionState::Probing
            && self
                .last_test_udp
                .is_none_or(|last| now.saturating_duration_since(last) >= TEST_UDP_INTERVAL)
        {
            trace!(player_id = %self.player_id, "sending test datagram");
            self.client.send(
                &ClientServerTestUdp {
                    player_id: self.player_id,
                }
                .into(),
            )?;
            self.last_test_udp = Some(now);
        }

        let frame_ms = now.saturating_duration_since(self.last_frame).as_secs_f32() * 1_000.0;
        self.last_frame = now;
        if let Some(world) = self.world.as_mut() {
            world.tick(frame_ms);
        }
        Ok(count)
    }

    fn handle_packet(&mut self, packet: Packet) -> Result<(), HomesteadError> {
        match packet {
            Packet::SendHashedPassword(reply) => self.on_hashed_password(reply),
            Packet::SetPlayerDetails(details) => {
                info!(player_id = %details.player_id, "logged in");
                self.player_id = details.player_id;
                self.state = SessionState::Probing;
                self.last_test_udp = None;
                Ok(())
            }
            Packet::LoadWorld(load) => {
                info!(world = %load.world_to_load, "loading world");
                self.world = Some(ClientWorld::new(load.world_to_load, self.player_id));
                self.state = SessionState::InWorld;
                self.client.send(&ClientServerWorldLoaded.into())
            }
            other => {
                let Some(world) = self.world.as_mut() else {
                    trace!(kind = %other.kind(), "packet before any world dropped");
                    return Ok(());
                };
                if let Err(e) = world.handle_packet(&other) {
                    debug!(kind = %other.kind(), error = %e, "world packet not applied");
                }
                Ok(())
            }
        }
    }

    fn on_hashed_password(
        &mut self,
        reply: ServerClientSendHashedPassword,
    ) -> Result<(), HomesteadError> {
        if reply.user_name != self.username || self.state != SessionState::RequestingHash {
            debug!(username = %reply.user_name, "unexpected hashed password ignored");
            return Ok(());
        }

        let hashed_password = if reply.hashed_password.is_empty() {
            debug!(username = %self.username, "new user, registering");
            hash_password(&self.password)
        } else if verify_password(&self.password, &reply.hashed_password) {
            reply.hashed_password
        } else {
            warn!(username = %self.username, "password does not match");
            self.state = SessionState::Rejected;
            return Err(SessionError::AuthFailed(format!(
                "password does not match for {}",
                self.username
            ))
            .into());
        };

        self.client.send(
            &ClientServerPlayerAuthenticate {
                user_name: self.username.clone(),
                hashed_password,
            }
            .into(),
        )?;
        self.state = SessionState::Authenticating;
        Ok(())
    }

    /// Tells the server where our character is now.
    ///
    /// Returns `false` without sending anything until the character has
    /// arrived from the server.
    ///
    /// # Errors
    /// Whatever [`NetworkClient::send`] returns.
    pub fn move_character(&mut self, x: f32, y: f32) -> Result<bool, HomesteadError> {
        let (Some(world), Some(entity_id)) = (self.world.as_ref(), self.local_entity()) else {
            return Ok(false);
        };

        let elapsed = u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX);
        let time_of_update = elapsed.max(self.last_update_time + 1);
        self.last_update_time = time_of_update;

        let packet: Packet = ClientServerEntityUpdate {
            player_id: self.player_id,
            entity_id,
            time_of_update,
            entity_type: EntityType::Character,
            data: ClientCharacterData {
                player_id: self.player_id,
                world_name: world.name().to_owned(),
                x,
                y,
            }
            .to_blob(),
        }
        .into();
        self.client.send(&packet)?;
        Ok(true)
    }

    /// Sends a chat line to everyone else in the world.
    ///
    /// # Errors
    /// Whatever [`NetworkClient::send`] returns.
    pub fn chat(&self, message: impl Into<String>) -> Result<(), HomesteadError> {
        self.client.send(
            &ClientServerChatboxMessage {
                message: message.into(),
            }
            .into(),
        )
    }

    /// Closes the connection.
    pub fn shutdown(&mut self) {
        self.client.shutdown();
    }
}
