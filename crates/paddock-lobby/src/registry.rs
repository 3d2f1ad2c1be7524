//! Lobby registry: creates, tracks, and deletes lobbies.

use std::collections::HashMap;

use paddock_protocol::{ClientId, LobbyId, LobbySummary};
use paddock_session::IdentityIssuer;
use paddock_transport::ConnectionId;

use crate::{Lobby, LobbyConfig, LobbyError};

/// Every live lobby, keyed by id.
///
/// This is the entry point for lobby operations from the coordinator.
/// It owns the lobbies outright; nothing outside it mutates a [`Lobby`].
///
/// `list()` returns lobbies in creation order, so two calls with no
/// mutation in between always agree.
#[derive(Debug)]
pub struct LobbyRegistry {
    lobbies: HashMap<LobbyId, Lobby>,

    /// Lobby ids in creation order.
    order: Vec<LobbyId>,

    issuer: IdentityIssuer,
    config: LobbyConfig,
}

impl LobbyRegistry {
    /// Creates an empty registry.
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            lobbies: HashMap::new(),
            order: Vec::new(),
            issuer: IdentityIssuer,
            config,
        }
    }

    /// Creates a lobby with `host` as host and sole member.
    pub fn create(&mut self, host: ClientId, connection: ConnectionId) -> LobbyId {
        let lobby_id = loop {
            let candidate: LobbyId = self.issuer.issue();
            if !self.lobbies.contains_key(&candidate) {
                break candidate;
            }
        };

        tracing::info!(%lobby_id, host = %host, "lobby created");
        let lobby = Lobby::new(lobby_id.clone(), host, connection, self.config.capacity);
        self.lobbies.insert(lobby_id.clone(), lobby);
        self.order.push(lobby_id.clone());
        lobby_id
    }

    /// Adds `client` to a lobby.
    ///
    /// # Errors
    /// - [`LobbyError::NotFound`]: no such lobby
    /// - [`LobbyError::Full`]: the lobby is at capacity
    /// - [`LobbyError::AlreadyMember`]: `client` is already in it
    pub fn join(
        &mut self,
        lobby_id: &LobbyId,
        client: ClientId,
        connection: ConnectionId,
    ) -> Result<LobbyId, LobbyError> {
        let lobby = self
            .lobbies
            .get_mut(lobby_id)
            .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))?;

        let client_id = client.clone();
        lobby.add(client, connection)?;
        tracing::info!(
            %lobby_id,
            client_id = %client_id,
            members = lobby.member_count(),
            "client joined lobby"
        );
        Ok(lobby_id.clone())
    }

    /// Removes `client` from a lobby, deleting the lobby if that empties
    /// it.
    ///
    /// # Errors
    /// - [`LobbyError::NotFound`]: no such lobby
    /// - [`LobbyError::NotAMember`]: `client` is not in it
    pub fn leave(&mut self, lobby_id: &LobbyId, client: &ClientId) -> Result<(), LobbyError> {
        let lobby = self
            .lobbies
            .get_mut(lobby_id)
            .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))?;

        lobby.remove(client)?;
        tracing::info!(
            %lobby_id,
            client_id = %client,
            members = lobby.member_count(),
            "client left lobby"
        );

        if lobby.is_empty() {
            self.delete(lobby_id);
        }
        Ok(())
    }

    /// Summaries of every lobby, in creation order.
    pub fn list(&self) -> Vec<LobbySummary> {
        self.order
            .iter()
            .filter_map(|id| self.lobbies.get(id))
            .map(Lobby::summary)
            .collect()
    }

    /// Looks up a lobby.
    pub fn get(&self, lobby_id: &LobbyId) -> Option<&Lobby> {
        self.lobbies.get(lobby_id)
    }

    /// Ids of every lobby `client` is a member of, in creation order.
    pub fn lobbies_of(&self, client: &ClientId) -> Vec<LobbyId> {
        self.order
            .iter()
            .filter(|id| self.lobbies.get(*id).is_some_and(|l| l.is_member(client)))
            .cloned()
            .collect()
    }

    /// Points every membership of `client` at a new connection.
    ///
    /// Returns how many memberships were updated.
    pub fn rebind(&mut self, client: &ClientId, connection: ConnectionId) -> usize {
        self.lobbies
            .values_mut()
            .map(|lobby| lobby.rebind(client, connection))
            .filter(|&rebound| rebound)
            .count()
    }

    /// Deletes every lobby of `client` that has no live member left.
    ///
    /// Called after `client`'s connection closes. `is_live` reports
    /// whether a member still has a bound connection. A lobby with at
    /// least one live member keeps every membership, so the members who
    /// dropped can reconnect and resume it.
    pub fn remove_abandoned(
        &mut self,
        client: &ClientId,
        is_live: impl Fn(&ClientId) -> bool,
    ) -> Vec<LobbyId> {
        let abandoned: Vec<LobbyId> = self
            .lobbies_of(client)
            .into_iter()
            .filter(|id| {
                self.lobbies
                    .get(id)
                    .is_some_and(|l| l.members().iter().all(|m| !is_live(&m.client)))
            })
            .collect();

        for lobby_id in &abandoned {
            self.delete(lobby_id);
        }
        abandoned
    }

    /// Number of live lobbies.
    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    fn delete(&mut self, lobby_id: &LobbyId) {
        if self.lobbies.remove(lobby_id).is_some() {
            self.order.retain(|id| id != lobby_id);
            tracing::info!(%lobby_id, "lobby deleted");
        }
    }
}

impl Default for LobbyRegistry {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}
