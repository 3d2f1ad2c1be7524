//! A single lobby and its membership.

use paddock_protocol::{ClientId, LobbyId, LobbySummary};
use paddock_transport::ConnectionId;

use crate::LobbyError;

/// A lobby member: an identity and the connection it joined from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub client: ClientId,
    pub connection: ConnectionId,
}

/// A joinable pre-game group.
///
/// Invariants, upheld by every method:
/// - `members` is ordered by join time and never longer than `capacity`
/// - the host is the first member to join and never changes; it stays a
///   member until it leaves
/// - no client appears twice
#[derive(Debug, Clone)]
pub struct Lobby {
    id: LobbyId,
    host: ClientId,
    members: Vec<Member>,
    capacity: usize,
}

impl Lobby {
    /// Creates a lobby with `host` as its sole member.
    pub fn new(id: LobbyId, host: ClientId, connection: ConnectionId, capacity: usize) -> Self {
        let members = vec![Member {
            client: host.clone(),
            connection,
        }];
        Self {
            id,
            host,
            members,
            capacity,
        }
    }

    /// Adds a member.
    ///
    /// # Errors
    /// [`LobbyError::Full`] at capacity; [`LobbyError::AlreadyMember`] if
    /// the client is already in. Membership is unchanged on error.
    pub fn add(&mut self, client: ClientId, connection: ConnectionId) -> Result<(), LobbyError> {
        if self.is_full() {
            return Err(LobbyError::Full(self.id.clone()));
        }
        if self.is_member(&client) {
            return Err(LobbyError::AlreadyMember(client, self.id.clone()));
        }
        self.members.push(Member { client, connection });
        Ok(())
    }

    /// Removes a member. The host may leave too; it is not replaced.
    ///
    /// # Errors
    /// [`LobbyError::NotAMember`] if the client is not in the lobby.
    pub fn remove(&mut self, client: &ClientId) -> Result<(), LobbyError> {
        let Some(pos) = self.members.iter().position(|m| &m.client == client) else {
            return Err(LobbyError::NotAMember(client.clone(), self.id.clone()));
        };
        self.members.remove(pos);
        Ok(())
    }

    /// Points an existing member at a new connection.
    ///
    /// Returns `false` if the client is not a member.
    pub fn rebind(&mut self, client: &ClientId, connection: ConnectionId) -> bool {
        match self.members.iter_mut().find(|m| &m.client == client) {
            Some(member) => {
                member.connection = connection;
                true
            }
            None => false,
        }
    }

    pub fn id(&self) -> &LobbyId {
        &self.id
    }

    pub fn host(&self) -> &ClientId {
        &self.host
    }

    pub fn is_member(&self, client: &ClientId) -> bool {
        self.members.iter().any(|m| &m.client == client)
    }

    /// Members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    /// The externally visible projection of this lobby.
    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id.clone(),
            player_count: self.members.len(),
            max_players: self.capacity,
        }
    }
}
