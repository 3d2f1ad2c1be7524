//! Opaque identity generation.

use rand::Rng;

/// Mints fresh opaque identities.
///
/// Each identity is 128 random bits rendered as 32 lowercase hex
/// characters. The issuer is generic over the identity type so the same
/// source serves both clients and lobbies:
///
/// ```rust
/// use paddock_protocol::{ClientId, LobbyId};
/// use paddock_session::IdentityIssuer;
///
/// let issuer = IdentityIssuer;
/// let client: ClientId = issuer.issue();
/// let lobby: LobbyId = issuer.issue();
/// assert_eq!(client.as_str().len(), 32);
/// assert_ne!(client.as_str(), lobby.as_str());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityIssuer;

impl IdentityIssuer {
    /// Returns a new identity.
    pub fn issue<I: From<String>>(&self) -> I {
        I::from(generate_token())
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use paddock_protocol::ClientId;

    use super::*;

    #[test]
    fn test_issue_is_32_lowercase_hex_chars() {
        let id: ClientId = IdentityIssuer.issue();
        assert_eq!(id.as_str().len(), 32);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_issue_many_are_unique() {
        let ids: HashSet<ClientId> = (0..1000).map(|_| IdentityIssuer.issue()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
