//! Session tokens binding a player identity to a room.
//!
//! Token format: `base64url(json claims).base64url(hmac_sha256(json))`

use crate::error::{GameError, GameResult};
use crate::types::{PlayerId, RoomId};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub player_id: PlayerId,
    pub player_name: String,
    pub room_id: RoomId,
    /// Which incarnation of the room the token was minted for. A room that
    /// is evicted and recreated under the same name gets a new one.
    #[serde(default)]
    pub room_instance: String,
    /// Unix seconds
    #[serde(default)]
    pub issued_at: i64,
}

impl SessionClaims {
    pub fn new(
        room_id: impl Into<RoomId>,
        room_instance: impl Into<String>,
        player_id: impl Into<PlayerId>,
        player_name: impl Into<String>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            player_name: player_name.into(),
            room_id: room_id.into(),
            room_instance: room_instance.into(),
            issued_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Mints and checks bearer tokens
pub trait SessionIssuer: Send + Sync {
    fn issue(&self, claims: &SessionClaims) -> GameResult<String>;
    fn verify(&self, token: &str) -> GameResult<SessionClaims>;
}

pub struct HmacSessions {
    key: Vec<u8>,
}

impl HmacSessions {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    /// A key that only lives as long as this process
    pub fn random() -> Self {
        Self::new(rand::random::<[u8; 32]>())
    }

    fn mac(&self) -> GameResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| GameError::Signing)
    }
}

impl SessionIssuer for HmacSessions {
    fn issue(&self, claims: &SessionClaims) -> GameResult<String> {
        let payload = serde_json::to_vec(claims).map_err(|_| GameError::Signing)?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let sig = mac.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    fn verify(&self, token: &str) -> GameResult<SessionClaims> {
        let (p1, p2) = token.split_once('.').ok_or(GameError::InvalidToken)?;
        let payload = URL_SAFE_NO_PAD
            .decode(p1)
            .map_err(|_| GameError::InvalidToken)?;
        let sig = URL_SAFE_NO_PAD
            .decode(p2)
            .map_err(|_| GameError::InvalidToken)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&sig).map_err(|_| GameError::InvalidToken)?;

        serde_json::from_slice(&payload).map_err(|_| GameError::InvalidToken)
    }
}
