use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{CoupleId, MemberId};

const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const INVITE_CODE_LEN: usize = 8;
pub const COUPLE_SIZE: usize = 2;

/// Random 8-character invite code drawn from `A-Z0-9`.
pub fn generate_invite_code() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .enumerate()
        // bytes 6 and 8 carry the fixed version and variant bits
        .filter(|(index, _)| *index != 6 && *index != 8)
        .map(|(_, byte)| byte)
        .take(INVITE_CODE_LEN)
        .map(|byte| INVITE_ALPHABET[usize::from(*byte) % INVITE_ALPHABET.len()] as char)
        .collect()
}

/// Canonical form used for invite code lookups.
pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Two linked members, plus the code the second one joins with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoupleRecord {
    pub id: CoupleId,
    pub members: Vec<MemberId>,
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
}

impl CoupleRecord {
    pub fn new(creator: MemberId) -> Self {
        Self {
            id: CoupleId(Uuid::new_v4().simple().to_string()),
            members: vec![creator],
            invite_code: generate_invite_code(),
            created_at: Utc::now(),
        }
    }

    pub fn is_member(&self, member: &MemberId) -> bool {
        self.members.contains(member)
    }

    pub fn is_complete(&self) -> bool {
        self.members.len() == COUPLE_SIZE
    }

    /// Adds `member`, returning whether the membership changed. Rejoining is a no-op.
    pub fn join(&mut self, member: MemberId) -> Result<bool, PairingError> {
        if self.is_member(&member) {
            return Ok(false);
        }
        if self.members.len() >= COUPLE_SIZE {
            return Err(PairingError::CoupleFull);
        }
        self.members.push(member);
        Ok(true)
    }

    /// Both members in join order, once the couple is complete.
    pub fn pair(&self) -> Option<(&MemberId, &MemberId)> {
        match self.members.as_slice() {
            [first, second] => Some((first, second)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("this couple already has 2 members")]
    CoupleFull,
}
