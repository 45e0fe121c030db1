//! Surrogate key generated for every stored document.

use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const KEY_LEN: usize = 12;

/// 12-byte document key: 4-byte big-endian creation second + 8 random bytes.
///
/// String form is 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey([u8; KEY_LEN]);

impl DocumentKey {
    pub fn generate() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or_default();
        let random = Uuid::new_v4();

        let mut bytes = [0_u8; KEY_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&random.as_bytes()[8..]);
        Self(bytes)
    }

    /// Parses the 24-hex-char string form. Returns `None` for anything else.
    pub fn parse_str(value: &str) -> Option<Self> {
        if value.len() != KEY_LEN * 2
            || !value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        let mut bytes = [0_u8; KEY_LEN];
        hex::decode_to_slice(value, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time in whole seconds since the Unix epoch.
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
