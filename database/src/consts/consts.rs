use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU32, Ordering},
    sync::OnceLock,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// Values
pub const DEFAULT_COLLECTION: &str = "people";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const ID_KEY: &str = "_id";

const OBJECT_ID_LENGTH: usize = 12;

#[derive(Error, Debug, PartialEq)]
pub enum ObjectIdParseError {
    #[error("the provided hex string is not a valid ObjectID: expected 24 characters, got {0}")]
    InvalidLength(usize),

    #[error("the provided hex string is not a valid ObjectID: invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Store generated identity of a document, 12 bytes rendered as 24 lowercase hex characters
///
/// Layout: 4 byte big endian unix seconds | 5 random bytes | 3 byte counter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LENGTH]);

// Counter is seeded randomly once per process, like the timestamp it only needs to be unique-ish
fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

    COUNTER
        .get_or_init(|| AtomicU32::new(rand::random::<u32>()))
        .fetch_add(1, Ordering::Relaxed)
}

impl ObjectId {
    pub fn new() -> ObjectId {
        let timestamp = chrono::Utc::now().timestamp() as u32;
        let random: [u8; 5] = rand::random();
        let counter = next_counter();

        let mut bytes = [0u8; OBJECT_ID_LENGTH];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);

        ObjectId(bytes)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    pub fn parse_str(value: &str) -> Result<ObjectId, ObjectIdParseError> {
        let length = value.chars().count();

        if length != OBJECT_ID_LENGTH * 2 {
            return Err(ObjectIdParseError::InvalidLength(length));
        }

        if let Some(invalid) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ObjectIdParseError::InvalidCharacter(invalid));
        }

        let mut bytes = [0u8; OBJECT_ID_LENGTH];

        // All characters are ascii hex digits at this point, so byte slicing is safe
        for (index, byte) in bytes.iter_mut().enumerate() {
            let pair = &value[index * 2..index * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| ObjectIdParseError::InvalidCharacter(pair.chars().next().unwrap_or('?')))?;
        }

        Ok(ObjectId(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;

        ObjectId::parse_str(&value).map_err(de::Error::custom)
    }
}

// New Type Pattern -- https://doc.rust-lang.org/rust-by-example/generics/new_types.html
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CursorId(pub u64);

impl CursorId {
    pub fn increment(&self) -> CursorId {
        CursorId(self.0 + 1)
    }
}

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
