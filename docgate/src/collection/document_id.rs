use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use crate::ID_GENERATOR;
use std::fmt::{Debug, Display, Formatter};

#[derive(Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
enum IdRepr {
    Object([u8; 12]),
    Text(String),
    Int(i64),
}

/// An opaque, immutable identifier for a stored document.
///
/// Identifiers are assigned by the store when a document is inserted without
/// an `_id`. Generated identifiers are 12-byte object ids, rendered as 24
/// lowercase hex characters. Identifiers decoded from an existing store may
/// also be a text or integer token.
///
/// # Examples
///
/// ```rust,ignore
/// use docgate::collection::DocumentId;
///
/// let id = DocumentId::parse_hex("65a1f0c2e4b0a1b2c3d4e5f6")?;
/// assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub struct DocumentId {
    repr: IdRepr,
}

impl DocumentId {
    /// Generates a new unique object id.
    pub fn new() -> Self {
        DocumentId {
            repr: IdRepr::Object(ID_GENERATOR.get_id()),
        }
    }

    /// Wraps raw object id bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        DocumentId {
            repr: IdRepr::Object(bytes),
        }
    }

    /// Parses a 24 character hex object id.
    pub fn parse_hex(hex: &str) -> GatewayResult<Self> {
        if hex.len() != 24 || !hex.is_ascii() {
            log::error!("Invalid object id {}", hex);
            return Err(GatewayError::new(
                &format!("invalid object id '{}': expected 24 hex characters", hex),
                ErrorKind::InvalidId,
            ));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|err| {
                GatewayError::new(
                    &format!("invalid object id '{}': {}", hex, err),
                    ErrorKind::InvalidId,
                )
            })?;
        }
        Ok(DocumentId::from_bytes(bytes))
    }

    /// Wraps a non object id token a store assigned as text.
    pub fn from_text(text: &str) -> Self {
        DocumentId {
            repr: IdRepr::Text(text.to_string()),
        }
    }

    /// Wraps a non object id token a store assigned as an integer.
    pub fn from_i64(value: i64) -> Self {
        DocumentId {
            repr: IdRepr::Int(value),
        }
    }

    /// Raw bytes when this is an object id.
    pub fn bytes(&self) -> Option<[u8; 12]> {
        match &self.repr {
            IdRepr::Object(bytes) => Some(*bytes),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.repr {
            IdRepr::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match &self.repr {
            IdRepr::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Creation time in seconds since the epoch, for object ids.
    pub fn timestamp(&self) -> Option<u32> {
        self.bytes()
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            IdRepr::Object(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            IdRepr::Text(text) => write!(f, "{}", text),
            IdRepr::Int(value) => write!(f, "{}", value),
        }
    }
}

impl Debug for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentId({})", self)
    }
}
