//! IFC global ids.
//!
//! Models store the 22 character compressed form; links and GeoJSON carry
//! the hyphenated UUID form. The compressed form is the 128-bit value written
//! big-endian in base 64 over `0-9A-Za-z_$`, so its first digit is at most 3.

use uuid::Uuid;

use crate::error::{GeometryError, GeometryResult};

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";
const COMPRESSED_LEN: usize = 22;

fn digit(c: u8) -> Option<u128> {
    ALPHABET.iter().position(|&a| a == c).map(|d| d as u128)
}

/// UUID (with or without hyphens) to the compressed form.
pub fn compress(uuid: &str) -> GeometryResult<String> {
    let value = Uuid::parse_str(uuid.trim())
        .map_err(|_| GeometryError::InvalidGuid(uuid.to_string()))?
        .as_u128();
    let mut chars = [0u8; COMPRESSED_LEN];
    let mut rest = value;
    for slot in chars.iter_mut().rev() {
        *slot = ALPHABET[(rest % 64) as usize];
        rest /= 64;
    }
    Ok(chars.iter().map(|&c| c as char).collect())
}

/// Compressed form to the lowercase hyphenated UUID.
pub fn expand(compressed: &str) -> GeometryResult<String> {
    let invalid = || GeometryError::InvalidGuid(compressed.to_string());
    let bytes = compressed.trim().as_bytes();
    if bytes.len() != COMPRESSED_LEN {
        return Err(invalid());
    }
    let first = digit(bytes[0]).filter(|d| *d < 4).ok_or_else(invalid)?;
    let value = bytes[1..].iter().try_fold(first, |acc, &c| {
        digit(c).map(|d| (acc << 6) | d).ok_or_else(invalid)
    })?;
    Ok(Uuid::from_u128(value).hyphenated().to_string())
}

/// Both spellings of one global id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Guids {
    /// Compressed, as stored in the model.
    pub ifc: String,
    /// Hyphenated UUID, as used in links.
    pub json: String,
}

impl Guids {
    /// Accepts either spelling; a `-` marks the UUID form.
    pub fn from_any(global_id: &str) -> GeometryResult<Self> {
        let global_id = global_id.trim();
        if global_id.contains('-') {
            Ok(Self {
                ifc: compress(global_id)?,
                json: global_id.to_ascii_lowercase(),
            })
        } else {
            Ok(Self {
                ifc: global_id.to_string(),
                json: expand(global_id)?,
            })
        }
    }
}

/// The UUID spelling of a stored id, falling back to the id itself when it is
/// not a valid compressed GUID.
pub fn json_guid(global_id: &str) -> String {
    expand(global_id).unwrap_or_else(|_| global_id.to_string())
}
