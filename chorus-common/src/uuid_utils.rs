//! UUID utilities

use uuid::Uuid;

use crate::{Error, Result};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> std::result::Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse a record id from a request, naming the entity in the error
///
/// A malformed id is reported as `Error::InvalidId`, which clients see as 404.
pub fn parse_id(s: &str, entity: &str) -> Result<Uuid> {
    parse(s.trim()).map_err(|_| Error::InvalidId(format!("Invalid {} Id", entity)))
}
