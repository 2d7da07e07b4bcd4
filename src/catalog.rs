//! Catalog persistence
//!
//! The table schemas of a database, stored in `catalog.bin`.
//!
//! ## File Format
//! ```text
//! ┌──────────┬───────────┬──────────────────────────────┐
//! │ Len (4)  │ CRC32 (4) │ bincode(Vec<Schema>) (Len)   │
//! └──────────┴───────────┴──────────────────────────────┘
//! ```
//! The CRC covers the payload only.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{PlankError, Result};
use crate::table::Schema;

/// File name of the catalog inside the data directory
pub const CATALOG_FILENAME: &str = "catalog.bin";

const CATALOG_HEADER_LEN: usize = 8;

/// Encode schemas into the catalog format
pub fn encode_catalog(schemas: &[Schema]) -> Result<Vec<u8>> {
    let payload = bincode::serialize(schemas)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| PlankError::Serialization("catalog too large".to_string()))?;

    let mut bytes = Vec::with_capacity(CATALOG_HEADER_LEN + payload.len());
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode and verify a catalog
pub fn decode_catalog(bytes: &[u8]) -> Result<Vec<Schema>> {
    if bytes.len() < CATALOG_HEADER_LEN {
        return Err(PlankError::Corruption(format!(
            "catalog is {} bytes, shorter than its header",
            bytes.len()
        )));
    }

    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let stored_crc = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let payload = &bytes[CATALOG_HEADER_LEN..];

    if payload.len() != len {
        return Err(PlankError::Corruption(format!(
            "catalog payload is {} bytes, header says {}",
            payload.len(),
            len
        )));
    }
    let crc = crc32fast::hash(payload);
    if crc != stored_crc {
        return Err(PlankError::Corruption(format!(
            "catalog CRC mismatch: expected {:08x}, got {:08x}",
            stored_crc, crc
        )));
    }

    let schemas: Vec<Schema> = bincode::deserialize(payload)?;
    for schema in &schemas {
        schema.verify()?;
    }
    Ok(schemas)
}

/// Write the catalog into `dir`, replacing any previous one
pub fn write_catalog(dir: &Path, schemas: &[Schema]) -> Result<()> {
    let bytes = encode_catalog(schemas)?;
    let path = dir.join(CATALOG_FILENAME);
    let tmp = dir.join(format!("{}.tmp", CATALOG_FILENAME));

    let mut file = File::create(&tmp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

/// Read the catalog from `dir`
pub fn read_catalog(dir: &Path) -> Result<Vec<Schema>> {
    let mut bytes = Vec::new();
    File::open(dir.join(CATALOG_FILENAME))?.read_to_end(&mut bytes)?;
    decode_catalog(&bytes)
}
