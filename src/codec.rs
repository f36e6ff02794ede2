//! Header codec
//!
//! Every on-page header is a fixed-width, big-endian struct. Headers are
//! serde structs encoded with bincode's fixint options, so the byte layout
//! is exactly the concatenation of the fields in declaration order.
//!
//! Address arrays that follow a header are plain big-endian 8-byte words.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HeapError, Result};

/// Size of one stored address
pub const ADDRESS_SIZE: usize = 8;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .allow_trailing_bytes()
}

/// Encode a header into its fixed-width form
pub fn encode<T: Serialize>(header: &T) -> Result<Vec<u8>> {
    Ok(options().serialize(header)?)
}

/// Decode a header from the front of `bytes`
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(options().deserialize(bytes)?)
}

/// Encode signed log entries / addresses as consecutive big-endian words
pub fn encode_words(words: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * ADDRESS_SIZE);
    for word in words {
        out.extend_from_slice(&word.to_be_bytes());
    }
    out
}

/// Decode consecutive big-endian words
pub fn decode_words(bytes: &[u8]) -> Result<Vec<i64>> {
    if bytes.len() % ADDRESS_SIZE != 0 {
        return Err(HeapError::Corruption(format!(
            "Word region of {} bytes is not a multiple of {}",
            bytes.len(),
            ADDRESS_SIZE
        )));
    }
    Ok(bytes
        .chunks_exact(ADDRESS_SIZE)
        .map(|chunk| {
            let mut word = [0u8; ADDRESS_SIZE];
            word.copy_from_slice(chunk);
            i64::from_be_bytes(word)
        })
        .collect())
}

/// Convert an address into a stored word, rejecting values past i64::MAX
pub fn address_word(address: u64) -> Result<i64> {
    i64::try_from(address).map_err(|_| {
        HeapError::InvalidAddress(format!("Address {} does not fit a signed word", address))
    })
}
