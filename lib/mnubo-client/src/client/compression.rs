//! Gzip framing for request and response bodies.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::ApiClientError;

/// Compression toggles applied by an [`MnuboClient`](crate::MnuboClient).
///
/// Both toggles are independent and disabled by default.
///
/// - `request`: gzip outgoing bodies and send `Content-Encoding: gzip`.
/// - `response`: send `Accept-Encoding: gzip` as a hint to the server.
///
/// Responses are decompressed whenever the server answers with
/// `Content-Encoding: gzip`, whatever the value of `response`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Compress request bodies.
    pub request: bool,
    /// Ask the server for compressed responses.
    pub response: bool,
}

impl CompressionConfig {
    /// Enables both request and response compression.
    pub fn enabled() -> Self {
        Self {
            request: true,
            response: true,
        }
    }
}

/// Gzip-encodes `data` with the fast compression level.
///
/// # Errors
///
/// Returns [`ApiClientError::CompressionError`] if the encoder fails to write or finish the stream.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, ApiClientError> {
    let to_error = |error| ApiClientError::CompressionError {
        operation: "compress",
        error,
    };

    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::fast());
    encoder.write_all(data).map_err(to_error)?;
    encoder.finish().map_err(to_error)
}

/// Inflates a complete gzip stream.
///
/// # Errors
///
/// Returns [`ApiClientError::CompressionError`] if `data` is not a valid gzip stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, ApiClientError> {
    let mut decoder = GzDecoder::new(data);
    let mut inflated = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut inflated)
        .map_err(|error| ApiClientError::CompressionError {
            operation: "decompress",
            error,
        })?;
    Ok(inflated)
}
