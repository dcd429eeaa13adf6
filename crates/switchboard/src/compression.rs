//! Response compression: `Accept-Encoding` negotiation and gzip/deflate codecs.

use std::fmt;
use std::io::Write;

use async_trait::async_trait;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::types::{SwitchboardError, SwitchboardResult};

/// Bodies shorter than this many bytes are always sent uncompressed.
pub const COMPRESSION_THRESHOLD: usize = 500;

/// A content coding the server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    Gzip,
    /// The zlib format, which is what HTTP calls "deflate".
    Deflate,
}

impl Compressor {
    /// Token used in `Content-Encoding`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compressor::Gzip => "gzip",
            Compressor::Deflate => "deflate",
        }
    }

    /// Compress `data` synchronously.
    pub fn compress(&self, data: &[u8]) -> SwitchboardResult<Vec<u8>> {
        let map_err = |e: std::io::Error| SwitchboardError::Compression(e.to_string());
        match self {
            Compressor::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data).map_err(map_err)?;
                encoder.finish().map_err(map_err)
            }
            Compressor::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data).map_err(map_err)?;
                encoder.finish().map_err(map_err)
            }
        }
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick a coding from an `Accept-Encoding` header value.
///
/// Honours q-values; `*` stands in for any coding not listed explicitly.
/// Gzip wins ties. Returns `None` when the header is absent or nothing
/// acceptable is offered.
pub fn negotiate(accept_encoding: Option<&str>) -> Option<Compressor> {
    let header = accept_encoding?;

    let mut gzip = None;
    let mut deflate = None;
    let mut wildcard = None;

    for item in header.split(',') {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let quality = parts
            .find_map(|p| {
                let p = p.trim().to_ascii_lowercase();
                p.strip_prefix("q=").map(|v| parse_quality(v.trim()))
            })
            .unwrap_or(1.0);

        match coding.as_str() {
            "gzip" | "x-gzip" => gzip = Some(quality),
            "deflate" => deflate = Some(quality),
            "*" => wildcard = Some(quality),
            _ => {}
        }
    }

    let gzip = gzip.or(wildcard).unwrap_or(0.0);
    let deflate = deflate.or(wildcard).unwrap_or(0.0);

    let (scheme, quality) = if gzip >= deflate {
        (Compressor::Gzip, gzip)
    } else {
        (Compressor::Deflate, deflate)
    };
    (quality > 0.0).then_some(scheme)
}

/// A qvalue outside `0..=1` (or not a number at all) refuses the coding.
fn parse_quality(value: &str) -> f32 {
    match value.parse::<f32>() {
        Ok(q) if q.is_finite() && (0.0..=1.0).contains(&q) => q,
        _ => 0.0,
    }
}

/// Asynchronous compression backend used when finalizing responses.
#[async_trait]
pub trait Codec: Send + Sync {
    async fn compress(&self, scheme: Compressor, data: Vec<u8>) -> SwitchboardResult<Vec<u8>>;
}

/// `flate2`-backed codec that compresses on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlateCodec;

#[async_trait]
impl Codec for FlateCodec {
    async fn compress(&self, scheme: Compressor, data: Vec<u8>) -> SwitchboardResult<Vec<u8>> {
        tokio::task::spawn_blocking(move || scheme.compress(&data))
            .await
            .map_err(|e| {
                tracing::error!("{scheme} compression task failed: {e}");
                SwitchboardError::Compression(e.to_string())
            })?
    }
}
