//! Payload normalization for image uploads.
//!
//! Image payloads are re-encoded into a compact lossy format at fixed
//! quality before upload; every other payload is stored byte-for-byte.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;

use super::key;

/// Fixed quality for re-encoded images.
const JPEG_QUALITY: u8 = 80;

/// Outcome of payload normalization.
///
/// The passthrough branch carries the decode failure so callers can tell a
/// deliberate no-op from something that failed silently.
#[derive(Debug)]
pub enum Normalized {
    /// Payload decoded as an image and was re-encoded as JPEG.
    Image {
        /// Re-encoded payload.
        bytes: Bytes,
        /// File name with the extension swapped to `.jpg`.
        name: String,
    },
    /// Payload passed through untouched.
    Opaque {
        /// Original payload.
        bytes: Bytes,
        /// Original file name.
        name: String,
        /// Why the payload was not converted.
        reason: String,
    },
}

impl Normalized {
    /// Payload bytes and file name, whichever branch applies.
    #[must_use]
    pub fn into_parts(self) -> (Bytes, String) {
        match self {
            Self::Image { bytes, name } | Self::Opaque { bytes, name, .. } => (bytes, name),
        }
    }
}

/// Re-encodes image payloads as JPEG at fixed quality, leaving everything
/// else untouched.
///
/// Decode failure is not an error: non-image payloads (videos, SVG icons,
/// arbitrary binary) pass through under their original name. Alpha channels
/// are flattened during re-encoding.
#[must_use]
pub fn normalize(payload: Bytes, name: &str) -> Normalized {
    let img = match image::load_from_memory(&payload) {
        Ok(img) => img,
        Err(e) => {
            return Normalized::Opaque {
                bytes: payload,
                name: name.to_string(),
                reason: e.to_string(),
            };
        }
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), JPEG_QUALITY);
    if let Err(e) = img.to_rgb8().write_with_encoder(encoder) {
        return Normalized::Opaque {
            bytes: payload,
            name: name.to_string(),
            reason: e.to_string(),
        };
    }

    Normalized::Image {
        bytes: Bytes::from(out),
        name: jpg_name(name),
    }
}

/// Swaps the file name's extension for `.jpg`, appending it when the name
/// has no extension.
fn jpg_name(name: &str) -> String {
    let (stem, _) = key::split_name(name);
    format!("{stem}.jpg")
}
