//! Embedded image data: `data:` URLs, PNG encoding of the fog raster and
//! dimension probing for map assets.

use crate::layers::fog::FogBuffer;
use crate::{MapError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Cursor;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

pub fn is_data_url(src: &str) -> bool {
    src.starts_with(DATA_URL_PREFIX)
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("{}{}{}{}", DATA_URL_PREFIX, mime, BASE64_MARKER, STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL into its MIME type and payload bytes
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| MapError::AssetLoadFailure("not a data URL".to_string()))?;
    let (mime, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| MapError::AssetLoadFailure("data URL is not base64 encoded".to_string()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| MapError::AssetLoadFailure(format!("invalid base64 payload: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// Encode the fog as a PNG `data:` URL (black pixels, opacity in alpha)
pub fn encode_fog(buffer: &FogBuffer) -> Result<String> {
    let mut png = Cursor::new(Vec::new());
    buffer
        .to_rgba_image()
        .write_to(&mut png, image::ImageOutputFormat::Png)?;
    Ok(encode_data_url("image/png", png.get_ref()))
}

/// Decode any supported raster into a fog buffer, keeping only its alpha
pub fn decode_fog(bytes: &[u8]) -> Result<FogBuffer> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| MapError::AssetLoadFailure(format!("fog raster: {}", e)))?;
    Ok(FogBuffer::from_rgba_image(&image.to_rgba8()))
}

/// Native pixel size of an encoded image, read from its header
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = image::io::Reader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(MapError::AssetLoadFailure(
            "unrecognised image format".to_string(),
        ));
    }
    reader
        .into_dimensions()
        .map_err(|e| MapError::AssetLoadFailure(e.to_string()))
}
