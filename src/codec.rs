//! Share-link encoding of occupancy data.
//!
//! Current links carry the JSON store compressed with lz-string's URI-safe
//! alphabet. Older links carry the same JSON as plain base64; those are still
//! accepted when decoding.

use anyhow::{Context, Result};
use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use reqwest::Url;

use crate::{
    error::DecodeError,
    model::{DateKey, HistoricalData},
    store::OccupancyStore,
};

/// Query parameter carrying the token in share links.
pub const SHARE_PARAM: &str = "data";

const LEGACY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ==================== Compressor Trait ====================

/// String compression used for share tokens.
pub trait Compressor: Send + Sync {
    fn compress(&self, input: &str) -> String;

    /// `None` when `input` is not something this compressor produced.
    fn decompress(&self, input: &str) -> Option<String>;
}

/// lz-string compression with the URI-component alphabet.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzStringCompressor;

impl Compressor for LzStringCompressor {
    fn compress(&self, input: &str) -> String {
        lz_str::compress_to_encoded_uri_component(input)
    }

    fn decompress(&self, input: &str) -> Option<String> {
        let wide = lz_str::decompress_from_encoded_uri_component(input)?;
        String::from_utf16(&wide).ok()
    }
}

// ==================== Codec ====================

/// Encodes and decodes share tokens.
#[derive(Debug, Clone, Default)]
pub struct SharingCodec<C: Compressor = LzStringCompressor> {
    compressor: C,
}

impl<C: Compressor> SharingCodec<C> {
    pub fn new(compressor: C) -> Self {
        Self { compressor }
    }

    /// Compressed, URL-safe token for `data`.
    pub fn encode(&self, data: &HistoricalData) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(data)?;
        Ok(self.compressor.compress(&json))
    }

    /// Decode a token produced by [`encode`](Self::encode) or by the legacy
    /// base64 scheme.
    pub fn decode(&self, token: &str) -> Result<HistoricalData, DecodeError> {
        // Query-string parsing turns an unescaped '+' into a space.
        let token = token.trim().replace(' ', "+");
        if token.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut shape_error = None;

        if let Some(json) = self.compressor.decompress(&token).filter(|s| !s.is_empty()) {
            match parse_payload(&json) {
                Ok(data) => return Ok(data),
                Err(e) => shape_error = shape_error.or(e),
            }
        }

        if let Some(json) = legacy_text(&token) {
            match parse_payload(&json) {
                Ok(data) => {
                    tracing::debug!("Decoded share token with legacy scheme");
                    return Ok(data);
                }
                Err(e) => shape_error = shape_error.or(e),
            }
        }

        Err(shape_error.unwrap_or(DecodeError::Unrecognized))
    }
}

/// Parse decoded JSON text. The inner `Option` is `Some` only when the text was
/// JSON but not a date-to-snapshot map, which deserves a more specific error.
fn parse_payload(json: &str) -> Result<HistoricalData, Option<DecodeError>> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|_| None)?;
    serde_json::from_value(value).map_err(|e| Some(DecodeError::InvalidShape(e.to_string())))
}

/// Text carried by a legacy token: base64 over UTF-8, or over Latin-1 as
/// written by browsers' `btoa`.
fn legacy_text(token: &str) -> Option<String> {
    let bytes = LEGACY_ENGINE.decode(token).ok()?;
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => Some(e.into_bytes().into_iter().map(char::from).collect()),
    }
}

/// Encode `data` the way pre-compression links did. `None` if the JSON holds a
/// character outside Latin-1, which that scheme cannot carry.
pub fn encode_legacy(data: &HistoricalData) -> Option<String> {
    let json = serde_json::to_string(data).ok()?;
    let bytes = json
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()?;
    Some(LEGACY_ENGINE.encode(bytes))
}

// ==================== Share Links ====================

/// What a share link carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareScope {
    All,
    Date(DateKey),
}

impl ShareScope {
    pub fn payload(&self, store: &OccupancyStore) -> HistoricalData {
        match self {
            ShareScope::All => store.data().clone(),
            ShareScope::Date(date) => store.subset(date),
        }
    }
}

/// Build a share link: `base_url` with the token in the `data` parameter.
pub fn share_url<C: Compressor>(
    codec: &SharingCodec<C>,
    base_url: &str,
    store: &OccupancyStore,
    scope: ShareScope,
) -> Result<String> {
    let token = codec
        .encode(&scope.payload(store))
        .context("Failed to encode share payload")?;
    let mut url = Url::parse(base_url).context("Invalid share base URL")?;
    url.query_pairs_mut().append_pair(SHARE_PARAM, &token);
    Ok(url.to_string())
}

/// Extract the token from user input: a full link, a bare query string or the
/// token itself.
pub fn token_from_input(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let url = if input.contains("://") {
        Url::parse(input).ok()?
    } else if let Some(query) = input.strip_prefix('?') {
        Url::parse(&format!("http://localhost/?{query}")).ok()?
    } else if input.starts_with("data=") {
        Url::parse(&format!("http://localhost/?{input}")).ok()?
    } else {
        return Some(input.to_string());
    };

    url.query_pairs()
        .find(|(k, _)| k == SHARE_PARAM)
        .map(|(_, v)| v.into_owned())
}
