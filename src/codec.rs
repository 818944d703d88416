//! Share-link state codec.
//!
//! Two link formats exist and both must keep opening:
//!
//! | Channel | Encode | Fragment alphabet |
//! |---|---|---|
//! | [`Channel::Legacy`] (A) | JSON → `encodeURIComponent` → base64 | `A-Z a-z 0-9 + / =` |
//! | [`Channel::Compressed`] (B) | JSON → LZ-String URI-component compression | `A-Z a-z 0-9 + - $` |
//!
//! Decoding walks an ordered list of channels and returns the first one that
//! yields a valid card ([`decode_with`]; [`decode_tracked`] also reports which
//! channel it was). The default order,
//! [`DEFAULT_DECODE_ORDER`], tries the compressed channel first and falls back
//! to the legacy one, so links shared before compression was introduced still
//! load.
//!
//! The legacy channel refuses payloads over a byte budget (8000 by default)
//! instead of producing a link too long to survive copy/paste. The compressed
//! channel has no budget, but inline images still make its links impractical.

use crate::types::CardState;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Default JSON byte budget for legacy links.
pub const LEGACY_PAYLOAD_LIMIT: usize = 8000;

/// Characters escaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("card payload is {size} bytes, over the {limit}-byte link budget")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("{channel} link payload is malformed: {reason}")]
    Malformed { channel: Channel, reason: String },
    #[error("no link format could decode the payload ({})", .attempts.join("; "))]
    Exhausted { attempts: Vec<String> },
}

impl CodecError {
    /// Text shown to the person sharing or opening the card.
    pub fn user_message(&self) -> &'static str {
        match self {
            CodecError::PayloadTooLarge { .. } => {
                "This card is too large for a link. Download it as an HTML file instead."
            }
            CodecError::Json(_) => "The card could not be prepared for sharing.",
            CodecError::Malformed { .. } | CodecError::Exhausted { .. } => {
                "This link could not be read. Opening a new card instead."
            }
        }
    }

    fn malformed(channel: Channel, reason: impl fmt::Display) -> Self {
        CodecError::Malformed {
            channel,
            reason: reason.to_string(),
        }
    }
}

/// A share-link encoding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Channel A: `base64(encodeURIComponent(json))`, size-limited.
    Legacy,
    /// Channel B: LZ-String `compressToEncodedURIComponent(json)`.
    Compressed,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Legacy => "legacy",
            Channel::Compressed => "compressed",
        })
    }
}

/// Decoder order used when opening a link: newest format first.
pub const DEFAULT_DECODE_ORDER: &[Channel] = &[Channel::Compressed, Channel::Legacy];

impl Channel {
    /// Encode a card into a URL fragment (without the leading `#`).
    ///
    /// `legacy_limit` is the JSON byte budget enforced by [`Channel::Legacy`];
    /// the compressed channel ignores it.
    pub fn encode(self, state: &CardState, legacy_limit: usize) -> Result<String, CodecError> {
        let json = state.to_json()?;
        match self {
            Channel::Legacy => {
                if json.len() > legacy_limit {
                    return Err(CodecError::PayloadTooLarge {
                        size: json.len(),
                        limit: legacy_limit,
                    });
                }
                let escaped = utf8_percent_encode(&json, URI_COMPONENT).to_string();
                Ok(STANDARD.encode(escaped))
            }
            Channel::Compressed => Ok(lz_str::compress_to_encoded_uri_component(json.as_str())),
        }
    }

    /// Decode a URL fragment produced by this channel.
    pub fn decode(self, fragment: &str) -> Result<CardState, CodecError> {
        let fragment = fragment.trim().trim_start_matches('#');
        if fragment.is_empty() {
            return Err(CodecError::malformed(self, "empty fragment"));
        }
        let json = match self {
            Channel::Legacy => {
                let bytes = STANDARD
                    .decode(fragment)
                    .map_err(|e| CodecError::malformed(self, e))?;
                let escaped = String::from_utf8(bytes).map_err(|e| CodecError::malformed(self, e))?;
                percent_decode_str(&escaped)
                    .decode_utf8()
                    .map_err(|e| CodecError::malformed(self, e))?
                    .into_owned()
            }
            Channel::Compressed => {
                let wide = lz_str::decompress_from_encoded_uri_component(fragment)
                    .ok_or_else(|| CodecError::malformed(self, "decompression failed"))?;
                String::from_utf16(&wide).map_err(|e| CodecError::malformed(self, e))?
            }
        };
        if json.is_empty() {
            return Err(CodecError::malformed(self, "empty payload"));
        }
        CardState::from_json(&json).map_err(|e| CodecError::malformed(self, e))
    }
}

/// Try each channel in order and return the first card that decodes, along
/// with the channel that decoded it.
///
/// Every failure is kept so the final [`CodecError::Exhausted`] says why each
/// format was rejected.
pub fn decode_tracked(
    channels: &[Channel],
    fragment: &str,
) -> Result<(CardState, Channel), CodecError> {
    let mut attempts = Vec::with_capacity(channels.len());
    for &channel in channels {
        match channel.decode(fragment) {
            Ok(state) => {
                debug!(%channel, "decoded share link");
                return Ok((state, channel));
            }
            Err(e) => attempts.push(e.to_string()),
        }
    }
    Err(CodecError::Exhausted { attempts })
}

/// [`decode_tracked`] without the channel.
pub fn decode_with(channels: &[Channel], fragment: &str) -> Result<CardState, CodecError> {
    decode_tracked(channels, fragment).map(|(state, _)| state)
}

/// Decode with [`DEFAULT_DECODE_ORDER`].
pub fn decode_fragment(fragment: &str) -> Result<CardState, CodecError> {
    decode_with(DEFAULT_DECODE_ORDER, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BubbleColor, Font, Photo, PhotoFilter, SLOT_COUNT};

    fn sample_state() -> CardState {
        let mut state = CardState::default();
        state.config.cover_title = "Test".to_string();
        state.config.to_name = "A".to_string();
        state.config.intro = "hi".to_string();
        state
    }

    fn rich_state() -> CardState {
        let mut state = sample_state();
        state.config.intro = "第一次見面 — 100% \"真心\" & <3".to_string();
        state.config.font = Font::LongCang;
        state.config.bubble_color = BubbleColor::Blue;
        state.config.filter = PhotoFilter::Sepia;
        state.photos.hero = Photo::with_source("https://example.com/hero.jpg")
            .with_transform(12.5, -3.25, 1.7);
        state.photos.page_two[0] = Photo::with_source("https://example.com/1.jpg")
            .with_caption("beach day")
            .with_transform(-40.0, 8.0, 0.5);
        state.photos.page_three[2] = Photo::default().with_caption("no photo yet");
        state
    }

    #[test]
    fn legacy_round_trip() {
        let state = rich_state();
        let fragment = Channel::Legacy.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap();
        assert_eq!(Channel::Legacy.decode(&fragment).unwrap(), state);
    }

    #[test]
    fn compressed_round_trip() {
        let state = rich_state();
        let fragment = Channel::Compressed.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap();
        assert_eq!(Channel::Compressed.decode(&fragment).unwrap(), state);
    }

    #[test]
    fn compressed_scenario_fills_defaults() {
        let fragment = Channel::Compressed
            .encode(&sample_state(), LEGACY_PAYLOAD_LIMIT)
            .unwrap();
        let decoded = decode_fragment(&fragment).unwrap();
        assert_eq!(decoded.config.cover_title, "Test");
        assert_eq!(decoded.photos.iter().count(), SLOT_COUNT);
        for photo in decoded.photos.iter() {
            assert_eq!(photo.src(), None);
            assert_eq!((photo.x, photo.y, photo.zoom()), (0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn legacy_fragment_decodes_through_default_chain() {
        let state = rich_state();
        let fragment = Channel::Legacy.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap();
        assert_eq!(decode_fragment(&fragment).unwrap(), state);
    }

    #[test]
    fn legacy_payload_matches_browser_encoding() {
        // btoa(encodeURIComponent('{"a":"b c"}'))
        let escaped = utf8_percent_encode(r#"{"a":"b c"}"#, URI_COMPONENT).to_string();
        assert_eq!(escaped, "%7B%22a%22%3A%22b%20c%22%7D");
        let kept = utf8_percent_encode("-_.!~*'()", URI_COMPONENT).to_string();
        assert_eq!(kept, "-_.!~*'()");
    }

    #[test]
    fn legacy_fragment_without_pan_zoom_gets_defaults() {
        let json = r#"{"config":{"coverTitle":"Old"},"photos":[{"src":"https://a/b.jpg","caption":"x"},{"src":null,"caption":""}]}"#;
        let escaped = utf8_percent_encode(json, URI_COMPONENT).to_string();
        let fragment = STANDARD.encode(escaped);

        let state = decode_fragment(&fragment).unwrap();
        assert_eq!(state.config.cover_title, "Old");
        assert_eq!(state.photos.hero.src(), Some("https://a/b.jpg"));
        assert_eq!(state.photos.hero.zoom(), 1.0);
        assert_eq!(state.photos.hero.x, 0.0);
    }

    #[test]
    fn legacy_rejects_oversized_payload() {
        let mut state = sample_state();
        state.photos.hero = Photo::with_source(format!("data:image/jpeg;base64,{}", "A".repeat(9000)));
        let err = Channel::Legacy.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PayloadTooLarge { limit: LEGACY_PAYLOAD_LIMIT, size } if size > LEGACY_PAYLOAD_LIMIT
        ));

        // The compressed channel carries the same card.
        let fragment = Channel::Compressed.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap();
        assert_eq!(decode_fragment(&fragment).unwrap(), state);
    }

    #[test]
    fn legacy_limit_is_inclusive() {
        let state = sample_state();
        let size = state.to_json().unwrap().len();
        assert!(Channel::Legacy.encode(&state, size).is_ok());
        assert!(Channel::Legacy.encode(&state, size - 1).is_err());
    }

    #[test]
    fn leading_hash_is_ignored() {
        let state = sample_state();
        let fragment = Channel::Compressed.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap();
        assert_eq!(decode_fragment(&format!("#{fragment}")).unwrap(), state);
    }

    #[test]
    fn garbage_exhausts_every_channel() {
        let err = decode_fragment("%%%not-a-card%%%").unwrap_err();
        match err {
            CodecError::Exhausted { attempts } => assert_eq!(attempts.len(), 2),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn empty_fragment_is_malformed() {
        assert!(matches!(
            Channel::Legacy.decode(""),
            Err(CodecError::Malformed { .. })
        ));
        assert!(decode_fragment("#").is_err());
    }

    #[test]
    fn valid_json_without_envelope_is_rejected() {
        let fragment = lz_str::compress_to_encoded_uri_component(r#"{"hello":"world"}"#);
        assert!(decode_fragment(&fragment).is_err());
    }

    #[test]
    fn decode_with_respects_order() {
        let state = sample_state();
        let fragment = Channel::Legacy.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap();
        assert!(decode_with(&[Channel::Compressed], &fragment).is_err());
        assert_eq!(decode_with(&[Channel::Legacy], &fragment).unwrap(), state);
        assert!(matches!(
            decode_with(&[], &fragment),
            Err(CodecError::Exhausted { attempts }) if attempts.is_empty()
        ));
    }

    #[test]
    fn decode_tracked_names_the_channel_that_won() {
        let state = sample_state();
        let legacy = Channel::Legacy.encode(&state, LEGACY_PAYLOAD_LIMIT).unwrap();
        let compressed = Channel::Compressed.encode(&state, usize::MAX).unwrap();

        let (decoded, channel) = decode_tracked(DEFAULT_DECODE_ORDER, &legacy).unwrap();
        assert_eq!((decoded, channel), (state.clone(), Channel::Legacy));
        let (_, channel) = decode_tracked(DEFAULT_DECODE_ORDER, &compressed).unwrap();
        assert_eq!(channel, Channel::Compressed);

        match decode_tracked(DEFAULT_DECODE_ORDER, "%%%") {
            Err(CodecError::Exhausted { attempts }) => assert_eq!(attempts.len(), 2),
            other => panic!("expected exhausted, got {other:?}"),
        }
    }

    #[test]
    fn too_large_has_user_message() {
        let err = CodecError::PayloadTooLarge {
            size: 9000,
            limit: 8000,
        };
        assert!(err.user_message().contains("Download"));
    }
}
