//! Incoming share links and outgoing link construction.
//!
//! A URL is parsed exactly once into a [`LinkContext`] (fragment plus query
//! pairs); everything downstream works from that value. [`open`] turns the
//! context into the card the session starts with:
//!
//! | Request | Trigger | Result |
//! |---|---|---|
//! | [`LinkRequest::Cloud`] | `?id=<id>` | fetched from the store, read-only |
//! | [`LinkRequest::Embedded`] | non-empty `#fragment` | decoded via the channel chain, read-only |
//! | [`LinkRequest::ViewOnly`] | `?mode=view` | the current card, read-only |
//! | [`LinkRequest::Edit`] | anything else | the current card, editable |
//!
//! `id` wins over a fragment. An unreadable fragment is not an error: the
//! session falls back to the current card in edit mode and logs a warning.

use crate::codec::{self, Channel, CodecError};
use crate::store::{CardStore, StoreError};
use crate::types::CardState;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("no card stored under id {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl LinkError {
    /// Text shown to the person opening or sharing the card.
    pub fn user_message(&self) -> &'static str {
        match self {
            LinkError::NotFound(_) => "This link is no longer valid.",
            LinkError::Store(e) => e.user_message(),
            LinkError::Codec(e) => e.user_message(),
        }
    }
}

/// The parts of an incoming URL that decide what the session opens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkContext {
    /// Fragment without the leading `#`, untouched.
    pub fragment: String,
    /// Decoded query pairs in order of appearance.
    pub query: Vec<(String, String)>,
}

/// What an incoming link asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkRequest {
    Cloud(String),
    Embedded(String),
    ViewOnly,
    Edit,
}

/// Where the opened card came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSource {
    Store,
    Link(Channel),
    Session,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenedCard {
    pub state: CardState,
    pub view_only: bool,
    pub source: CardSource,
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl LinkContext {
    /// Split `url` into fragment and query. Accepts full URLs, bare
    /// `?query#fragment` tails, and bare fragments starting with `#`.
    pub fn parse(url: &str) -> Self {
        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, fragment.to_string()),
            None => (url, String::new()),
        };
        let query = rest
            .split_once('?')
            .map(|(_, q)| q)
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self { fragment, query }
    }

    /// First value for `key`, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn request(&self) -> LinkRequest {
        if let Some(id) = self.param("id").filter(|id| !id.is_empty()) {
            return LinkRequest::Cloud(id.to_string());
        }
        if !self.fragment.trim().is_empty() {
            return LinkRequest::Embedded(self.fragment.clone());
        }
        if self.param("mode") == Some("view") {
            return LinkRequest::ViewOnly;
        }
        LinkRequest::Edit
    }
}

/// Resolve the card a session starts with.
///
/// `current` is the card already in memory (the default card for a fresh
/// session); it is returned unchanged for view/edit requests and when an
/// embedded payload cannot be decoded.
pub fn open(
    ctx: &LinkContext,
    current: CardState,
    store: &impl CardStore,
) -> Result<OpenedCard, LinkError> {
    match ctx.request() {
        LinkRequest::Cloud(id) => {
            let record = store.get(&id)?.ok_or(LinkError::NotFound(id.clone()))?;
            info!(%id, created_at = %record.created_at, "opened stored card");
            Ok(OpenedCard {
                state: record.into_state(),
                view_only: true,
                source: CardSource::Store,
            })
        }
        LinkRequest::Embedded(fragment) => {
            match codec::decode_tracked(codec::DEFAULT_DECODE_ORDER, &fragment) {
                Ok((state, channel)) => Ok(OpenedCard {
                    state,
                    view_only: true,
                    source: CardSource::Link(channel),
                }),
                Err(e) => {
                    warn!(error = %e, "could not decode shared card, opening editor");
                    Ok(OpenedCard {
                        state: current,
                        view_only: false,
                        source: CardSource::Session,
                    })
                }
            }
        }
        LinkRequest::ViewOnly => Ok(OpenedCard {
            state: current,
            view_only: true,
            source: CardSource::Session,
        }),
        LinkRequest::Edit => Ok(OpenedCard {
            state: current,
            view_only: false,
            source: CardSource::Session,
        }),
    }
}

/// `url` without its query string or fragment.
pub fn share_base(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// `<base>#<legacy fragment>`; fails with `PayloadTooLarge` over `limit`.
pub fn legacy_link(base: &str, state: &CardState, limit: usize) -> Result<String, CodecError> {
    let fragment = Channel::Legacy.encode(state, limit)?;
    Ok(format!("{}#{fragment}", share_base(base)))
}

pub fn compressed_link(base: &str, state: &CardState) -> Result<String, CodecError> {
    let fragment = Channel::Compressed.encode(state, usize::MAX)?;
    Ok(format!("{}#{fragment}", share_base(base)))
}

/// `<base>?id=<id>` for a card saved in a store.
pub fn cloud_link(base: &str, id: &str) -> String {
    format!("{}?id={id}", share_base(base))
}

/// Save `state` and return the cloud link pointing at it.
pub fn share_via_store(
    base: &str,
    state: &CardState,
    store: &impl CardStore,
) -> Result<String, LinkError> {
    let id = store.save(state)?;
    Ok(cloud_link(base, &id))
}
