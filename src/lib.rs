//! # Love Diary
//!
//! Build a multi-page photo greeting card ("love diary") and share it as a
//! link or as a single offline HTML file.
//!
//! # Architecture: One Card, Three Ways Out
//!
//! Everything revolves around one value, [`types::CardState`]: the card's
//! text and style plus seven positional photo slots. It leaves the editor
//! through one of three exits, and comes back in through the matching door:
//!
//! ```text
//! CardState ──codec──────→  https://…/#<fragment>       (link carries the card)
//!           ──store──────→  https://…/?id=<id>          (link carries an id)
//!           ──generate───→  love-diary-card.html        (file carries the card)
//!
//! link ──LinkContext::parse──→ link::open ──→ CardState (+ view-only flag)
//! ```
//!
//! Every exit takes a snapshot by reference and returns a new value; nothing
//! holds on to the editor's state.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Card data model: config, fonts/colours/filters, photo slots, zoom clamping |
//! | [`codec`] | Link payloads: legacy base64 channel, LZ-String compressed channel, ordered decoder chain |
//! | [`link`] | Parsing incoming links once, resolving the startup card, building share links |
//! | [`store`] | `CardStore` contract and the directory-backed store |
//! | [`generate`] | Self-contained HTML card rendered with Maud, embedded payload recovery |
//! | [`imaging`] | Upload normalizer: bounded-size JPEG data URIs via the `image` crate |
//! | [`import`] | Fill photo slots from a directory, normalized in parallel |
//! | [`config`] | `love-diary.toml` loading, validation, merging, theme CSS |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Typed Slots Over an Index Convention
//!
//! Slot 0 is the hero, 1–3 are page two, 4–6 are page three. On the wire
//! that is a flat seven-element array, kept for compatibility with existing
//! links; in memory it is [`types::PhotoSlots`], so the page split is part of
//! the type.
//!
//! ## Decoders as an Ordered List
//!
//! Old links use the legacy channel, new ones the compressed channel, and
//! both must keep opening. Decoding tries a list of [`codec::Channel`]s in
//! order and reports every failed attempt, rather than nesting fallbacks.
//!
//! ## Dependency-Free Card Document
//!
//! The downloaded card inlines its CSS, a short vanilla script, and every
//! photo. It opens from a USB stick with no network and keeps working as long
//! as browsers render HTML.

pub mod codec;
pub mod config;
pub mod generate;
pub mod imaging;
pub mod import;
pub mod link;
pub mod output;
pub mod store;
pub mod types;
