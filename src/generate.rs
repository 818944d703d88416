//! Static card generation.
//!
//! Renders a [`CardState`] into one self-contained HTML document that works
//! offline: no build step, no network, no application runtime.
//!
//! ## Pages
//!
//! | Id | Content |
//! |---|---|
//! | `page-0` | Cover: title and an open button |
//! | `page-1` | Letter: hero photo in a heart frame, salutation, intro |
//! | `page-2` | Photos 1–3 (third spans both columns) |
//! | `page-3` | Photos 4–6 (third spans both columns) |
//!
//! A nav bar (hidden on the cover) holds prev/next buttons and three dots for
//! pages 1–3. Arrow keys and horizontal swipes also navigate.
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/card.css`: layout and page transitions (theme colours injected
//!   from config as custom properties)
//! - `static/card.js`: page state, buttons, keys, swipes
//!
//! ## Embedded payload
//!
//! The full card travels inside the document as
//! `<script type="application/json" id="card-data">`, so a downloaded card can
//! be reopened for editing with [`extract_embedded_state`]. `<` is written as
//! `\u003c` so no caption can close the script element.
//!
//! Generation is pure: the same state and settings always give the same bytes.

use crate::config::{self, CardPageConfig, ThemeConfig};
use crate::types::{CardState, Photo};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document has no embedded card data")]
    MissingPayload,
}

const CSS_STATIC: &str = include_str!("../static/card.css");
const JS: &str = include_str!("../static/card.js");

const PAYLOAD_OPEN: &str = r#"<script type="application/json" id="card-data">"#;
const PAYLOAD_CLOSE: &str = "</script>";

/// Settings that shape the document but are not part of the card.
#[derive(Debug, Clone, Copy)]
pub struct CardSettings<'a> {
    pub page: &'a CardPageConfig,
    pub theme: &'a ThemeConfig,
}

/// Render the full document as a string.
pub fn generate_card(state: &CardState, settings: CardSettings<'_>) -> Result<String, GenerateError> {
    Ok(render_card(state, settings)?.into_string())
}

/// Card JSON safe to place inside a `<script>` element.
pub fn embedded_payload(state: &CardState) -> Result<String, GenerateError> {
    Ok(state.to_json()?.replace('<', "\\u003c"))
}

/// Recover the card embedded in a document produced by [`generate_card`].
pub fn extract_embedded_state(document: &str) -> Result<CardState, GenerateError> {
    let start = document
        .find(PAYLOAD_OPEN)
        .ok_or(GenerateError::MissingPayload)?
        + PAYLOAD_OPEN.len();
    let len = document[start..]
        .find(PAYLOAD_CLOSE)
        .ok_or(GenerateError::MissingPayload)?;
    Ok(CardState::from_json(&document[start..start + len])?)
}

/// Per-card CSS: theme properties, font, bubble colour, filter, then the
/// static stylesheet.
fn card_css(state: &CardState, theme: &ThemeConfig) -> String {
    let (bubble_bg, bubble_text) = state.config.bubble_color.palette();
    format!(
        "{theme_css}\n\nbody {{\n    font-family: {font};\n    --bubble-bg: {bubble_bg};\n    --bubble-text: {bubble_text};\n    --photo-filter: {filter};\n}}\n\n{CSS_STATIC}",
        theme_css = config::generate_theme_css(theme),
        font = state.config.font.css_family(),
        filter = state.config.filter.css(),
    )
}

/// Inline style reproducing the editor's pan/zoom.
///
/// The offset is divided by zoom because the translate is applied inside
/// the scale.
fn transform_style(photo: &Photo) -> String {
    let zoom = photo.zoom();
    format!(
        "transform: scale({zoom}) translate({}px, {}px);",
        photo.x / zoom,
        photo.y / zoom
    )
}

fn photo_image(photo: &Photo, alt: &str) -> Markup {
    html! {
        @if let Some(src) = photo.src() {
            img src=(src) alt=(alt) style=(transform_style(photo));
        }
    }
}

/// One grid tile. Captions that are empty or blank get no bubble.
fn photo_item(photo: &Photo, large: bool, alt: &str) -> Markup {
    let caption = photo.caption.trim();
    html! {
        div.photo-item.large[large] {
            (photo_image(photo, alt))
            @if !caption.is_empty() {
                div.bubble { (caption) }
            }
        }
    }
}

fn photo_page(id: &str, photos: &[Photo; 3], first_number: usize) -> Markup {
    html! {
        section.page-layer.inner-page.next id=(id) aria-hidden="true" {
            div.photo-grid {
                @for (idx, photo) in photos.iter().enumerate() {
                    (photo_item(photo, idx == 2, &format!("Photo {}", first_number + idx)))
                }
            }
        }
    }
}

/// Renders the complete card document.
pub fn render_card(state: &CardState, settings: CardSettings<'_>) -> Result<Markup, GenerateError> {
    let card = &state.config;
    let page = settings.page;
    let payload = embedded_payload(state)?;
    let css = card_css(state, settings.theme);
    let title = format!("{} - {}", card.cover_title, page.title_suffix);

    Ok(html! {
        (DOCTYPE)
        html lang=(page.lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no, viewport-fit=cover";
                meta name="theme-color" content=(settings.theme.background);
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body data-page="0" {
                main.card-container {
                    section.page-layer.cover-page.active id="page-0" aria-hidden="false" {
                        div.cover-heart aria-hidden="true" { "♥" }
                        h1.cover-title { (card.cover_title) }
                        button.start-btn type="button" data-goto="1" { (page.open_button) }
                    }

                    section.page-layer.inner-page.next id="page-1" aria-hidden="true" {
                        div.heart-frame {
                            (photo_image(&state.photos.hero, &card.to_name))
                        }
                        h2.title { (page.salutation) " " (card.to_name) }
                        div.letter {
                            p.text { (card.intro) }
                        }
                    }

                    (photo_page("page-2", &state.photos.page_two, 1))
                    (photo_page("page-3", &state.photos.page_three, 4))

                    nav.nav-bar id="nav-bar" hidden {
                        button.nav-btn id="nav-prev" type="button" aria-label="Previous page" style="visibility: hidden;" { "‹" }
                        div.dots {
                            @for n in 1..=3 {
                                div.dot id={ "dot-" (n) } {}
                            }
                        }
                        button.nav-btn id="nav-next" type="button" aria-label="Next page" { "›" }
                    }
                }
                script type="application/json" id="card-data" { (PreEscaped(payload)) }
                script { (PreEscaped(JS)) }
            }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
