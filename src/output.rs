//! CLI output formatting.
//!
//! # Slot-First Display
//!
//! A card is shown as its pages, and every photo line starts with its slot
//! number so it can be fed straight back to `set-photo --slot`. Image data
//! is never printed; inline images show their approximate size instead.
//!
//! # Output Format
//!
//! ## Card
//!
//! ```text
//! Card
//!     Title: Our Love Diary
//!     To: My Sweetheart
//!     Style: Noto Serif TC, pink bubbles, sepia-0
//!     Intro: This is the story we wrote together. Every page keeps...
//!
//! Page 1
//!     0 hero: inline JPEG, ~38 KB
//! Page 2
//!     1 photo: https://example.com/a.jpg "Beach day"
//!         zoom 1.5, offset (12, -4)
//!     2 photo: (empty)
//! ```
//!
//! ## Import
//!
//! ```text
//! Import from photos/
//!     0 a.jpg: loaded
//!     1 b.jpg: failed (Could not decode image: ...)
//!     ignored: h.jpg
//! Loaded 1 of 2 photos
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::import::ImportReport;
use crate::link::{CardSource, OpenedCard};
use crate::types::{CardState, Photo, PhotoSlots, SLOT_COUNT};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human description of where a photo's image comes from.
fn describe_source(photo: &Photo) -> String {
    match photo.src() {
        None => "(empty)".to_string(),
        Some(src) if photo.is_inline() => {
            let encoded = src.split_once(',').map_or(0, |(_, data)| data.len());
            let kb = (encoded * 3 / 4).div_ceil(1024);
            let kind = src
                .strip_prefix("data:image/")
                .and_then(|rest| rest.split([';', ',']).next())
                .unwrap_or("image")
                .to_uppercase();
            format!("inline {kind}, ~{kb} KB")
        }
        Some(src) => src.to_string(),
    }
}

/// One photo slot: header line plus an indented transform line when the
/// photo is panned or zoomed.
pub fn format_slot(index: usize, photo: &Photo) -> Vec<String> {
    let role = if index == 0 { "hero" } else { "photo" };
    let mut header = format!("{index} {role}: {}", describe_source(photo));
    if !photo.caption.trim().is_empty() {
        header.push_str(&format!(" \"{}\"", truncate(&photo.caption, 40)));
    }
    let mut lines = vec![header];
    if photo.zoom() != 1.0 || photo.x != 0.0 || photo.y != 0.0 {
        lines.push(format!(
            "{}zoom {}, offset ({}, {})",
            indent(1),
            photo.zoom(),
            photo.x,
            photo.y
        ));
    }
    lines
}

pub fn format_card(state: &CardState) -> Vec<String> {
    let config = &state.config;
    let mut lines = vec![
        "Card".to_string(),
        format!("{}Title: {}", indent(1), config.cover_title),
        format!("{}To: {}", indent(1), config.to_name),
        format!(
            "{}Style: {}, {} bubbles, {}",
            indent(1),
            config.font,
            config.bubble_color,
            config.filter
        ),
        format!("{}Intro: {}", indent(1), truncate(&config.intro, 60)),
        String::new(),
    ];

    let mut current_page = None;
    for (index, photo) in state.photos.iter().enumerate() {
        let page = PhotoSlots::page_of(index);
        if page != current_page {
            if let Some(n) = page {
                lines.push(format!("Page {n}"));
            }
            current_page = page;
        }
        for (i, line) in format_slot(index, photo).into_iter().enumerate() {
            // Slot header at depth 1, its detail lines one deeper
            let depth = if i == 0 { 1 } else { 2 };
            lines.push(format!("{}{}", indent(depth), line.trim_start()));
        }
    }
    lines
}

pub fn print_card(state: &CardState) {
    for line in format_card(state) {
        println!("{}", line);
    }
}

pub fn format_import_report(report: &ImportReport, dir: &Path) -> Vec<String> {
    let mut lines = vec![format!("Import from {}", dir.display())];
    for entry in &report.entries {
        let status = match &entry.result {
            Ok(_) => "loaded".to_string(),
            Err(e) => format!("failed ({e})"),
        };
        lines.push(format!(
            "{}{} {}: {}",
            indent(1),
            entry.slot,
            file_name(&entry.path),
            status
        ));
    }
    for path in &report.ignored {
        lines.push(format!("{}ignored: {}", indent(1), file_name(path)));
    }
    if report.entries.is_empty() {
        lines.push(format!("No supported images found (up to {SLOT_COUNT} are used)"));
    } else {
        lines.push(format!(
            "Loaded {} of {} photos",
            report.loaded(),
            report.entries.len()
        ));
    }
    lines
}

pub fn print_import_report(report: &ImportReport, dir: &Path) {
    for line in format_import_report(report, dir) {
        println!("{}", line);
    }
}

/// A freshly built share link, with a warning when inline images make it
/// impractically long.
pub fn format_share_link(kind: &str, link: &str, state: &CardState) -> Vec<String> {
    let mut lines = vec![
        format!("{kind} link ({} characters)", link.chars().count()),
        link.to_string(),
    ];
    if state.has_inline_images() && !link.contains("?id=") {
        lines.push(
            "Note: this card embeds photos, so the link is very long. \
             Consider a cloud link or downloading the card instead."
                .to_string(),
        );
    }
    lines
}

pub fn print_share_link(kind: &str, link: &str, state: &CardState) {
    for line in format_share_link(kind, link, state) {
        println!("{}", line);
    }
}

pub fn format_opened(opened: &OpenedCard) -> Vec<String> {
    let source = match opened.source {
        CardSource::Store => "Opened stored card".to_string(),
        CardSource::Link(channel) => format!("Opened {channel} link"),
        CardSource::Session => "Opened current card".to_string(),
    };
    let mode = if opened.view_only { "view only" } else { "editing" };
    let mut lines = vec![format!("{source} ({mode})"), String::new()];
    lines.extend(format_card(&opened.state));
    lines
}

pub fn print_opened(opened: &OpenedCard) {
    for line in format_opened(opened) {
        println!("{}", line);
    }
}
