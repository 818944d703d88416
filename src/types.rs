//! Card data model shared by the codec, the store, and the generator.
//!
//! Share links, stored records, and downloaded cards all carry the same wire
//! shape: `{ "config": {...}, "photos": [7 × photo] }` with camelCase keys.
//! In memory the photo array is a [`PhotoSlots`], so the hero / page two /
//! page three split is part of the type instead of an index convention.
//!
//! Decoding is deliberately lenient below the envelope: older links lack
//! pan/zoom fields, captions, or newer enum values, and those fill in
//! defaults rather than failing the load.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

/// Lower zoom bound for a photo transform.
pub const MIN_ZOOM: f64 = 0.5;
/// Upper zoom bound for a photo transform.
pub const MAX_ZOOM: f64 = 5.0;
/// Zoom change applied by one wheel notch in the editor.
pub const ZOOM_STEP: f64 = 0.1;
/// Number of photo slots on a card (hero + two pages of three).
pub const SLOT_COUNT: usize = 7;

/// Clamp a requested zoom factor into `[MIN_ZOOM, MAX_ZOOM]`.
///
/// Non-finite input resets to 1.0.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

/// String-valued enums with a fixed wire spelling.
///
/// Unknown spellings decode to the default variant with a warning, so a
/// link made by a newer editor still opens.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire spelling of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn from_wire(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from_wire(&value).unwrap_or_else(|| {
                    warn!(kind = $kind, value = %value, "unknown value, using default");
                    Self::default()
                })
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Typeface used for the card text. The wire value is the font family name.
    pub enum Font ("font") {
        #[default]
        NotoSerifTc = "Noto Serif TC",
        NotoSansTc = "Noto Sans TC",
        MaShanZheng = "Ma Shan Zheng",
        ZhiMangXing = "Zhi Mang Xing",
        LongCang = "Long Cang",
    }
}

wire_enum! {
    /// Background tint of the caption bubbles.
    pub enum BubbleColor ("bubble color") {
        #[default]
        Pink = "pink",
        Blue = "blue",
        White = "white",
    }
}

wire_enum! {
    /// Visual filter applied to every photo on the card.
    pub enum PhotoFilter ("photo filter") {
        #[default]
        Plain = "sepia-0",
        Sepia = "sepia",
        Grayscale = "grayscale",
    }
}

impl Font {
    /// CSS `font-family` stack, falling back to generic families offline.
    pub fn css_family(self) -> String {
        let generic = match self {
            Font::NotoSansTc => "sans-serif",
            Font::NotoSerifTc => "serif",
            Font::MaShanZheng | Font::ZhiMangXing | Font::LongCang => "cursive",
        };
        format!("'{}', {}", self.as_str(), generic)
    }
}

impl BubbleColor {
    /// `(background, text)` colours for a caption bubble.
    pub fn palette(self) -> (&'static str, &'static str) {
        match self {
            BubbleColor::Pink => ("rgba(255, 228, 230, 0.95)", "#e11d48"),
            BubbleColor::Blue => ("rgba(224, 242, 254, 0.95)", "#0284c7"),
            BubbleColor::White => ("rgba(255, 255, 255, 0.95)", "#475569"),
        }
    }
}

impl PhotoFilter {
    /// CSS `filter` value.
    pub fn css(self) -> &'static str {
        match self {
            PhotoFilter::Plain => "none",
            PhotoFilter::Sepia => "sepia(1)",
            PhotoFilter::Grayscale => "grayscale(1)",
        }
    }
}

/// Text and style settings of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardConfig {
    pub cover_title: String,
    pub to_name: String,
    pub intro: String,
    pub font: Font,
    pub bubble_color: BubbleColor,
    pub filter: PhotoFilter,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            cover_title: "Our Love Diary".to_string(),
            to_name: "My Sweetheart".to_string(),
            intro: "This is the story we wrote together. Every page keeps one of \
                    the moments that made my heart skip. I made this surprise for you, \
                    and I hope you can feel how much it means."
                .to_string(),
            font: Font::default(),
            bubble_color: BubbleColor::default(),
            filter: PhotoFilter::default(),
        }
    }
}

/// One photo slot: image reference, caption, and pan/zoom transform.
///
/// `src` is either a `data:` URI produced by the image normalizer or a
/// remote URL. An empty source is the same as no image. Zoom is kept inside
/// `[MIN_ZOOM, MAX_ZOOM]` at all times, so it is only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default, deserialize_with = "lenient_source")]
    src: Option<String>,
    #[serde(default, deserialize_with = "lenient_caption")]
    pub caption: String,
    #[serde(default, deserialize_with = "lenient_offset")]
    pub x: f64,
    #[serde(default, deserialize_with = "lenient_offset")]
    pub y: f64,
    #[serde(default = "default_zoom", deserialize_with = "lenient_zoom")]
    zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

fn lenient_source<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|s| !s.is_empty()))
}

fn lenient_caption<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Pan offsets that are not finite numbers reset to 0.
fn finite_offset(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn lenient_offset<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.map_or(0.0, finite_offset))
}

fn lenient_zoom<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.map_or(1.0, clamp_zoom))
}

impl Default for Photo {
    fn default() -> Self {
        Self {
            src: None,
            caption: String::new(),
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Photo {
    /// A photo showing `src` with an identity transform.
    pub fn with_source(src: impl Into<String>) -> Self {
        let mut photo = Self::default();
        photo.set_source(Some(src.into()));
        photo
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Set the pan offset and zoom in one go. Zoom is clamped.
    pub fn with_transform(mut self, x: f64, y: f64, zoom: f64) -> Self {
        self.set_offset(x, y);
        self.set_zoom(zoom);
        self
    }

    /// Move the image inside its frame. NaN or infinite offsets become 0.
    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.x = finite_offset(x);
        self.y = finite_offset(y);
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// Replace the image. A new image always starts untransformed.
    pub fn set_source(&mut self, src: Option<String>) {
        self.src = src.filter(|s| !s.is_empty());
        self.x = 0.0;
        self.y = 0.0;
        self.zoom = 1.0;
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    /// Apply one wheel notch: positive `notches` zoom in by [`ZOOM_STEP`] each.
    pub fn nudge_zoom(&mut self, notches: i32) {
        self.set_zoom(self.zoom + ZOOM_STEP * f64::from(notches));
    }

    /// Whether the image is embedded inline rather than referenced by URL.
    pub fn is_inline(&self) -> bool {
        self.src.as_deref().is_some_and(|s| s.starts_with("data:"))
    }
}

/// The seven photo slots of a card, by position.
///
/// Serialized as a flat 7-element array (hero first). Shorter arrays from
/// old links are padded with empty slots; longer ones are rejected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Photo>", into = "Vec<Photo>")]
pub struct PhotoSlots {
    /// Shown large inside the heart frame on the letter page.
    pub hero: Photo,
    /// Slots 1–3, shown on page two.
    pub page_two: [Photo; 3],
    /// Slots 4–6, shown on page three.
    pub page_three: [Photo; 3],
}

impl PhotoSlots {
    pub fn get(&self, index: usize) -> Option<&Photo> {
        match index {
            0 => Some(&self.hero),
            1..=3 => self.page_two.get(index - 1),
            4..=6 => self.page_three.get(index - 4),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Photo> {
        match index {
            0 => Some(&mut self.hero),
            1..=3 => self.page_two.get_mut(index - 1),
            4..=6 => self.page_three.get_mut(index - 4),
            _ => None,
        }
    }

    /// All slots in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Photo> {
        std::iter::once(&self.hero)
            .chain(self.page_two.iter())
            .chain(self.page_three.iter())
    }

    /// Card page (1–3) on which the slot at `index` is displayed.
    pub fn page_of(index: usize) -> Option<usize> {
        match index {
            0 => Some(1),
            1..=3 => Some(2),
            4..=6 => Some(3),
            _ => None,
        }
    }
}

impl TryFrom<Vec<Photo>> for PhotoSlots {
    type Error = String;

    fn try_from(photos: Vec<Photo>) -> Result<Self, Self::Error> {
        if photos.len() > SLOT_COUNT {
            return Err(format!(
                "expected at most {SLOT_COUNT} photos, found {}",
                photos.len()
            ));
        }
        let mut slots = PhotoSlots::default();
        for (index, photo) in photos.into_iter().enumerate() {
            if let Some(slot) = slots.get_mut(index) {
                *slot = photo;
            }
        }
        Ok(slots)
    }
}

impl From<PhotoSlots> for Vec<Photo> {
    fn from(slots: PhotoSlots) -> Self {
        let PhotoSlots {
            hero,
            page_two,
            page_three,
        } = slots;
        std::iter::once(hero)
            .chain(page_two)
            .chain(page_three)
            .collect()
    }
}

/// Full serializable snapshot of one card.
///
/// Both top-level keys are required: a payload without them is not a card.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CardState {
    pub config: CardConfig,
    pub photos: PhotoSlots,
}

impl CardState {
    /// Compact JSON, the input to both link channels and the store.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Whether any slot embeds image bytes, which makes link payloads huge.
    pub fn has_inline_images(&self) -> bool {
        self.photos.iter().any(Photo::is_inline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped_on_mutation() {
        let mut photo = Photo::default();
        photo.set_zoom(0.1);
        assert_eq!(photo.zoom(), MIN_ZOOM);
        photo.set_zoom(12.0);
        assert_eq!(photo.zoom(), MAX_ZOOM);
        photo.set_zoom(f64::NAN);
        assert_eq!(photo.zoom(), 1.0);
    }

    #[test]
    fn nudge_zoom_stops_at_bounds() {
        let mut photo = Photo::default().with_transform(0.0, 0.0, 4.95);
        photo.nudge_zoom(3);
        assert_eq!(photo.zoom(), MAX_ZOOM);
        photo.nudge_zoom(-100);
        assert_eq!(photo.zoom(), MIN_ZOOM);
    }

    #[test]
    fn non_finite_offsets_reset_to_zero() {
        let photo = Photo::default().with_transform(f64::NAN, f64::INFINITY, 2.0);
        assert_eq!((photo.x, photo.y, photo.zoom()), (0.0, 0.0, 2.0));

        let mut photo = Photo::default();
        photo.set_offset(12.5, f64::NEG_INFINITY);
        assert_eq!((photo.x, photo.y), (12.5, 0.0));

        let json = serde_json::to_string(&photo).unwrap();
        let back: Photo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, photo);
    }

    #[test]
    fn new_source_resets_transform() {
        let mut photo = Photo::with_source("https://a/b.jpg").with_transform(10.0, -4.0, 2.0);
        photo.set_source(Some("https://a/c.jpg".to_string()));
        assert_eq!((photo.x, photo.y, photo.zoom()), (0.0, 0.0, 1.0));
    }

    #[test]
    fn empty_source_is_no_image() {
        let photo = Photo::with_source("");
        assert_eq!(photo.src(), None);
    }

    #[test]
    fn photo_missing_transform_fields_get_defaults() {
        let photo: Photo = serde_json::from_str(r#"{"src":"https://x/y.png","caption":"hi"}"#)
            .unwrap();
        assert_eq!(photo.src(), Some("https://x/y.png"));
        assert_eq!((photo.x, photo.y, photo.zoom()), (0.0, 0.0, 1.0));
    }

    #[test]
    fn photo_null_fields_get_defaults() {
        let photo: Photo =
            serde_json::from_str(r#"{"src":null,"caption":null,"x":null,"zoom":null}"#).unwrap();
        assert_eq!(photo, Photo::default());
    }

    #[test]
    fn photo_zoom_clamped_on_decode() {
        let photo: Photo = serde_json::from_str(r#"{"zoom":9}"#).unwrap();
        assert_eq!(photo.zoom(), MAX_ZOOM);
        let photo: Photo = serde_json::from_str(r#"{"zoom":0.01}"#).unwrap();
        assert_eq!(photo.zoom(), MIN_ZOOM);
    }

    #[test]
    fn config_uses_camel_case_keys() {
        let json = serde_json::to_value(CardConfig::default()).unwrap();
        for key in ["coverTitle", "toName", "intro", "font", "bubbleColor", "filter"] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["font"], "Noto Serif TC");
        assert_eq!(json["filter"], "sepia-0");
    }

    #[test]
    fn config_partial_fields_default() {
        let config: CardConfig = serde_json::from_str(r#"{"coverTitle":"Test"}"#).unwrap();
        assert_eq!(config.cover_title, "Test");
        assert_eq!(config.bubble_color, BubbleColor::Pink);
    }

    #[test]
    fn unknown_enum_values_fall_back_to_default() {
        let config: CardConfig =
            serde_json::from_str(r#"{"font":"Comic Sans","bubbleColor":"green","filter":"blur"}"#)
                .unwrap();
        assert_eq!(config.font, Font::NotoSerifTc);
        assert_eq!(config.bubble_color, BubbleColor::Pink);
        assert_eq!(config.filter, PhotoFilter::Plain);
    }

    #[test]
    fn wire_enums_cover_every_variant() {
        for font in Font::ALL {
            assert_eq!(Font::from_wire(font.as_str()), Some(*font));
        }
        for color in BubbleColor::ALL {
            assert_eq!(BubbleColor::from_wire(color.as_str()), Some(*color));
        }
        for filter in PhotoFilter::ALL {
            assert_eq!(PhotoFilter::from_wire(filter.as_str()), Some(*filter));
        }
    }

    #[test]
    fn slots_map_positions() {
        let photos: Vec<Photo> = (0..7)
            .map(|i| Photo::default().with_caption(format!("c{i}")))
            .collect();
        let slots = PhotoSlots::try_from(photos).unwrap();
        assert_eq!(slots.hero.caption, "c0");
        assert_eq!(slots.page_two[2].caption, "c3");
        assert_eq!(slots.page_three[0].caption, "c4");
        assert_eq!(slots.get(6).unwrap().caption, "c6");
        assert!(slots.get(7).is_none());
    }

    #[test]
    fn slots_pad_short_arrays() {
        let slots = PhotoSlots::try_from(vec![Photo::with_source("https://h")]).unwrap();
        assert_eq!(slots.hero.src(), Some("https://h"));
        assert_eq!(slots.iter().count(), SLOT_COUNT);
        assert!(slots.iter().skip(1).all(|p| p == &Photo::default()));
    }

    #[test]
    fn slots_reject_long_arrays() {
        let photos = vec![Photo::default(); 8];
        assert!(PhotoSlots::try_from(photos).is_err());
    }

    #[test]
    fn slots_serialize_as_flat_array() {
        let json = serde_json::to_value(PhotoSlots::default()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(SLOT_COUNT));
    }

    #[test]
    fn page_of_slot() {
        assert_eq!(PhotoSlots::page_of(0), Some(1));
        assert_eq!(PhotoSlots::page_of(3), Some(2));
        assert_eq!(PhotoSlots::page_of(4), Some(3));
        assert_eq!(PhotoSlots::page_of(7), None);
    }

    #[test]
    fn state_requires_both_top_level_keys() {
        assert!(CardState::from_json(r#"{"config":{}}"#).is_err());
        assert!(CardState::from_json(r#"{"photos":[]}"#).is_err());
        assert!(CardState::from_json(r#"{"config":{},"photos":[]}"#).is_ok());
    }

    #[test]
    fn inline_image_detection() {
        let mut state = CardState::default();
        assert!(!state.has_inline_images());
        state.photos.page_two[1] = Photo::with_source("https://example.com/a.jpg");
        assert!(!state.has_inline_images());
        state.photos.hero = Photo::with_source("data:image/jpeg;base64,AAAA");
        assert!(state.has_inline_images());
    }
}
