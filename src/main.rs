use clap::{Parser, Subcommand, ValueEnum};
use love_diary::config::{self, AppConfig, ShareChannel};
use love_diary::generate::{self, CardSettings};
use love_diary::imaging::{RustBackend, normalize_or_unset};
use love_diary::store::FsStore;
use love_diary::types::{BubbleColor, CardState, Font, PhotoFilter, SLOT_COUNT};
use love_diary::{import, link, output};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "love-diary")]
#[command(about = "Build photo greeting cards and share them as links or offline HTML")]
#[command(long_about = "\
Build photo greeting cards and share them as links or offline HTML

A card is a cover, a letter page with a hero photo, and two pages of three
photos. Cards are stored as JSON files; a downloaded card (.html) can be
used anywhere a card file is expected.

Slots:

  0      hero photo, shown in the heart frame on the letter page
  1-3    page two (slot 3 spans the full width)
  4-6    page three (slot 6 spans the full width)

Sharing:

  share --channel compressed   link carries the whole card (default)
  share --channel legacy       older link format, refused over 8000 bytes
  share --channel cloud        card is saved to the store, link carries its id
  download                     single offline HTML file

Run 'love-diary gen-config' to generate a documented love-diary.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding love-diary.toml (and the card store by default)
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Card text and style flags shared by `new` and `edit`.
#[derive(clap::Args, Clone)]
struct CardArgs {
    /// Cover title
    #[arg(long)]
    title: Option<String>,
    /// Recipient name
    #[arg(long)]
    to: Option<String>,
    /// Letter text
    #[arg(long)]
    intro: Option<String>,
    /// Font family name, e.g. "Long Cang"
    #[arg(long, value_parser = parse_wire::<Font>)]
    font: Option<Font>,
    /// Caption bubble colour: pink, blue, white
    #[arg(long, value_parser = parse_wire::<BubbleColor>)]
    bubble: Option<BubbleColor>,
    /// Photo filter: sepia-0, sepia, grayscale
    #[arg(long, value_parser = parse_wire::<PhotoFilter>)]
    filter: Option<PhotoFilter>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Compressed,
    Legacy,
    Cloud,
}

impl From<ChannelArg> for ShareChannel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Compressed => ShareChannel::Compressed,
            ChannelArg::Legacy => ShareChannel::Legacy,
            ChannelArg::Cloud => ShareChannel::Cloud,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new card file with default text
    New {
        card: PathBuf,
        #[command(flatten)]
        fields: CardArgs,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Change the text or style of a card
    Edit {
        card: PathBuf,
        #[command(flatten)]
        fields: CardArgs,
    },
    /// Print a card's text, style, and photo slots
    Show { card: PathBuf },
    /// Set, clear, or adjust one photo slot
    SetPhoto {
        card: PathBuf,
        /// Slot index, 0-6
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..SLOT_COUNT as i64))]
        slot: u8,
        /// Image file, shrunk and embedded inline
        #[arg(long, conflicts_with_all = ["url", "clear"])]
        image: Option<PathBuf>,
        /// Remote image URL, referenced as-is
        #[arg(long, conflicts_with = "clear")]
        url: Option<String>,
        /// Remove the image
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        caption: Option<String>,
        /// Horizontal pan offset in pixels
        #[arg(long, allow_hyphen_values = true)]
        x: Option<f64>,
        /// Vertical pan offset in pixels
        #[arg(long, allow_hyphen_values = true)]
        y: Option<f64>,
        /// Zoom factor, clamped to 0.5-5
        #[arg(long)]
        zoom: Option<f64>,
        /// Zoom in (positive) or out (negative) by this many 0.1 steps
        #[arg(long, allow_hyphen_values = true, conflicts_with = "zoom")]
        nudge: Option<i32>,
    },
    /// Fill photo slots from the images in a directory (hero first, by name)
    Import { card: PathBuf, dir: PathBuf },
    /// Print the embedded links for a card without saving anything
    Link { card: PathBuf },
    /// Build a share link using the configured or given channel
    Share {
        card: PathBuf,
        #[arg(long, value_enum)]
        channel: Option<ChannelArg>,
    },
    /// Resolve an incoming link the way the card viewer does
    Open {
        url: String,
        /// Card already being edited, used when the link carries none
        #[arg(long)]
        current: Option<PathBuf>,
        /// Write the opened card to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Write the card as a single offline HTML file
    Download {
        card: PathBuf,
        /// Output file (defaults to card.filename from the config)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print a stock love-diary.toml with all options documented
    GenConfig,
}

fn parse_wire<T: WireValue>(value: &str) -> Result<T, String> {
    T::parse(value).ok_or_else(|| format!("expected one of: {}", T::choices().join(", ")))
}

/// Enums whose CLI spelling is their wire spelling.
trait WireValue: Sized + Clone + Send + Sync + 'static {
    fn parse(value: &str) -> Option<Self>;
    fn choices() -> Vec<&'static str>;
}

macro_rules! wire_value {
    ($($ty:ty),+) => {
        $(impl WireValue for $ty {
            fn parse(value: &str) -> Option<Self> {
                <$ty>::from_wire(value)
            }
            fn choices() -> Vec<&'static str> {
                <$ty>::ALL.iter().map(|v| v.as_str()).collect()
            }
        })+
    };
}

wire_value!(Font, BubbleColor, PhotoFilter);

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // Works even when the existing config file is broken
    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }
    let config = config::load_config(&cli.config_dir)?;
    let store = || FsStore::new(config.store.resolve(&cli.config_dir));

    match cli.command {
        Command::New {
            card,
            fields,
            force,
        } => {
            if card.exists() && !force {
                return Err(format!("{} already exists (use --force to overwrite)", card.display()).into());
            }
            let mut state = CardState::default();
            apply_fields(&mut state, fields);
            save_card(&card, &state, &config)?;
            println!("Created {}", card.display());
            output::print_card(&state);
        }
        Command::Edit { card, fields } => {
            let mut state = load_card(&card)?;
            apply_fields(&mut state, fields);
            save_card(&card, &state, &config)?;
            output::print_card(&state);
        }
        Command::Show { card } => {
            output::print_card(&load_card(&card)?);
        }
        Command::SetPhoto {
            card,
            slot,
            image,
            url,
            clear,
            caption,
            x,
            y,
            zoom,
            nudge,
        } => {
            let mut state = load_card(&card)?;
            let slot = usize::from(slot);
            // An image that fails to compress leaves the slot empty
            let uploaded = match &image {
                Some(path) => Some(normalize_or_unset(
                    &RustBackend::new(),
                    &fs::read(path)?,
                    &config.images.normalize_config(),
                )),
                None => None,
            };
            let Some(photo) = state.photos.get_mut(slot) else {
                return Err(format!("slot must be 0-{}", SLOT_COUNT - 1).into());
            };
            if clear {
                photo.set_source(None);
            } else if let Some(src) = uploaded {
                photo.set_source(src);
            } else if let Some(src) = url {
                photo.set_source(Some(src));
            }
            if let Some(caption) = caption {
                photo.caption = caption;
            }
            if x.is_some() || y.is_some() {
                let (x, y) = (x.unwrap_or(photo.x), y.unwrap_or(photo.y));
                photo.set_offset(x, y);
            }
            if let Some(zoom) = zoom {
                photo.set_zoom(zoom);
            }
            if let Some(notches) = nudge {
                photo.nudge_zoom(notches);
            }
            let lines = output::format_slot(slot, photo);
            save_card(&card, &state, &config)?;
            for line in lines {
                println!("{}", line);
            }
        }
        Command::Import { card, dir } => {
            let mut state = load_card(&card)?;
            init_thread_pool(&config.processing);
            let report = import::import_directory(
                &RustBackend::new(),
                &dir,
                &config.images.normalize_config(),
            )?;
            output::print_import_report(&report, &dir);
            if import::apply_import(&mut state, &report) > 0 {
                save_card(&card, &state, &config)?;
            }
        }
        Command::Link { card } => {
            let state = load_card(&card)?;
            let base = &config.share.base_url;
            match link::legacy_link(base, &state, config.share.legacy_payload_limit) {
                Ok(url) => output::print_share_link("Legacy", &url, &state),
                Err(e) => println!("Legacy link unavailable: {}", e.user_message()),
            }
            let url = link::compressed_link(base, &state).map_err(|e| surface(e.user_message(), e))?;
            output::print_share_link("Compressed", &url, &state);
        }
        Command::Share { card, channel } => {
            let state = load_card(&card)?;
            let base = &config.share.base_url;
            let channel = channel.map(ShareChannel::from).unwrap_or(config.share.channel);
            let (kind, url) = match channel {
                ShareChannel::Compressed => (
                    "Compressed",
                    link::compressed_link(base, &state).map_err(|e| surface(e.user_message(), e))?,
                ),
                ShareChannel::Legacy => (
                    "Legacy",
                    link::legacy_link(base, &state, config.share.legacy_payload_limit)
                        .map_err(|e| surface(e.user_message(), e))?,
                ),
                ShareChannel::Cloud => (
                    "Cloud",
                    link::share_via_store(base, &state, &store())
                        .map_err(|e| surface(e.user_message(), e))?,
                ),
            };
            output::print_share_link(kind, &url, &state);
        }
        Command::Open { url, current, save } => {
            let current = match &current {
                Some(path) => load_card(path)?,
                None => CardState::default(),
            };
            let ctx = link::LinkContext::parse(&url);
            let opened =
                link::open(&ctx, current, &store()).map_err(|e| surface(e.user_message(), e))?;
            output::print_opened(&opened);
            if let Some(path) = save {
                save_card(&path, &opened.state, &config)?;
                println!("Saved {}", path.display());
            }
        }
        Command::Download { card, output: out } => {
            let state = load_card(&card)?;
            let html = generate::generate_card(&state, card_settings(&config))?;
            let out = out.unwrap_or_else(|| PathBuf::from(&config.card.filename));
            fs::write(&out, html)?;
            println!("Wrote {} ({} bytes)", out.display(), fs::metadata(&out)?.len());
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn card_settings(config: &AppConfig) -> CardSettings<'_> {
    CardSettings {
        page: &config.card,
        theme: &config.theme,
    }
}

fn apply_fields(state: &mut CardState, fields: CardArgs) {
    let card = &mut state.config;
    if let Some(title) = fields.title {
        card.cover_title = title;
    }
    if let Some(to) = fields.to {
        card.to_name = to;
    }
    if let Some(intro) = fields.intro {
        card.intro = intro;
    }
    if let Some(font) = fields.font {
        card.font = font;
    }
    if let Some(bubble) = fields.bubble {
        card.bubble_color = bubble;
    }
    if let Some(filter) = fields.filter {
        card.filter = filter;
    }
}

fn is_html_card(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Read a card from JSON, or from the payload of a downloaded `.html` card.
fn load_card(path: &Path) -> Result<CardState, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    if is_html_card(path) {
        Ok(generate::extract_embedded_state(&content)?)
    } else {
        Ok(CardState::from_json(&content)?)
    }
}

/// Write a card back in the form it was read: `.html` paths get a freshly
/// rendered offline card, anything else pretty JSON.
fn save_card(path: &Path, state: &CardState, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let content = if is_html_card(path) {
        generate::generate_card(state, card_settings(config))?
    } else {
        serde_json::to_string_pretty(state)?
    };
    fs::write(path, content)?;
    Ok(())
}

/// Print the user-facing text for a failure, then propagate it.
fn surface(message: &str, e: impl Into<Box<dyn Error>>) -> Box<dyn Error> {
    eprintln!("{message}");
    e.into()
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
