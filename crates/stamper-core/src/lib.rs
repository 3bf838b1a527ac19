//! Stamper core library
//!
//! Numbered stamps over a background image: the stamp collection and its
//! renumbering rules, the tag file codec, and the compositor that burns
//! numbered badges into a copy of the background.

mod align;
pub mod background;
pub mod badge;
pub mod codec;
pub mod collection;
pub mod compositor;
pub mod config;
pub mod error;
pub mod naming;
pub mod session;
pub mod stamp;

pub use background::{normalize_color, save_image, Background, Resolution, ResolutionUnit};
pub use badge::{BadgeRenderer, DiscBadgeRenderer};
pub use collection::StampCollection;
pub use compositor::Compositor;
pub use config::{
    ConfigError, StamperConfig, DEFAULT_BADGE_SIZE, DEFAULT_DPI, MAX_BADGE_SIZE, MAX_PIXEL_RATIO,
};
pub use error::{Result, StampError};
pub use naming::StampPaths;
pub use session::{SavedFiles, StampSession};
pub use stamp::{Change, Direction, Point, Stamp, StampId};
