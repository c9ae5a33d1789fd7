//! Catalog builder for Farming Simulator mod collections.
//!
//! This crate reads a directory of mod archives (`.zip` files carrying a
//! `modDesc.xml`) and renders a static HTML overview of them:
//!
//! - **Archive reading**: in-memory extraction of descriptor, translation, store
//!   item and icon entries
//! - **Descriptor parsing**: a tolerant `modDesc.xml` reader with defaults for
//!   every optional field
//! - **Install state**: normalized-name matching against the game's mod folder
//! - **Icons**: archive, game installation or placeholder, scaled to a fixed size
//! - **Report**: one self-contained HTML document
//!
//! # Example
//!
//! ```no_run
//! use fsm_catalog::{Catalog, CatalogSettings};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = CatalogSettings::new(
//!     "/home/me/Documents/My Games/FarmingSimulator2017/mods",
//!     "/games/Farming Simulator 17",
//!     "/backup/Mods",
//!     "_FS17_Mod_List.html",
//! );
//!
//! let summary = Catalog::new(settings).generate()?;
//! println!("{} mods written to {}", summary.processed, summary.output_path);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod icon;
pub mod install;
pub mod markup;
pub mod record;
pub mod report;

pub use archive::ModArchive;
pub use catalog::{
    list_archives, write_report, Catalog, CatalogSettings, CatalogSummary, SkippedArchive,
    DEFAULT_ICON_SIZE, DEFAULT_TITLE,
};
pub use descriptor::{DescriptorParser, ModDescriptor, DEFAULT_LANGUAGES};
pub use error::{Error, Result};
pub use icon::{Icon, IconLocator};
pub use install::{normalize_mod_name, InstallIndex};
pub use record::{ModCategory, ModRecord, Multiplayer, StoreItem};
pub use report::{escape_html, ReportRenderer};
