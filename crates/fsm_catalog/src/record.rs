use camino::Utf8PathBuf;

use crate::icon::Icon;

/// Whether a mod declares multiplayer support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Multiplayer {
    Supported,
    Unsupported,
    #[default]
    Unknown,
}

impl Multiplayer {
    /// Interpret the `supported` attribute of `<multiplayer>`.
    pub fn from_flag(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Self::Supported,
            "false" => Self::Unsupported,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Supported => "supported",
            Self::Unsupported => "not supported",
            Self::Unknown => "unknown",
        }
    }
}

/// Report section a mod is listed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModCategory {
    #[default]
    Other,
    Map,
}

impl ModCategory {
    pub fn heading(self) -> &'static str {
        match self {
            Self::Other => "Category: Other Mods",
            Self::Map => "Category: Maps",
        }
    }
}

/// A purchasable item declared by a mod.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreItem {
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: String,
    pub daily_upkeep: String,
}

/// Everything the report shows about one archive.
#[derive(Debug, Clone)]
pub struct ModRecord {
    pub archive_path: Utf8PathBuf,
    /// Descriptor title, or the archive file stem when the descriptor has none.
    pub name: String,
    pub version: Option<String>,
    pub author: Option<String>,
    pub multiplayer: Multiplayer,
    /// Trusted markup, embedded in the report without escaping.
    pub description_html: String,
    pub icon: Icon,
    pub installed: bool,
    pub category: ModCategory,
    pub store_items: Vec<StoreItem>,
}

impl ModRecord {
    /// File name of the archive, used as the report link target.
    pub fn archive_file_name(&self) -> &str {
        self.archive_path
            .file_name()
            .unwrap_or(self.archive_path.as_str())
    }
}
