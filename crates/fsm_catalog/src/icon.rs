//! Icon resolution.
//!
//! Icons are looked up in three tiers, stopping at the first image that decodes:
//!
//! 1. the archive itself (the declared `iconFilename`, its `.dds` twin, then a
//!    root-level `icon.png` / `icon.dds`);
//! 2. the game installation (`$data/...` references, or any file with the same
//!    name found under the game directory);
//! 3. a fixed placeholder.
//!
//! Found images are scaled to a square of the configured size and re-encoded as
//! PNG so the report can inline them.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use camino::{Utf8Path, Utf8PathBuf};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::archive::{normalize_entry_name, ModArchive};
use crate::error::Result;

/// Prefix of icon references pointing into the game's own data directory.
const GAME_DATA_PREFIX: &str = "$data/";

/// Root-level archive entries tried when the declared icon is missing.
const CONVENTIONAL_ICONS: &[&str] = &["icon.png", "icon.dds"];

const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="128" height="128" viewBox="0 0 128 128">"##,
    r##"<rect width="128" height="128" fill="#3f3f3f"/>"##,
    r##"<text x="64" y="76" font-family="sans-serif" font-size="40" fill="#7fc032" text-anchor="middle">?</text>"##,
    r##"</svg>"##
);

/// Resolved icon for a mod.
#[derive(Debug, Clone, PartialEq)]
pub enum Icon {
    /// Image read from the mod archive, re-encoded as PNG.
    Embedded { entry: String, png: Vec<u8> },
    /// Image read from the game installation, re-encoded as PNG.
    GameAsset { path: Utf8PathBuf, png: Vec<u8> },
    /// No image found.
    Placeholder,
}

impl Icon {
    /// `data:` URI suitable for an `<img src>`.
    pub fn data_uri(&self) -> String {
        match self {
            Icon::Embedded { png, .. } | Icon::GameAsset { png, .. } => {
                format!("data:image/png;base64,{}", STANDARD.encode(png))
            }
            Icon::Placeholder => placeholder_data_uri(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Icon::Placeholder)
    }
}

pub fn placeholder_data_uri() -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(PLACEHOLDER_SVG)
    )
}

/// Decode `bytes`, scale to `size`×`size` and encode as PNG.
pub fn scale_to_png(bytes: &[u8], size: u32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let img = DynamicImage::ImageRgba8(img.to_rgba8()).resize_exact(size, size, FilterType::Triangle);

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Reference variants to try: the name itself, then `.png` swapped for `.dds`
/// (mods often declare a PNG but ship a DDS).
fn reference_variants(reference: &str) -> Vec<String> {
    let mut variants = vec![reference.to_string()];
    let lower = reference.to_ascii_lowercase();
    if lower.ends_with(".png") {
        variants.push(format!("{}.dds", &reference[..reference.len() - 4]));
    }
    variants
}

/// Index of file names under the game directory.
#[derive(Debug, Default)]
struct AssetIndex {
    /// Lowercased file name -> paths, sorted.
    files: HashMap<String, Vec<Utf8PathBuf>>,
}

impl AssetIndex {
    fn build(root: &Utf8Path) -> Self {
        if !root.as_std_path().is_dir() {
            tracing::warn!(
                "Game directory {} not found; icons will not be looked up there",
                root
            );
            return Self::default();
        }

        let mut files: HashMap<String, Vec<Utf8PathBuf>> = HashMap::new();
        for entry in walkdir::WalkDir::new(root.as_std_path()) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable game asset entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(p) => p,
                Err(p) => {
                    tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                    continue;
                }
            };
            let Some(name) = path.file_name() else {
                continue;
            };
            files.entry(name.to_lowercase()).or_default().push(path);
        }

        for paths in files.values_mut() {
            paths.sort();
        }

        tracing::debug!("Game asset index: {} file names under {}", files.len(), root);
        Self { files }
    }

    fn find(&self, file_name: &str) -> Option<&Utf8PathBuf> {
        self.files
            .get(&file_name.to_lowercase())
            .and_then(|paths| paths.first())
    }
}

/// Resolves mod icons.
pub struct IconLocator {
    game_dir: Utf8PathBuf,
    icon_size: u32,
    asset_index: OnceCell<AssetIndex>,
}

impl IconLocator {
    pub fn new(game_dir: impl Into<Utf8PathBuf>, icon_size: u32) -> Self {
        Self {
            game_dir: game_dir.into(),
            icon_size: icon_size.max(1),
            asset_index: OnceCell::new(),
        }
    }

    /// Resolve the icon for a mod whose descriptor declares `reference`.
    /// Always returns an icon.
    pub fn locate<R: Read + Seek>(
        &self,
        reference: Option<&str>,
        archive: &mut ModArchive<R>,
    ) -> Icon {
        if let Some(icon) = self.from_archive(reference, archive) {
            return icon;
        }
        if let Some(icon) = reference.and_then(|r| self.from_game_assets(r)) {
            return icon;
        }
        Icon::Placeholder
    }

    fn from_archive<R: Read + Seek>(
        &self,
        reference: Option<&str>,
        archive: &mut ModArchive<R>,
    ) -> Option<Icon> {
        let mut candidates: Vec<String> = reference
            .filter(|r| !r.starts_with(GAME_DATA_PREFIX))
            .map(|r| reference_variants(&normalize_entry_name(r)))
            .unwrap_or_default();
        candidates.extend(CONVENTIONAL_ICONS.iter().map(|c| c.to_string()));

        for candidate in candidates {
            let data = match archive.read_entry(&candidate) {
                Ok(Some(data)) => data,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!("Failed to read icon entry {}: {}", candidate, e);
                    continue;
                }
            };
            match scale_to_png(&data, self.icon_size) {
                Ok(png) => {
                    return Some(Icon::Embedded {
                        entry: candidate,
                        png,
                    })
                }
                Err(e) => tracing::warn!("Icon {} could not be decoded: {}", candidate, e),
            }
        }
        None
    }

    fn from_game_assets(&self, reference: &str) -> Option<Icon> {
        let paths: Vec<Utf8PathBuf> = match reference.strip_prefix(GAME_DATA_PREFIX) {
            Some(rest) => reference_variants(&normalize_entry_name(rest))
                .into_iter()
                .map(|variant| self.game_dir.join("data").join(variant))
                .filter(|path| path.as_std_path().is_file())
                .collect(),
            None => {
                let file_name = normalize_entry_name(reference)
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let index = self
                    .asset_index
                    .get_or_init(|| AssetIndex::build(&self.game_dir));
                reference_variants(&file_name)
                    .iter()
                    .filter_map(|variant| index.find(variant).cloned())
                    .collect()
            }
        };

        for path in paths {
            let data = match std::fs::read(path.as_std_path()) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!("Failed to read game asset {}: {}", path, e);
                    continue;
                }
            };
            match scale_to_png(&data, self.icon_size) {
                Ok(png) => return Some(Icon::GameAsset { path, png }),
                Err(e) => tracing::warn!("Game asset {} could not be decoded: {}", path, e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 4, Rgba(color));
        let mut data = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    fn archive_with(entries: &[(&str, Vec<u8>)]) -> ModArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        ModArchive::new(zip.finish().unwrap()).unwrap()
    }

    fn game_dir_with(files: &[(&str, Vec<u8>)]) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for (name, data) in files {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, data).unwrap();
        }
        dir
    }

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
    }

    fn decoded_size(png: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory_with_format(png, ImageFormat::Png).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_archive_icon_preferred_over_game_asset() {
        let game = game_dir_with(&[("data/store/icon_tractor.png", png_bytes([0, 0, 255, 255]))]);
        let mut archive = archive_with(&[("store/icon_tractor.png", png_bytes([255, 0, 0, 255]))]);
        let locator = IconLocator::new(utf8(game.path()), 16);

        let icon = locator.locate(Some("store/icon_tractor.png"), &mut archive);
        match icon {
            Icon::Embedded { entry, png } => {
                assert_eq!(entry, "store/icon_tractor.png");
                assert_eq!(decoded_size(&png), (16, 16));
            }
            other => panic!("expected embedded icon, got {:?}", other),
        }
    }

    #[test]
    fn test_game_asset_used_when_archive_has_none() {
        let game = game_dir_with(&[("data/store/store_tractor.png", png_bytes([0, 255, 0, 255]))]);
        let mut archive = archive_with(&[("modDesc.xml", b"<modDesc/>".to_vec())]);
        let locator = IconLocator::new(utf8(game.path()), 8);

        let icon = locator.locate(Some("$data/store/store_tractor.png"), &mut archive);
        match icon {
            Icon::GameAsset { path, png } => {
                assert!(path.as_str().ends_with("store_tractor.png"));
                assert_eq!(decoded_size(&png), (8, 8));
            }
            other => panic!("expected game asset icon, got {:?}", other),
        }
    }

    #[test]
    fn test_game_asset_found_by_file_name() {
        let game = game_dir_with(&[("data/vehicles/Brand/ICON_Plow.png", png_bytes([9, 9, 9, 255]))]);
        let mut archive = archive_with(&[("modDesc.xml", b"<modDesc/>".to_vec())]);
        let locator = IconLocator::new(utf8(game.path()), 8);

        let icon = locator.locate(Some("textures/icon_plow.png"), &mut archive);
        assert!(matches!(icon, Icon::GameAsset { .. }));
    }

    #[test]
    fn test_placeholder_when_nothing_found() {
        let game = game_dir_with(&[]);
        let mut archive = archive_with(&[("modDesc.xml", b"<modDesc/>".to_vec())]);
        let locator = IconLocator::new(utf8(game.path()), 8);

        assert_eq!(
            locator.locate(Some("store/missing.png"), &mut archive),
            Icon::Placeholder
        );
        assert_eq!(locator.locate(None, &mut archive), Icon::Placeholder);
    }

    #[test]
    fn test_placeholder_when_game_dir_missing() {
        let game = tempdir().unwrap();
        let missing = utf8(game.path()).join("nope");
        let mut archive = archive_with(&[]);
        let locator = IconLocator::new(missing, 8);

        assert!(locator.locate(Some("icon.png"), &mut archive).is_placeholder());
    }

    #[test]
    fn test_declared_png_falls_back_to_dds_entry() {
        // Format is sniffed from content, so PNG bytes stand in for the DDS.
        let mut archive = archive_with(&[("store/icon.dds", png_bytes([7, 7, 7, 255]))]);
        let locator = IconLocator::new("/nonexistent-game-dir", 8);

        let icon = locator.locate(Some("store/icon.png"), &mut archive);
        match icon {
            Icon::Embedded { entry, png } => {
                assert_eq!(entry, "store/icon.dds");
                assert_eq!(decoded_size(&png), (8, 8));
            }
            other => panic!("expected embedded icon, got {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_entry_falls_through_to_conventional_icon() {
        // The declared PNG is garbage, the conventional icon is valid.
        let mut archive = archive_with(&[
            ("store/icon.png", b"not an image".to_vec()),
            ("icon.png", png_bytes([1, 2, 3, 255])),
        ]);
        let locator = IconLocator::new("/nonexistent-game-dir", 8);

        let icon = locator.locate(Some("store/icon.png"), &mut archive);
        match icon {
            Icon::Embedded { entry, .. } => assert_eq!(entry, "icon.png"),
            other => panic!("expected embedded icon, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_variants() {
        assert_eq!(
            reference_variants("store/icon.PNG"),
            vec!["store/icon.PNG".to_string(), "store/icon.dds".to_string()]
        );
        assert_eq!(reference_variants("icon.dds"), vec!["icon.dds".to_string()]);
    }

    #[test]
    fn test_data_uri() {
        let icon = Icon::Embedded {
            entry: "icon.png".to_string(),
            png: vec![1, 2, 3],
        };
        assert_eq!(icon.data_uri(), "data:image/png;base64,AQID");
        assert!(Icon::Placeholder
            .data_uri()
            .starts_with("data:image/svg+xml;base64,"));
    }
}
