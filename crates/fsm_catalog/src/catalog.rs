//! Per-run pipeline: enumerate archives, read each into a [`ModRecord`], render,
//! write.
//!
//! Failures on a single archive are logged and recorded as [`SkippedArchive`];
//! the run only aborts when the vault is missing or the report cannot be written.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use crate::archive::ModArchive;
use crate::descriptor::{DescriptorParser, DEFAULT_LANGUAGES};
use crate::error::{Error, Result};
use crate::icon::IconLocator;
use crate::install::InstallIndex;
use crate::record::ModRecord;
use crate::report::ReportRenderer;

pub const DEFAULT_TITLE: &str = "FS17 - Mod List";
pub const DEFAULT_ICON_SIZE: u32 = 128;

/// Settings for one run, built once from configuration.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Directory the game loads mods from.
    pub install_dir: Utf8PathBuf,
    /// Game installation, searched for fallback icons.
    pub game_dir: Utf8PathBuf,
    /// Directory holding the mod archives; the report is written here.
    pub vault_dir: Utf8PathBuf,
    /// Report file name, relative to `vault_dir`.
    pub output_file: String,
    pub title: String,
    pub icon_size: u32,
    pub languages: Vec<String>,
}

impl CatalogSettings {
    pub fn new(
        install_dir: impl Into<Utf8PathBuf>,
        game_dir: impl Into<Utf8PathBuf>,
        vault_dir: impl Into<Utf8PathBuf>,
        output_file: impl Into<String>,
    ) -> Self {
        Self {
            install_dir: install_dir.into(),
            game_dir: game_dir.into(),
            vault_dir: vault_dir.into(),
            output_file: output_file.into(),
            title: DEFAULT_TITLE.to_string(),
            icon_size: DEFAULT_ICON_SIZE,
            languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn output_path(&self) -> Utf8PathBuf {
        self.vault_dir.join(&self.output_file)
    }
}

/// An archive left out of the report, with the reason.
#[derive(Debug)]
pub struct SkippedArchive {
    pub path: Utf8PathBuf,
    pub reason: Error,
}

/// Outcome of [`Catalog::generate`].
#[derive(Debug)]
pub struct CatalogSummary {
    pub processed: usize,
    pub installed: usize,
    pub skipped: Vec<SkippedArchive>,
    pub output_path: Utf8PathBuf,
}

/// List `*.zip` files directly inside `vault_dir`, sorted by file name.
pub fn list_archives(vault_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !vault_dir.as_std_path().is_dir() {
        return Err(Error::VaultMissing(vault_dir.to_path_buf()));
    }

    let mut archives = Vec::new();
    for entry in std::fs::read_dir(vault_dir.as_std_path())? {
        let entry = entry?;
        let path = match Utf8PathBuf::from_path_buf(entry.path()) {
            Ok(p) => p,
            Err(p) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                continue;
            }
        };
        if !path.as_std_path().is_file() {
            continue;
        }
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip {
            archives.push(path);
        }
    }

    archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(archives)
}

/// Write `contents` to `path` in one step: a temporary file in the same
/// directory is written and then renamed over the target.
pub fn write_report(path: &Utf8Path, contents: &str) -> Result<()> {
    let output_error = |source: std::io::Error| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir.as_std_path()).map_err(output_error)?;
    file.write_all(contents.as_bytes()).map_err(output_error)?;
    file.as_file().sync_all().map_err(output_error)?;

    // The temporary file is owner-only; keep the target's mode or use the
    // usual 0644 for a new report.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::metadata(path.as_std_path())
            .map(|m| m.permissions())
            .unwrap_or_else(|_| std::fs::Permissions::from_mode(0o644));
        file.as_file()
            .set_permissions(permissions)
            .map_err(output_error)?;
    }

    file.persist(path.as_std_path())
        .map_err(|e| output_error(e.error))?;
    Ok(())
}

/// Drives the per-archive pipeline for one run.
pub struct Catalog {
    settings: CatalogSettings,
    parser: DescriptorParser,
    install_index: InstallIndex,
    icons: IconLocator,
}

impl Catalog {
    /// Prepare a run. Scans the install directory once.
    pub fn new(settings: CatalogSettings) -> Self {
        let parser = DescriptorParser::new(settings.languages.clone());
        let install_index = InstallIndex::scan(&settings.install_dir);
        let icons = IconLocator::new(settings.game_dir.clone(), settings.icon_size);
        Self {
            settings,
            parser,
            install_index,
            icons,
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Read one archive into a record.
    pub fn read_mod(&self, archive_path: &Utf8Path) -> Result<ModRecord> {
        let mut archive = ModArchive::open(archive_path)?;
        let descriptor_bytes = archive.read_descriptor()?;

        let descriptor = self
            .parser
            .parse_with(&descriptor_bytes, |name| match archive.read_entry(name) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!("Failed to read {} from {}: {}", name, archive_path, e);
                    None
                }
            })?;

        let archive_stem = archive_path.file_stem().unwrap_or_default();
        let name = descriptor
            .title
            .clone()
            .unwrap_or_else(|| archive_stem.to_string());
        let installed = self.install_index.is_installed(&name, archive_stem);
        let icon = self
            .icons
            .locate(descriptor.icon_reference.as_deref(), &mut archive);

        if icon.is_placeholder() {
            tracing::debug!(
                "No icon found for {} (declared: {:?})",
                archive_path,
                descriptor.icon_reference
            );
        }

        Ok(ModRecord {
            archive_path: archive_path.to_path_buf(),
            name,
            version: descriptor.version,
            author: descriptor.author,
            multiplayer: descriptor.multiplayer,
            description_html: descriptor.description_html,
            icon,
            installed,
            category: descriptor.category,
            store_items: descriptor.store_items,
        })
    }

    /// Read every archive in the vault. Records are sorted by name
    /// (case-insensitive), then archive file name.
    pub fn collect(&self) -> Result<(Vec<ModRecord>, Vec<SkippedArchive>)> {
        let archives = list_archives(&self.settings.vault_dir)?;
        if archives.is_empty() {
            tracing::warn!("No mod archives (*.zip) found in {}", self.settings.vault_dir);
        } else {
            tracing::info!(
                "Reading information for {} mods in {}",
                archives.len(),
                self.settings.vault_dir
            );
        }

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for path in archives {
            match self.read_mod(&path) {
                Ok(record) => {
                    tracing::debug!("Read {} from {}", record.name, path);
                    records.push(record);
                }
                Err(reason) => {
                    tracing::warn!("Skipping {}: {}", path, reason);
                    skipped.push(SkippedArchive { path, reason });
                }
            }
        }

        let records = records
            .into_iter()
            .sorted_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.archive_file_name().cmp(b.archive_file_name()))
            })
            .collect();

        Ok((records, skipped))
    }

    /// Run the whole pipeline and write the report.
    pub fn generate(&self) -> Result<CatalogSummary> {
        let (records, skipped) = self.collect()?;

        let renderer = ReportRenderer::new(self.settings.title.clone(), self.settings.icon_size);
        let html = renderer.render(&records);

        let output_path = self.settings.output_path();
        tracing::info!("Writing HTML file: {}", output_path);
        write_report(&output_path, &html)?;

        Ok(CatalogSummary {
            processed: records.len(),
            installed: records.iter().filter(|r| r.installed).count(),
            skipped,
            output_path,
        })
    }
}
