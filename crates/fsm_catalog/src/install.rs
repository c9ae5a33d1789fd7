//! Install-state lookup.
//!
//! A mod counts as installed when the install directory holds a top-level folder
//! or file whose normalized name equals the normalized mod name or the
//! normalized archive stem. See [`normalize_mod_name`] for the rule.

use std::collections::HashSet;
use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

/// Normalize a mod or folder name for install matching.
///
/// 1. A trailing `.zip` extension is dropped (case-insensitive).
/// 2. The name is lowercased.
/// 3. A trailing version suffix is stripped: separators (space, `_`, `-`)
///    followed by `v1`, `v1.2`, `v1_2_0` or a dotted number like `1.2` / `1_0_3`.
/// 4. Every non-alphanumeric character is removed.
///
/// `"Big_Tractor"`, `"big tractor"` and `"Big-Tractor v1.2.zip"` all normalize to
/// `"bigtractor"`; `"Tractor2"` keeps its digit.
pub fn normalize_mod_name(name: &str) -> String {
    static VERSION_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let version_suffix = VERSION_SUFFIX.get_or_init(|| {
        Regex::new(r"[\s_\-]+(?:v\d+(?:[._]\d+)*|\d+(?:[._]\d+)+)$").expect("valid version pattern")
    });

    let trimmed = name.trim();
    let without_ext = match trimmed.len().checked_sub(4) {
        Some(idx)
            if trimmed.is_char_boundary(idx) && trimmed[idx..].eq_ignore_ascii_case(".zip") =>
        {
            &trimmed[..idx]
        }
        _ => trimmed,
    };

    let lower = without_ext.to_lowercase();
    let without_version = version_suffix.replace(&lower, "");
    without_version
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Normalized names of everything present in the install directory.
#[derive(Debug, Default, Clone)]
pub struct InstallIndex {
    names: HashSet<String>,
}

impl InstallIndex {
    /// Scan the top level of `dir`. A missing or unreadable directory yields an
    /// empty index.
    pub fn scan(dir: &Utf8Path) -> Self {
        let entries = match std::fs::read_dir(dir.as_std_path()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Install directory {} is not readable ({}); treating all mods as not installed",
                    dir,
                    e
                );
                return Self::default();
            }
        };

        let mut names = HashSet::new();
        for entry in entries.flatten() {
            let path = match Utf8PathBuf::from_path_buf(entry.path()) {
                Ok(p) => p,
                Err(p) => {
                    tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                    continue;
                }
            };
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let normalized = normalize_mod_name(file_name);
            if !normalized.is_empty() {
                names.insert(normalized);
            }
        }

        tracing::debug!("Install index: {} entries in {}", names.len(), dir);
        Self { names }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| normalize_mod_name(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether a mod with display `name` from archive `archive_stem` is installed.
    pub fn is_installed(&self, name: &str, archive_stem: &str) -> bool {
        [name, archive_stem].iter().any(|candidate| {
            let normalized = normalize_mod_name(candidate);
            !normalized.is_empty() && self.names.contains(&normalized)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_mod_name() {
        assert_eq!(normalize_mod_name("Big Tractor"), "bigtractor");
        assert_eq!(normalize_mod_name("Big_Tractor"), "bigtractor");
        assert_eq!(normalize_mod_name("BIG-TRACTOR.zip"), "bigtractor");
        assert_eq!(normalize_mod_name("Big Tractor v1.2"), "bigtractor");
        assert_eq!(normalize_mod_name("FS17_BigTractor_1_0_3.ZIP"), "fs17bigtractor");
        assert_eq!(normalize_mod_name("Big Tractor 2.0.1"), "bigtractor");
        assert_eq!(normalize_mod_name("Tractor2"), "tractor2");
        assert_eq!(normalize_mod_name("Tractor 2"), "tractor2");
        assert_eq!(normalize_mod_name("Schlepper Größe"), "schleppergröße");
        assert_eq!(normalize_mod_name("___"), "");
    }

    #[test]
    fn test_is_installed_by_name_or_stem() {
        let index = InstallIndex::from_names(["Big_Tractor", "FS17_SeedDrill.zip"]);

        assert!(index.is_installed("Big Tractor", "ModA"));
        assert!(index.is_installed("big tractor", "ModA"));
        assert!(index.is_installed("Seed Drill Deluxe", "FS17_SeedDrill"));
        assert!(!index.is_installed("Small Tractor", "ModC"));
        assert!(!index.is_installed("", "___"));
    }

    #[test]
    fn test_scan_directory() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("big_TRACTOR")).unwrap();
        std::fs::write(dir.path().join("FS17_Trailer.zip"), b"").unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap();

        let index = InstallIndex::scan(path);
        assert_eq!(index.len(), 2);
        assert!(index.is_installed("Big Tractor", "whatever"));
        assert!(index.is_installed("Trailer", "FS17_Trailer"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = Utf8Path::from_path(dir.path()).unwrap().join("does-not-exist");

        let index = InstallIndex::scan(&missing);
        assert!(index.is_empty());
        assert!(!index.is_installed("Big Tractor", "ModA"));
    }
}
