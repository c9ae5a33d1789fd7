//! `modDesc.xml` parsing.
//!
//! Every field except the document itself is optional: a descriptor missing an
//! author, version or multiplayer flag parses fine and carries `None` or
//! [`Multiplayer::Unknown`]. Only a document that cannot be read as a whole is an
//! error.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::markup::{self, Element};
use crate::record::{ModCategory, Multiplayer, StoreItem};

/// Prefix marking a text as a reference into the mod's translation table.
const L10N_PREFIX: &str = "$l10n_";

/// Language preference used when none is configured.
pub const DEFAULT_LANGUAGES: &[&str] = &["en", "de", "fr"];

/// Metadata read from a mod descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModDescriptor {
    pub title: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub multiplayer: Multiplayer,
    pub icon_reference: Option<String>,
    pub description_html: String,
    pub category: ModCategory,
    pub store_items: Vec<StoreItem>,
}

/// Parses descriptors using a language preference order.
#[derive(Debug, Clone)]
pub struct DescriptorParser {
    languages: Vec<String>,
}

impl Default for DescriptorParser {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect())
    }
}

impl DescriptorParser {
    pub fn new(languages: Vec<String>) -> Self {
        let languages = if languages.is_empty() {
            DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect()
        } else {
            languages
        };
        Self { languages }
    }

    /// Parse a descriptor that has no companion files.
    pub fn parse(&self, bytes: &[u8]) -> Result<ModDescriptor> {
        self.parse_with(bytes, |_| None)
    }

    /// Parse a descriptor, loading companion files (translation tables, store
    /// item definitions) through `load_entry`.
    pub fn parse_with<F>(&self, bytes: &[u8], mut load_entry: F) -> Result<ModDescriptor>
    where
        F: FnMut(&str) -> Option<Vec<u8>>,
    {
        let root = markup::parse_document(bytes)?;
        if !root.name.eq_ignore_ascii_case("modDesc") {
            return Err(Error::MalformedDescriptor(format!(
                "unexpected root element <{}>",
                root.name
            )));
        }

        let mut l10n = Localizer::from_descriptor(&root, &self.languages);
        if let Some(prefix) = root.find("l10n").and_then(|e| e.attr("filenamePrefix")) {
            for language in &self.languages {
                let file_name = format!("{}_{}.xml", prefix, language);
                if let Some(data) = load_entry(&file_name) {
                    l10n.extend_from_file(&data);
                }
            }
        }

        let title = self.localized(&root, "title", &l10n);
        let version = root.find("version").map(Element::text).filter(|v| !v.is_empty());
        let author = root.find("author").map(Element::text).filter(|a| !a.is_empty());
        let multiplayer = root
            .find("multiplayer")
            .and_then(|e| e.attr("supported"))
            .map(Multiplayer::from_flag)
            .unwrap_or_default();
        let icon_reference = self.localized(&root, "iconFilename", &l10n);
        let description_html = root
            .find("description")
            .map(|e| self.description_html(e, &l10n))
            .unwrap_or_default();
        let category = if root.find("maps").is_some() {
            ModCategory::Map
        } else {
            ModCategory::Other
        };

        let mut store_items = Vec::new();
        for item in root.find_all("storeItems/storeItem") {
            let Some(xml_file) = item.attr("xmlFilename") else {
                continue;
            };
            let Some(data) = load_entry(xml_file) else {
                tracing::debug!("Store item file {} not found", xml_file);
                continue;
            };
            match self.parse_store_item(&data, &l10n) {
                Ok(Some(store_item)) => store_items.push(store_item),
                Ok(None) => tracing::debug!("Store item file {} has no storeData", xml_file),
                Err(e) => tracing::debug!("Skipping store item file {}: {}", xml_file, e),
            }
        }

        Ok(ModDescriptor {
            title,
            version,
            author,
            multiplayer,
            icon_reference,
            description_html,
            category,
            store_items,
        })
    }

    fn parse_store_item(&self, bytes: &[u8], l10n: &Localizer) -> Result<Option<StoreItem>> {
        let root = markup::parse_document(bytes)?;
        let Some(store_data) = root.find("storeData") else {
            return Ok(None);
        };

        let number = |name: &str| {
            store_data
                .find(name)
                .map(Element::text)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "0".to_string())
        };

        Ok(Some(StoreItem {
            name: self.localized(store_data, "name", l10n).unwrap_or_default(),
            brand: self.localized(store_data, "brand", l10n),
            category: self.localized(store_data, "category", l10n),
            price: number("price"),
            daily_upkeep: number("dailyUpkeep"),
        }))
    }

    /// Pick the language child of `element` according to the preference order,
    /// or `element` itself when it has no language children.
    fn select_language<'a>(&self, element: &'a Element) -> &'a Element {
        self.languages
            .iter()
            .find_map(|language| element.child(language))
            .unwrap_or(element)
    }

    fn localized(&self, parent: &Element, name: &str, l10n: &Localizer) -> Option<String> {
        let element = parent.find(name)?;
        let text = self.select_language(element).text();
        let text = l10n.resolve(&text);
        (!text.is_empty()).then_some(text)
    }

    fn description_html(&self, element: &Element, l10n: &Localizer) -> String {
        let markup = self.select_language(element).inner_markup();
        let markup = l10n.resolve(markup.trim());
        sanitize_description(&markup)
    }
}

/// Strip script elements and turn line breaks into `<br>`.
pub fn sanitize_description(text: &str) -> String {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    let script = SCRIPT.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?(?:</script\s*>|$)").expect("valid script pattern")
    });

    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = script.replace_all(&text, "");
    text.trim().replace('\n', "<br>\n")
}

/// Translation table for `$l10n_` references.
#[derive(Debug, Default)]
struct Localizer {
    texts: HashMap<String, String>,
}

impl Localizer {
    /// Collect `<l10n><text name="..">` entries declared inline.
    fn from_descriptor(root: &Element, languages: &[String]) -> Self {
        let mut texts = HashMap::new();
        for text in root.find_all("l10n/text") {
            let Some(name) = text.attr("name") else {
                continue;
            };
            let value = languages
                .iter()
                .find_map(|language| text.child(language))
                .unwrap_or(text)
                .text();
            texts.entry(name.to_string()).or_insert(value);
        }
        Self { texts }
    }

    /// Add entries from an external translation file (`<texts><text name text/>`).
    /// Inline entries and earlier files win.
    fn extend_from_file(&mut self, bytes: &[u8]) {
        let root = match markup::parse_document(bytes) {
            Ok(root) => root,
            Err(e) => {
                tracing::debug!("Ignoring unreadable translation file: {}", e);
                return;
            }
        };

        for text in root.find_all("texts/text") {
            if let (Some(name), Some(value)) = (text.attr("name"), text.attr("text")) {
                self.texts
                    .entry(name.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
    }

    fn resolve(&self, text: &str) -> String {
        text.strip_prefix(L10N_PREFIX)
            .and_then(|key| self.texts.get(key))
            .cloned()
            .unwrap_or_else(|| text.to_string())
    }
}
