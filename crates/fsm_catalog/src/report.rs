//! HTML report rendering.
//!
//! The report is a single self-contained document: stylesheet inlined, icons as
//! `data:` URIs, no timestamps. Identical records always render identical bytes.

use std::fmt::Write;

use crate::record::{ModCategory, ModRecord, Multiplayer, StoreItem};

/// Accent color used for headings and the installed background.
const ACCENT: &str = "#7fc032";

const CSS: &str = r#"
body {
    background-color: #1f1f1f;
    color: white;
    font-family: sans-serif;
}
a {
    color: inherit;
}
table td, table td * {
    vertical-align: top;
}
.accent {
    color: ACCENT;
}
.mod {
    padding: 4px;
    margin: 4px 0;
}
.mod.installed {
    background: ACCENT;
    color: #1f1f1f;
}
.mod.not-installed {
    background: #2b2b2b;
}
.mod.not-installed .name {
    color: ACCENT;
}
.desc {
    background: #3f3f3f;
    color: white;
}
.badge {
    display: inline-block;
    padding: 0 6px;
    border-radius: 3px;
    font-size: small;
}
.mp-yes {
    background: #2e7d32;
    color: white;
}
.mp-no {
    background: #c62828;
    color: white;
}
.mp-unknown {
    background: #616161;
    color: white;
}
.store-items {
    font-size: small;
}
.store-items td, .store-items th {
    padding: 0 6px;
    text-align: left;
}
"#;

/// Escape text for embedding in HTML content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders mod records into an HTML document.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    title: String,
    icon_size: u32,
}

impl ReportRenderer {
    pub fn new(title: impl Into<String>, icon_size: u32) -> Self {
        Self {
            title: title.into(),
            icon_size,
        }
    }

    /// Render `records`. Records are grouped by category; within a category they
    /// keep the order given.
    pub fn render(&self, records: &[ModRecord]) -> String {
        let mut html = String::new();
        let title = escape_html(&self.title);
        let installed = records.iter().filter(|r| r.installed).count();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        let _ = writeln!(html, "<title>{}</title>", title);
        let _ = writeln!(
            html,
            "<style type=\"text/css\">{}</style>",
            CSS.replace("ACCENT", ACCENT)
        );
        html.push_str("</head>\n<body>\n");
        let _ = writeln!(html, "<h1 class=\"accent\">{}</h1>", title);
        let _ = writeln!(
            html,
            "<p class=\"summary\">{} mods, {} installed</p>",
            records.len(),
            installed
        );

        for category in [ModCategory::Other, ModCategory::Map] {
            html.push_str("<hr>\n");
            let _ = writeln!(html, "<h1>{}</h1>", escape_html(category.heading()));
            for record in records.iter().filter(|r| r.category == category) {
                html.push_str("<hr>\n");
                self.render_record(&mut html, record);
            }
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn render_record(&self, html: &mut String, record: &ModRecord) {
        let status_class = if record.installed {
            "installed"
        } else {
            "not-installed"
        };
        let file_name = record.archive_file_name();

        let _ = writeln!(html, "<div class=\"mod {}\">", status_class);
        html.push_str("<table>\n<tr>\n");

        // Icon
        let _ = writeln!(
            html,
            "<td><img src=\"{}\" width=\"{size}\" height=\"{size}\" alt=\"\"></td>",
            record.icon.data_uri(),
            size = self.icon_size
        );

        // Metadata
        html.push_str("<td>\n");
        let _ = writeln!(
            html,
            "<div class=\"name\"><b>{}</b></div>",
            escape_html(&record.name)
        );
        let _ = writeln!(
            html,
            "<i><small><a href=\"{}\">{}</a></small></i>",
            escape_html(&urlencoding::encode(file_name)),
            escape_html(file_name)
        );
        let _ = writeln!(
            html,
            "<div>Version: {}</div>",
            escape_html(record.version.as_deref().unwrap_or("unknown"))
        );
        let _ = writeln!(
            html,
            "<div><small>Author: {}</small></div>",
            escape_html(record.author.as_deref().unwrap_or("unknown"))
        );
        let _ = writeln!(
            html,
            "<div><small>Installed: {}</small></div>",
            if record.installed { "yes" } else { "no" }
        );
        let _ = writeln!(
            html,
            "<div><small>Multiplayer: {}</small></div>",
            multiplayer_badge(record.multiplayer)
        );
        if !record.store_items.is_empty() {
            render_store_items(html, &record.store_items);
        }
        html.push_str("</td>\n");

        // Description
        let _ = writeln!(
            html,
            "<td class=\"desc\"><small>{}</small></td>",
            record.description_html
        );

        html.push_str("</tr>\n</table>\n</div>\n");
    }
}

fn multiplayer_badge(multiplayer: Multiplayer) -> String {
    let class = match multiplayer {
        Multiplayer::Supported => "mp-yes",
        Multiplayer::Unsupported => "mp-no",
        Multiplayer::Unknown => "mp-unknown",
    };
    format!(
        "<span class=\"badge {}\">{}</span>",
        class,
        multiplayer.label()
    )
}

fn render_store_items(html: &mut String, items: &[StoreItem]) {
    html.push_str("<table class=\"store-items\">\n");
    html.push_str("<tr><th>Item</th><th>Brand</th><th>Category</th><th>Price</th><th>Upkeep</th></tr>\n");
    for item in items {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&item.name),
            escape_html(item.brand.as_deref().unwrap_or("")),
            escape_html(item.category.as_deref().unwrap_or("")),
            escape_html(&item.price),
            escape_html(&item.daily_upkeep)
        );
    }
    html.push_str("</table>\n");
}
