use std::collections::BTreeMap;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::engine::RunSummary;
use crate::models::{LicenseLabel, PackageEntry};

/// One package across every chunk it appears in.
struct PackageRow<'a> {
    name: &'a str,
    version: &'a str,
    licenses: &'a [LicenseLabel],
    chunks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LicenseStatus {
    Resolved,
    Unmapped,
    Missing,
}

impl PackageRow<'_> {
    fn status(&self) -> LicenseStatus {
        if self.licenses.is_empty() {
            LicenseStatus::Missing
        } else if self.licenses.iter().any(|l| l.url.is_empty()) {
            LicenseStatus::Unmapped
        } else {
            LicenseStatus::Resolved
        }
    }
}

fn collect_rows(summary: &RunSummary) -> Vec<PackageRow<'_>> {
    let mut rows: BTreeMap<(&str, &str), PackageRow<'_>> = BTreeMap::new();
    for entry in summary.manifest.values().flatten() {
        let key = row_key(entry);
        rows.entry(key)
            .and_modify(|row| row.chunks += 1)
            .or_insert(PackageRow {
                name: key.0,
                version: key.1,
                licenses: &entry.licenses,
                chunks: 1,
            });
    }
    rows.into_values().collect()
}

fn row_key(entry: &PackageEntry) -> (&str, &str) {
    (
        entry.name.as_deref().unwrap_or("<unnamed>"),
        entry.version.as_deref().unwrap_or("-"),
    )
}

/// Print a colored summary of a finished run.
pub fn render(summary: &RunSummary, verbose: bool, quiet: bool) {
    let rows = collect_rows(summary);
    let missing = rows.iter().filter(|r| r.status() == LicenseStatus::Missing).count();
    let unmapped = rows.iter().filter(|r| r.status() == LicenseStatus::Unmapped).count();

    if quiet {
        println!(
            "Chunks: {}  Packages: {}  Unmapped: {}  Missing: {}",
            summary.manifest.len(),
            rows.len().to_string().green(),
            unmapped.to_string().yellow(),
            missing.to_string().red(),
        );
        return;
    }

    println!(
        "\n {} v{}",
        "license-listr".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Manifest: {}\n", summary.manifest_path.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Chunks              : {:>4}", summary.manifest.len()));
    println!(" │  {:<48} │", format!("Modules             : {:>4}", summary.modules));
    println!(" │  {:<48} │", format!("Packages            : {:>4}", rows.len()));
    println!(" │  {:<48} │", format!("Copied files        : {:>4}", summary.copied_files));
    println!(
        " │  {:<48} │",
        format!("{}  Licenses          : {:>4}  {}", "✓".green(), rows.len() - missing - unmapped, top_licenses(&rows))
    );
    println!(
        " │  {:<48} │",
        format!("{}  Unmapped          : {:>4}", "⚠".yellow(), unmapped)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Missing           : {:>4}", "✗".red(), missing)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if missing + unmapped > 0 {
        println!(" {} Packages with incomplete license information:\n", "[WARN]".yellow().bold());
        render_table(rows.iter().filter(|r| r.status() != LicenseStatus::Resolved));
        println!();
    }

    if verbose && !rows.is_empty() {
        println!(" {} All packages:\n", "[INFO]".green().bold());
        render_table(rows.iter());
        println!();
    }
}

fn render_table<'a>(rows: impl Iterator<Item = &'a PackageRow<'a>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("Licenses").add_attribute(Attribute::Bold),
            Cell::new("Chunks").add_attribute(Attribute::Bold),
        ]);

    for row in rows {
        let licenses = if row.licenses.is_empty() {
            "none".to_string()
        } else {
            row.licenses
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let color = match row.status() {
            LicenseStatus::Resolved => Color::Green,
            LicenseStatus::Unmapped => Color::Yellow,
            LicenseStatus::Missing => Color::Red,
        };
        table.add_row(vec![
            Cell::new(row.name),
            Cell::new(row.version),
            Cell::new(licenses).fg(color),
            Cell::new(row.chunks).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", table);
}

/// The three most common license names, e.g. `[MIT (12), ISC (4)]`.
fn top_licenses(rows: &[PackageRow<'_>]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in rows.iter().flat_map(|r| r.licenses) {
        *counts.entry(label.name.as_str()).or_insert(0) += 1;
    }

    let mut pairs: Vec<(&str, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(lic, cnt)| format!("{} ({})", lic, cnt))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}
