//! Output formatting for CLI operations.

use std::path::PathBuf;

use serde_json::json;

/// One line of a listing.
pub struct ListRow {
    /// Entry name.
    pub name: String,
    /// Entry kind.
    pub kind: String,
    /// Stored size, when known without reading the entry.
    pub packed: Option<u64>,
    /// Uncompressed size, when known without reading the entry.
    pub size: Option<u64>,
    /// Name of the embedded PYZ archive holding the entry.
    pub container: Option<String>,
}

/// Summary shown by the `info` command.
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub start_offset: u64,
    pub cookie_offset: u64,
    pub archive_length: u32,
    pub toc_offset: u32,
    pub toc_length: u32,
    pub python_version: (u32, u32),
    pub python_library: String,
    pub entry_count: usize,
    pub onefile: bool,
    pub runtime_options: Vec<String>,
    pub pyz_archives: Vec<PyzSummary>,
}

/// Summary of one embedded PYZ archive.
pub struct PyzSummary {
    pub name: String,
    pub entry_count: usize,
    pub pymagic: [u8; 4],
    pub encrypted: bool,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats a listing
    fn format_list(&self, rows: &[ListRow]) -> String;

    /// Formats archive information
    fn format_info(&self, info: &ArchiveSummary) -> String;

    /// Formats the files written by `extract-all`
    fn format_extract_all(&self, written: &[PathBuf]) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_list(&self, rows: &[ListRow]) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{:>12} {:>12} {:<10} {}\n",
            "Size", "Packed", "Type", "Name"
        ));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        let mut total_size: u64 = 0;
        for row in rows {
            total_size += row.size.unwrap_or(0);
            let name = match &row.container {
                Some(container) => format!("{}:{}", container, row.name),
                None => row.name.clone(),
            };
            output.push_str(&format!(
                "{:>12} {:>12} {:<10} {}\n",
                row.size.map(humanize_bytes).unwrap_or_else(|| "-".to_string()),
                row.packed.map(humanize_bytes).unwrap_or_else(|| "-".to_string()),
                row.kind,
                name
            ));
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} entries, {} total\n",
            rows.len(),
            humanize_bytes(total_size)
        ));

        output
    }

    fn format_info(&self, info: &ArchiveSummary) -> String {
        let mut output = String::new();

        output.push_str("Archive Information:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  File:           {}\n", info.path.display()));
        output.push_str(&format!(
            "  Python:         {}.{} ({})\n",
            info.python_version.0, info.python_version.1, info.python_library
        ));
        output.push_str(&format!("  Start offset:   {}\n", info.start_offset));
        output.push_str(&format!("  Cookie offset:  {}\n", info.cookie_offset));
        output.push_str(&format!(
            "  Archive size:   {}\n",
            humanize_bytes(u64::from(info.archive_length))
        ));
        output.push_str(&format!(
            "  Directory:      {} bytes at {}\n",
            info.toc_length, info.toc_offset
        ));
        output.push_str(&format!("  Entries:        {}\n", info.entry_count));
        output.push_str(&format!(
            "  Mode:           {}\n",
            if info.onefile { "onefile" } else { "onedir" }
        ));

        if !info.runtime_options.is_empty() {
            output.push_str("  Options:\n");
            for option in &info.runtime_options {
                output.push_str(&format!("    {}\n", option));
            }
        }

        for pyz in &info.pyz_archives {
            output.push_str(&format!(
                "  PYZ {}: {} entries, magic {}{}\n",
                pyz.name,
                pyz.entry_count,
                hex(&pyz.pymagic),
                if pyz.encrypted { ", encrypted" } else { "" }
            ));
        }

        output
    }

    fn format_extract_all(&self, written: &[PathBuf]) -> String {
        format!("Extracted {} entries\n", written.len())
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_list(&self, rows: &[ListRow]) -> String {
        let items: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "type": r.kind,
                    "size": r.size,
                    "packed_size": r.packed,
                    "container": r.container,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_info(&self, info: &ArchiveSummary) -> String {
        let obj = json!({
            "path": info.path.display().to_string(),
            "python_version": format!("{}.{}", info.python_version.0, info.python_version.1),
            "python_library": info.python_library,
            "start_offset": info.start_offset,
            "cookie_offset": info.cookie_offset,
            "archive_length": info.archive_length,
            "toc_offset": info.toc_offset,
            "toc_length": info.toc_length,
            "entry_count": info.entry_count,
            "onefile": info.onefile,
            "runtime_options": info.runtime_options,
            "pyz_archives": info.pyz_archives.iter().map(|p| json!({
                "name": p.name,
                "entry_count": p.entry_count,
                "pymagic": hex(&p.pymagic),
                "encrypted": p.encrypted,
            })).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_extract_all(&self, written: &[PathBuf]) -> String {
        let obj = json!({
            "entries_extracted": written.len(),
            "paths": written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates a formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Formats bytes as a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
