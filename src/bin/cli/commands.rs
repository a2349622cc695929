//! Command implementations for the CLI.

use std::error::Error as _;
use std::io::Write;
use std::path::Path;

use pyiarchive::crypto::EnvKey;
use pyiarchive::read::{CArchive, CArchiveOptions, CEntryKind, PyzOptions};
use pyiarchive::{Error, PyzArchive};

use super::OutputFormat;
use super::exit_codes::{ExitCode, error_to_exit_code};
use super::output::{ArchiveSummary, ListRow, PyzSummary, create_formatter};

/// Builds reader options from the global flags.
pub fn reader_options(key_env: Option<&str>) -> CArchiveOptions {
    let pyz = match key_env {
        Some(var) => PyzOptions::new().key_provider(EnvKey::new(var)),
        None => PyzOptions::new(),
    };
    CArchiveOptions::new().pyz(pyz)
}

/// Prints an error and maps it to an exit code.
///
/// A vanished archive gets its own message, since nothing else can be read
/// after that point.
fn report(context: &str, error: &Error) -> ExitCode {
    if error.is_fatal() {
        eprintln!("Fatal: {}", error);
    } else {
        eprintln!("{}: {}", context, error);
        let mut source = error.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
    }
    error_to_exit_code(error)
}

/// Helper to open an archive
fn open_archive(path: &Path, options: &CArchiveOptions) -> Result<CArchive, ExitCode> {
    CArchive::open_with_options(path, options.clone())
        .map_err(|e| report("Error opening archive", &e))
}

fn open_pyz(archive: &CArchive, name: &str) -> Result<PyzArchive, ExitCode> {
    archive
        .open_embedded_archive(name)
        .map_err(|e| report(&format!("Error opening embedded archive '{}'", name), &e))
}

/// List command implementation
pub fn list(
    archive_path: &Path,
    recursive: bool,
    options: &CArchiveOptions,
    format: OutputFormat,
) -> ExitCode {
    let formatter = create_formatter(format);

    let archive = match open_archive(archive_path, options) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut rows = Vec::with_capacity(archive.len());
    for entry in archive.entries() {
        rows.push(ListRow {
            name: entry.name.clone(),
            kind: entry.kind.to_string(),
            packed: Some(u64::from(entry.compressed_length)),
            size: Some(u64::from(entry.uncompressed_length)),
            container: None,
        });

        if recursive && entry.kind == CEntryKind::EmbeddedArchive {
            let pyz = match open_pyz(&archive, &entry.name) {
                Ok(p) => p,
                Err(code) => return code,
            };
            rows.extend(pyz.entries().iter().map(|e| ListRow {
                name: e.name.clone(),
                kind: e.kind.to_string(),
                packed: Some(e.data_length.max(0) as u64),
                size: None,
                container: Some(entry.name.clone()),
            }));
        }
    }

    print!("{}", formatter.format_list(&rows));

    ExitCode::Success
}

/// Info command implementation
pub fn info(archive_path: &Path, options: &CArchiveOptions, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let archive = match open_archive(archive_path, options) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut pyz_archives = Vec::new();
    for entry in archive.entries() {
        if entry.kind != CEntryKind::EmbeddedArchive {
            continue;
        }
        let pyz = match open_pyz(&archive, &entry.name) {
            Ok(p) => p,
            Err(code) => return code,
        };
        pyz_archives.push(PyzSummary {
            name: entry.name.clone(),
            entry_count: pyz.len(),
            pymagic: pyz.pymagic(),
            encrypted: pyz.is_encrypted(),
        });
    }

    let summary = ArchiveSummary {
        path: archive.path().to_path_buf(),
        start_offset: archive.start_offset(),
        cookie_offset: archive.cookie_offset(),
        archive_length: archive.archive_length(),
        toc_offset: archive.toc_offset(),
        toc_length: archive.toc_length(),
        python_version: archive.python_version(),
        python_library: archive.python_library_name().to_string(),
        entry_count: archive.len(),
        onefile: archive.contains_extractable_entries(),
        runtime_options: archive
            .runtime_options()
            .into_iter()
            .map(str::to_string)
            .collect(),
        pyz_archives,
    };

    print!("{}", formatter.format_info(&summary));

    ExitCode::Success
}

/// Extract command implementation
///
/// `name` is either a CArchive entry or `PYZ:MODULE`. The PYZ form is only
/// used when the part before the colon names an embedded PYZ archive, so
/// entry names that contain a colon still work.
pub fn extract(
    archive_path: &Path,
    name: &str,
    output: Option<&Path>,
    options: &CArchiveOptions,
) -> ExitCode {
    let archive = match open_archive(archive_path, options) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let pyz_target = name.split_once(':').filter(|(container, _)| {
        archive
            .lookup(container)
            .is_some_and(|e| e.kind == CEntryKind::EmbeddedArchive)
    });

    let data = match pyz_target {
        Some((container, module)) => {
            let pyz = match open_pyz(&archive, container) {
                Ok(p) => p,
                Err(code) => return code,
            };
            match pyz.extract_raw(module) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    eprintln!("Error: no entry named '{}' in '{}'", module, container);
                    return ExitCode::NotFound;
                }
                Err(e) => return report(&format!("Error extracting '{}'", name), &e),
            }
        }
        None => {
            if let Some(path) = output {
                return match archive.extract_to_path(name, path) {
                    Ok(()) => ExitCode::Success,
                    Err(e) => report(&format!("Error extracting '{}'", name), &e),
                };
            }
            match archive.extract(name) {
                Ok(data) => data,
                Err(e) => return report(&format!("Error extracting '{}'", name), &e),
            }
        }
    };

    let result = match output {
        Some(path) => std::fs::write(path, &data),
        None => std::io::stdout().lock().write_all(&data),
    };
    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => report("Error writing output", &Error::Io(e)),
    }
}

/// Extract-all command implementation
pub fn extract_all(
    archive_path: &Path,
    output_dir: &Path,
    options: &CArchiveOptions,
    format: OutputFormat,
) -> ExitCode {
    let formatter = create_formatter(format);

    let archive = match open_archive(archive_path, options) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        return report("Error creating output directory", &Error::Io(e));
    }

    match archive.extract_all(output_dir) {
        Ok(written) => {
            print!("{}", formatter.format_extract_all(&written));
            ExitCode::Success
        }
        Err(e) => report("Error extracting archive", &e),
    }
}
