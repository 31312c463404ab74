// src/preview/mod.rs

use anyhow::{bail, Context, Result};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use zip::ZipArchive;

use crate::catalog;
use crate::column::ColumnData;

/// How many rows of each table view are printed.
pub const PREVIEW_ROWS: usize = 5;

const SEPARATOR_WIDTH: usize = 50;

/// Preview every table's archive under `base`, in catalog order.
///
/// Purely observational: each archive is loaded, rendered to stdout, and
/// dropped. A missing or undecodable archive is reported and skipped.
pub fn preview_all(base: &Path, tables: &[&str]) {
    for table in tables {
        let name = catalog::archive_name(table);
        let path = catalog::archive_path(base, table);
        if !path.exists() {
            println!("File not found: {}", path.display());
            continue;
        }
        match preview_archive(&path) {
            Ok(block) => println!("{}", block),
            Err(e) => {
                error!(archive = %name, "preview failed: {:#}", e);
                println!("Error loading {}: {:#}", name, e);
            }
        }
    }
}

/// Load one `.npz` archive and render its preview block.
#[tracing::instrument(level = "info", skip(path), fields(archive = %path.display()))]
pub fn preview_archive(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let columns = read_archive(path)?;
    let view = build_view(&columns)?;
    info!(rows = view.num_rows(), columns = view.num_columns(), "loaded");
    render_preview(&name, &view)
}

/// Read every `<key>.npy` member of the archive, in member order.
pub fn read_archive(path: &Path) -> Result<Vec<(String, ColumnData)>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("reading {}", path.display()))?;

    let mut columns = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let member = entry.name().to_string();
        if !entry.is_file() || !member.ends_with(".npy") {
            continue;
        }
        let key = member
            .strip_suffix(".npy")
            .unwrap_or(&member)
            .to_string();
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        let column = ColumnData::from_npy_bytes(&bytes)
            .with_context(|| format!("decoding member {}", member))?;
        columns.push((key, column));
    }
    Ok(columns)
}

/// Zip the keyed columns into an aligned table view. Mismatched column
/// lengths surface here as a construction error.
pub fn build_view(columns: &[(String, ColumnData)]) -> Result<RecordBatch> {
    if columns.is_empty() {
        bail!("archive contains no array members");
    }
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, col)| Field::new(name.as_str(), col.data_type(), false))
        .collect();
    let arrays = columns.iter().map(|(_, col)| col.to_arrow()).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building table view")
}

/// Render the preview block: header, head rows, per-column types, separator.
pub fn render_preview(name: &str, view: &RecordBatch) -> Result<String> {
    let head = view.slice(0, view.num_rows().min(PREVIEW_ROWS));
    let table = pretty_format_batches(&[head]).context("formatting table view")?;

    let mut out = String::new();
    writeln!(out)?;
    writeln!(out, "--- NPZ File: {} ---", name)?;
    writeln!(out, "{}", table)?;
    writeln!(out)?;
    writeln!(out, "Data Types:")?;
    let schema = view.schema();
    for field in schema.fields() {
        writeln!(out, "{}: {:?}", field.name(), field.data_type())?;
    }
    write!(out, "{}", "=".repeat(SEPARATOR_WIDTH))?;
    Ok(out)
}
