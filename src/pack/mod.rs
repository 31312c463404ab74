// src/pack/mod.rs

use anyhow::{Context, Result};
use glob::glob;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use zip::write::FileOptions;
use zip::CompressionMethod;

use crate::catalog;
use crate::column::ColumnData;

/// Packing policy. `delete_sources` removes a table's `.npy` directory after
/// its archive is written; it defaults to off and is left to the operator.
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    pub delete_sources: bool,
}

/// What happened to a single table. Outcomes other than `Packed` are
/// skip-with-report; they never abort the run.
#[derive(Debug, PartialEq)]
pub enum PackOutcome {
    Packed { path: PathBuf, columns: usize },
    MissingFolder,
    NoColumnFiles,
    NothingLoaded,
}

/// Pack every table in `tables`, printing one report line per outcome.
/// Per-table skips and per-file load failures are non-fatal; only errors
/// outside the guarded sections (e.g. an unwritable base folder) propagate.
pub fn pack_all(base: &Path, tables: &[&str], options: &PackOptions) -> Result<()> {
    let start = Instant::now();
    for table in tables {
        match pack_table(base, table, options)? {
            PackOutcome::Packed { path, columns } => {
                info!(table = %table, columns, "packed");
                println!("Created NPZ file: {}", path.display());
            }
            PackOutcome::MissingFolder => {
                println!("Folder not found for table: {}", table);
            }
            PackOutcome::NoColumnFiles => {
                println!("No .npy files found for table: {}", table);
            }
            PackOutcome::NothingLoaded => {
                println!("No data to save for table: {}", table);
            }
        }
    }
    info!("packed {} tables in {:?}", tables.len(), start.elapsed());
    Ok(())
}

/// Pack one table directory into `<base>/<table>.npz`.
///
/// Column names come from the file stems. A column file that fails to decode
/// is reported and excluded; the archive is still written from whichever
/// columns loaded. An existing archive of the same name is overwritten.
#[tracing::instrument(level = "info", skip(base, options), fields(table = %table))]
pub fn pack_table(base: &Path, table: &str, options: &PackOptions) -> Result<PackOutcome> {
    let table_dir = catalog::table_dir(base, table);
    if !table_dir.is_dir() {
        return Ok(PackOutcome::MissingFolder);
    }

    let pattern = format!("{}/*.npy", table_dir.display());
    let files: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("bad glob pattern {}", pattern))?
        .filter_map(|e| e.ok())
        .collect();
    if files.is_empty() {
        return Ok(PackOutcome::NoColumnFiles);
    }

    let mut columns: Vec<(String, ColumnData)> = Vec::with_capacity(files.len());
    for path in &files {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => {
                println!("Error loading {}: file name is not valid UTF-8", name);
                continue;
            }
        };
        match load_column(path) {
            Ok(col) => columns.push((stem, col)),
            Err(e) => {
                error!(file = %name, "column load failed: {:#}", e);
                println!("Error loading {}: {:#}", name, e);
            }
        }
    }
    if columns.is_empty() {
        return Ok(PackOutcome::NothingLoaded);
    }

    let archive = catalog::archive_path(base, table);
    write_npz(&archive, &columns)
        .with_context(|| format!("writing archive {}", archive.display()))?;

    if options.delete_sources {
        fs::remove_dir_all(&table_dir)
            .with_context(|| format!("removing source directory {}", table_dir.display()))?;
        info!(dir = %table_dir.display(), "deleted source directory");
    }

    Ok(PackOutcome::Packed {
        path: archive,
        columns: columns.len(),
    })
}

fn load_column(path: &Path) -> Result<ColumnData> {
    let bytes =
        fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    ColumnData::from_npy_bytes(&bytes)
}

/// Write `columns` as a keyed `.npz` archive: one STORED `<name>.npy` member
/// per column, with a fixed timestamp so unchanged input packs to identical
/// bytes.
pub fn write_npz(path: &Path, columns: &[(String, ColumnData)]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options: FileOptions<'_, ()> = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(zip::DateTime::default());

    for (name, column) in columns {
        let bytes = column
            .to_npy_bytes()
            .with_context(|| format!("encoding column {}", name))?;
        zip.start_file(format!("{}.npy", name), options.clone())?;
        zip.write_all(&bytes)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Read;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    use zip::ZipArchive;

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,npzpack::pack=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn write_column(dir: &Path, name: &str, column: &ColumnData) -> Result<()> {
        fs::write(dir.join(name), column.to_npy_bytes()?)?;
        Ok(())
    }

    fn archive_keys(path: &Path) -> Result<Vec<String>> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let mut keys = Vec::new();
        for i in 0..archive.len() {
            keys.push(archive.by_index(i)?.name().to_string());
        }
        Ok(keys)
    }

    #[test]
    fn packs_all_columns_of_a_table() -> Result<()> {
        init_test_logging();
        let base = tempdir()?;
        let users = base.path().join("users");
        fs::create_dir(&users)?;
        write_column(&users, "id.npy", &ColumnData::Int64(vec![1, 2, 3]))?;
        write_column(
            &users,
            "name.npy",
            &ColumnData::Utf8(vec!["a".into(), "b".into(), "c".into()]),
        )?;

        let outcome = pack_table(base.path(), "users", &PackOptions::default())?;
        let archive = base.path().join("users.npz");
        assert_eq!(
            outcome,
            PackOutcome::Packed {
                path: archive.clone(),
                columns: 2
            }
        );

        let mut keys = archive_keys(&archive)?;
        keys.sort();
        assert_eq!(keys, vec!["id.npy", "name.npy"]);
        Ok(())
    }

    #[test]
    fn missing_folder_and_empty_folder_are_skips() -> Result<()> {
        let base = tempdir()?;
        assert_eq!(
            pack_table(base.path(), "schemas", &PackOptions::default())?,
            PackOutcome::MissingFolder
        );
        assert!(!base.path().join("schemas.npz").exists());

        fs::create_dir(base.path().join("triggers"))?;
        assert_eq!(
            pack_table(base.path(), "triggers", &PackOptions::default())?,
            PackOutcome::NoColumnFiles
        );
        assert!(!base.path().join("triggers.npz").exists());
        Ok(())
    }

    #[test]
    fn corrupt_column_is_excluded_but_table_still_packs() -> Result<()> {
        let base = tempdir()?;
        let tools = base.path().join("tools");
        fs::create_dir(&tools)?;
        write_column(&tools, "id.npy", &ColumnData::Int64(vec![10, 20]))?;
        fs::write(tools.join("broken.npy"), b"not an npy payload")?;

        let outcome = pack_table(base.path(), "tools", &PackOptions::default())?;
        let archive = base.path().join("tools.npz");
        assert_eq!(
            outcome,
            PackOutcome::Packed {
                path: archive.clone(),
                columns: 1
            }
        );
        assert_eq!(archive_keys(&archive)?, vec!["id.npy"]);
        Ok(())
    }

    #[test]
    fn all_columns_corrupt_means_nothing_to_save() -> Result<()> {
        let base = tempdir()?;
        let memory = base.path().join("memory");
        fs::create_dir(&memory)?;
        fs::write(memory.join("a.npy"), b"junk")?;
        fs::write(memory.join("b.npy"), b"more junk")?;

        assert_eq!(
            pack_table(base.path(), "memory", &PackOptions::default())?,
            PackOutcome::NothingLoaded
        );
        assert!(!base.path().join("memory.npz").exists());
        Ok(())
    }

    #[test]
    fn packing_twice_is_byte_identical() -> Result<()> {
        let base = tempdir()?;
        let users = base.path().join("users");
        fs::create_dir(&users)?;
        write_column(&users, "id.npy", &ColumnData::Int64(vec![1, 2, 3]))?;
        write_column(
            &users,
            "name.npy",
            &ColumnData::Utf8(vec!["x".into(), "yy".into(), "zzz".into()]),
        )?;

        pack_table(base.path(), "users", &PackOptions::default())?;
        let first = fs::read(base.path().join("users.npz"))?;
        pack_table(base.path(), "users", &PackOptions::default())?;
        let second = fs::read(base.path().join("users.npz"))?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn delete_sources_removes_the_table_directory() -> Result<()> {
        let base = tempdir()?;
        let sagas = base.path().join("sagas");
        fs::create_dir(&sagas)?;
        write_column(&sagas, "id.npy", &ColumnData::Int64(vec![1]))?;

        let options = PackOptions {
            delete_sources: true,
        };
        pack_table(base.path(), "sagas", &options)?;
        assert!(base.path().join("sagas.npz").exists());
        assert!(!sagas.exists());
        Ok(())
    }

    #[test]
    fn archive_members_round_trip_through_the_codec() -> Result<()> {
        let base = tempdir()?;
        let agents = base.path().join("agents");
        fs::create_dir(&agents)?;
        let scores = ColumnData::Float64(vec![0.25, 0.5]);
        write_column(&agents, "score.npy", &scores)?;

        pack_table(base.path(), "agents", &PackOptions::default())?;

        let mut archive = ZipArchive::new(File::open(base.path().join("agents.npz"))?)?;
        let mut entry = archive.by_index(0)?;
        assert_eq!(entry.name(), "score.npy");
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        assert_eq!(ColumnData::from_npy_bytes(&bytes)?, scores);
        Ok(())
    }
}
