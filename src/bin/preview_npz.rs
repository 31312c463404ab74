use anyhow::Result;
use npzpack::{catalog, preview};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_subscriber::{fmt, EnvFilter};

/// Preview the given `.npz` archives, or the fixed table catalog when no
/// paths are passed.
fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        preview::preview_all(Path::new(catalog::BASE_FOLDER), catalog::TABLE_NAMES);
        return Ok(());
    }

    for arg in args {
        let path = PathBuf::from(&arg);
        if !path.exists() {
            println!("File not found: {}", path.display());
            continue;
        }
        match preview::preview_archive(&path) {
            Ok(block) => println!("{}", block),
            Err(e) => println!("Error loading {}: {:#}", arg, e),
        }
    }
    Ok(())
}
