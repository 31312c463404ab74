use anyhow::Result;
use npzpack::{catalog, pack};
use std::{fs, path::Path};
use tracing_subscriber::{fmt, EnvFilter};

/// Run only the packing stage over the fixed table catalog.
fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let base = Path::new(catalog::BASE_FOLDER);
    fs::create_dir_all(base)?;
    pack::pack_all(base, catalog::TABLE_NAMES, &pack::PackOptions::default())
}
