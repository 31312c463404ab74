use anyhow::Result;
use npzpack::{catalog, pack, preview};
use std::{fs, path::Path};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) pack each table directory into its archive ───────────────
    let base = Path::new(catalog::BASE_FOLDER);
    fs::create_dir_all(base)?;
    pack::pack_all(base, catalog::TABLE_NAMES, &pack::PackOptions::default())?;

    // ─── 3) preview each archive ─────────────────────────────────────
    preview::preview_all(base, catalog::TABLE_NAMES);

    info!("all done");
    Ok(())
}
