use gramstat_core::GramstatConfig;
use gramstat_store::UsageStore;
use tracing::info;

pub fn run(config: &GramstatConfig) -> anyhow::Result<()> {
    let path = &config.database.path;
    let mut store = UsageStore::open(path)?;
    let added = store.seed_rsl_attributes(&config.ingest.standard_rsl_attributes)?;
    info!(path = %path.display(), seeded = added, "usage store ready");
    println!("✓ Initialized {}", path.display());
    Ok(())
}
