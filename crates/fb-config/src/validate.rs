use crate::batcher::BatcherConfig;

/// Internal validation, called during `BatcherConfig::from_str` / `load` and
/// again after CLI overrides.
pub(crate) fn validate(config: &BatcherConfig) -> anyhow::Result<()> {
    if config.runner.program.trim().is_empty() {
        anyhow::bail!("runner.program must not be empty");
    }

    // scratch_suffix is appended to the template file name; it must keep the
    // scratch file distinct from the template and in the same directory.
    let suffix = &config.batch.scratch_suffix;
    if suffix.is_empty() {
        anyhow::bail!("batch.scratch_suffix must not be empty");
    }
    if suffix.contains('/') || suffix.contains('\\') {
        anyhow::bail!("batch.scratch_suffix must not contain a path separator, got {suffix:?}");
    }

    if config.batch.template == config.batch.table {
        anyhow::bail!(
            "batch.template and batch.table point at the same file: {}",
            config.batch.template.display()
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
