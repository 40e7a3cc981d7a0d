//! Render command implementation

use std::path::Path;

use anyhow::{bail, Result};

use routeatlas_render::{LayerStyle, MapDocument, MapOptions};
use routeatlas_store::FeatureQuery;

use crate::cli::{RenderArgs, StorageBackend};
use crate::output::OutputWriter;
use crate::output_types::RenderOutput;
use crate::storage::Storage;

pub async fn execute(
    args: RenderArgs,
    backend: &StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let storage = Storage::connect(backend, config.database_url.value.as_deref()).await?;

    let mut query =
        FeatureQuery::new().with_limit(args.limit.unwrap_or(config.render_limit.value));
    if let Some(dataset) = &args.dataset {
        query = query.in_dataset(dataset.clone());
    }
    for pair in &args.filter {
        let (key, value) = parse_filter(pair)?;
        query = query.with_equals(key, value);
    }

    let features = storage.store.query(&query).await?;
    if features.is_empty() {
        output.warning("No features matched; the map will be empty");
    }

    let style = LayerStyle::default().with_category_property(config.category_property.value.clone());
    let mut options = MapOptions::default();
    if let Some(title) = &args.title {
        options = options.with_title(title.clone());
    }

    let document = MapDocument::build(&features, &style, &options);
    document.write_to(&args.output)?;

    if output.is_json() {
        output.result(RenderOutput {
            output: args.output.display().to_string(),
            feature_count: features.len(),
        })?;
    } else {
        output.success(format!(
            "Rendered {} features to {}",
            features.len(),
            args.output.display()
        ));
    }

    Ok(())
}

/// Split a `key=value` filter argument
fn parse_filter(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Invalid filter '{}'. Expected key=value", pair),
    }
}
