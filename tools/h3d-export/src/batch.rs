//! Single-file and directory conversion
//!
//! An input is either one document or a directory that is searched
//! recursively for `*.json` documents. Each document keeps its directory
//! relative to the input root as asset path, so the output tree mirrors the
//! input tree. Documents convert in parallel; a failing document is
//! reported and the rest of the batch continues.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::convert::{convert_animation, convert_model, ConvertOptions};
use crate::export::{export_animation, export_model};
use crate::scene_graph::AssetNames;
use crate::source::SourceDocument;

/// Extension of source document dumps
pub const DOCUMENT_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Animation,
}

/// How every document of a batch is converted
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    pub kind: AssetKind,
    pub options: ConvertOptions,
    /// Prefix material files with `<asset name>_`
    pub add_model_name: bool,
}

/// A document found in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    pub file: PathBuf,
    /// Directory relative to the input root, empty or ending in `/`
    pub asset_path: String,
    pub name: String,
}

impl SourceAsset {
    fn new(file: PathBuf, asset_path: String) -> Self {
        let name = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file,
            asset_path,
            name,
        }
    }
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Documents under `input`, sorted by path
pub fn collect_assets(input: &Path) -> Result<Vec<SourceAsset>> {
    if input.is_file() {
        return Ok(vec![SourceAsset::new(input.to_path_buf(), String::new())]);
    }
    if !input.is_dir() {
        anyhow::bail!("Input not found: {:?}", input);
    }

    let mut assets = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {:?}", input))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION)
        {
            continue;
        }
        let relative = path
            .parent()
            .and_then(|dir| dir.strip_prefix(input).ok())
            .map(|dir| dir.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let asset_path = if relative.is_empty() {
            relative
        } else {
            format!("{}/", relative)
        };
        assets.push(SourceAsset::new(path.to_path_buf(), asset_path));
    }
    assets.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(assets)
}

/// Convert every document under `input` into `out_dir`
pub fn run_batch(input: &Path, out_dir: &Path, settings: &BatchSettings) -> Result<BatchSummary> {
    let assets = collect_assets(input)?;
    let kind = match settings.kind {
        AssetKind::Model => "MODELS",
        AssetKind::Animation => "ANIMATIONS",
    };
    tracing::info!("Processing {} - Path: {:?} ({} documents)", kind, input, assets.len());

    let results: Vec<(PathBuf, Result<bool>)> = assets
        .par_iter()
        .map(|asset| (asset.file.clone(), convert_asset(asset, out_dir, settings)))
        .collect();

    let mut summary = BatchSummary::default();
    for (file, result) in results {
        match result {
            Ok(true) => summary.converted += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                tracing::error!("{:#}", e);
                summary.failed.push(file);
            }
        }
    }

    tracing::info!(
        "Converted {} documents, skipped {}, failed {}",
        summary.converted,
        summary.skipped,
        summary.failed.len()
    );
    Ok(summary)
}

/// Convert one document. Returns `false` when there was nothing to write.
pub fn convert_asset(asset: &SourceAsset, out_dir: &Path, settings: &BatchSettings) -> Result<bool> {
    tracing::info!("Parsing document {:?}...", asset.file);
    let doc = SourceDocument::load(&asset.file)?;
    let names = AssetNames {
        path: &asset.asset_path,
        name: &asset.name,
    };

    match settings.kind {
        AssetKind::Model => {
            tracing::info!("Compiling model data...");
            let mut options = settings.options.clone();
            if settings.add_model_name {
                options.material_prefix = format!("{}_", asset.name);
            }
            let model = convert_model(&doc, &options)
                .with_context(|| format!("Failed to convert {:?}", asset.file))?;
            let report = export_model(&doc, &model, out_dir, names, &options)
                .with_context(|| format!("Failed to export {:?}", asset.file))?;
            tracing::info!(
                "{}: {} vertices, {} indices, {} files, {} warnings",
                asset.name,
                model.geometry.vertex_count(),
                model.geometry.index_count(),
                report.written.len(),
                model.diagnostics.warnings().count()
            );
            Ok(true)
        }
        AssetKind::Animation => {
            tracing::info!("Compiling animation data...");
            let Some(animation) = convert_animation(&doc) else {
                tracing::info!("Skipping file (does not contain animation data)");
                return Ok(false);
            };
            let path = export_animation(&animation, out_dir, names)
                .with_context(|| format!("Failed to export {:?}", asset.file))?;
            tracing::info!("{}: {} frames -> {:?}", asset.name, animation.frame_count, path);
            Ok(true)
        }
    }
}
