//! assets.toml manifest
//!
//! ```toml
//! [output]
//! dir = "build/assets"
//!
//! [options]
//! optimize = true
//! overwrite_materials = false
//! add_model_name = true
//! lod_distances = [10.0, 20.0, 40.0, 80.0]
//!
//! [[models]]
//! path = "models"          # a document or a directory of documents
//!
//! [[animations]]
//! path = "anims/walk.json"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::batch::{run_batch, AssetKind, BatchSettings, BatchSummary};
use crate::convert::ConvertOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsManifest {
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub options: OptionsSection,
    #[serde(default)]
    pub models: Vec<AssetEntry>,
    #[serde(default)]
    pub animations: Vec<AssetEntry>,
    /// Directory of the manifest file
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assets")
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionsSection {
    #[serde(default = "default_true")]
    pub optimize: bool,
    #[serde(default)]
    pub overwrite_materials: bool,
    #[serde(default)]
    pub add_model_name: bool,
    #[serde(default = "default_lod_distances")]
    pub lod_distances: [f32; 4],
}

impl Default for OptionsSection {
    fn default() -> Self {
        Self {
            optimize: true,
            overwrite_materials: false,
            add_model_name: false,
            lod_distances: default_lod_distances(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_lod_distances() -> [f32; 4] {
    ConvertOptions::default().lod_distances
}

impl OptionsSection {
    pub fn batch_settings(&self, kind: AssetKind) -> BatchSettings {
        BatchSettings {
            kind,
            options: ConvertOptions {
                optimize: self.optimize && kind == AssetKind::Model,
                lod_distances: self.lod_distances,
                overwrite_materials: self.overwrite_materials,
                material_prefix: String::new(),
            },
            add_model_name: self.add_model_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetEntry {
    pub path: PathBuf,
}

/// Load and parse a manifest
pub fn load_manifest(path: &Path) -> Result<AssetsManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest: AssetsManifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(manifest)
}

impl AssetsManifest {
    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    fn entries(&self) -> impl Iterator<Item = (AssetKind, &AssetEntry)> {
        self.models
            .iter()
            .map(|e| (AssetKind::Model, e))
            .chain(self.animations.iter().map(|e| (AssetKind::Animation, e)))
    }
}

/// Check that every entry exists and the LOD distances are usable
pub fn validate(manifest: &AssetsManifest) -> Result<()> {
    let distances = manifest.options.lod_distances;
    if distances.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        anyhow::bail!("LOD distances must be positive: {:?}", distances);
    }
    if distances.windows(2).any(|w| w[0] >= w[1]) {
        anyhow::bail!("LOD distances must be ascending: {:?}", distances);
    }

    for (kind, entry) in manifest.entries() {
        let path = manifest.resolve(&entry.path);
        if !path.exists() {
            anyhow::bail!("{:?} entry not found: {:?}", kind, path);
        }
    }
    Ok(())
}

/// Convert every entry of the manifest.
///
/// All entries are attempted; the call fails afterwards if any document
/// failed.
pub fn build_all(manifest: &AssetsManifest, output_override: Option<&Path>) -> Result<()> {
    validate(manifest)?;
    let out_dir = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest.resolve(&manifest.output.dir));

    let mut total = BatchSummary::default();
    for (kind, entry) in manifest.entries() {
        let input = manifest.resolve(&entry.path);
        let settings = manifest.options.batch_settings(kind);
        let summary = run_batch(&input, &out_dir, &settings)?;
        total.converted += summary.converted;
        total.skipped += summary.skipped;
        total.failed.extend(summary.failed);
    }

    if !total.is_success() {
        anyhow::bail!(
            "{} of {} documents failed: {:?}",
            total.failed.len(),
            total.converted + total.skipped + total.failed.len(),
            total.failed
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("assets.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = load_manifest(&write_manifest(dir.path(), "")).unwrap();
        assert_eq!(manifest.output.dir, PathBuf::from("assets"));
        assert!(manifest.options.optimize);
        assert!(!manifest.options.overwrite_materials);
        assert_eq!(manifest.options.lod_distances, [10.0, 20.0, 40.0, 80.0]);
        assert_eq!(manifest.base_dir, dir.path());
    }

    #[test]
    fn test_full_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("man.json"), "{}").unwrap();
        let manifest = load_manifest(&write_manifest(
            dir.path(),
            r#"
            [output]
            dir = "out"

            [options]
            optimize = false
            add_model_name = true
            lod_distances = [5.0, 15.0, 30.0, 60.0]

            [[models]]
            path = "man.json"

            [[animations]]
            path = "man.json"
            "#,
        ))
        .unwrap();
        assert_eq!(manifest.models.len(), 1);
        assert_eq!(manifest.animations.len(), 1);
        validate(&manifest).unwrap();

        let settings = manifest.options.batch_settings(AssetKind::Model);
        assert!(!settings.options.optimize);
        assert!(settings.add_model_name);
        assert_eq!(settings.options.lod_distances[0], 5.0);
    }

    #[test]
    fn test_validate_rejects_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_manifest(&write_manifest(
            dir.path(),
            "[[models]]\npath = \"nowhere.json\"\n",
        ))
        .unwrap();
        assert!(validate(&missing).is_err());

        let unordered = load_manifest(&write_manifest(
            dir.path(),
            "[options]\nlod_distances = [10.0, 5.0, 40.0, 80.0]\n",
        ))
        .unwrap();
        assert!(validate(&unordered).is_err());
    }

    #[test]
    fn test_build_all_writes_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("box.json"), "{}").unwrap();
        let manifest = load_manifest(&write_manifest(
            dir.path(),
            "[output]\ndir = \"out\"\n\n[[models]]\npath = \"box.json\"\n",
        ))
        .unwrap();
        build_all(&manifest, None).unwrap();
        assert!(dir.path().join("out/box.geo").exists());
        assert!(dir.path().join("out/box.scene.xml").exists());
    }
}
