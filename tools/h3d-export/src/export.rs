//! Writing converted assets to an output directory

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::convert::{ConvertOptions, ConvertedAnimation, ConvertedModel};
use crate::error::ConvertError;
use crate::formats::{write_animation, write_geometry};
use crate::material::{material_file_name, write_material};
use crate::scene_graph::{write_scene_graph, AssetNames};
use crate::source::SourceDocument;

/// Files touched by an export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// Material files left alone because they already existed
    pub skipped: Vec<PathBuf>,
}

/// Write `.geo`, `.scene.xml` and the used materials of a model.
///
/// Everything lands in `out_dir/<asset.path>`.
pub fn export_model(
    doc: &SourceDocument,
    model: &ConvertedModel,
    out_dir: &Path,
    asset: AssetNames<'_>,
    options: &ConvertOptions,
) -> Result<ExportReport, ConvertError> {
    let dir = asset_dir(out_dir, asset)?;
    let mut report = ExportReport::default();

    let geometry = dir.join(format!("{}.geo", asset.name));
    write_artifact(&geometry, |w| write_geometry(w, model))?;
    report.written.push(geometry);

    let scene = dir.join(format!("{}.scene.xml", asset.name));
    write_artifact(&scene, |w| write_scene_graph(w, model, asset, options))?;
    report.written.push(scene);

    let skinned = !model.graph.joints.is_empty();
    for material in model
        .used_materials
        .iter()
        .filter_map(|id| doc.find_material(id))
    {
        let path = dir.join(material_file_name(&options.material_prefix, material));
        if !options.overwrite_materials && path.exists() {
            tracing::info!("Skipping material {:?}", path);
            report.skipped.push(path);
            continue;
        }
        write_artifact(&path, |w| write_material(w, material, asset.path, skinned))?;
        report.written.push(path);
    }

    Ok(report)
}

/// Write the `.anim` file of an animation
pub fn export_animation(
    animation: &ConvertedAnimation,
    out_dir: &Path,
    asset: AssetNames<'_>,
) -> Result<PathBuf, ConvertError> {
    let path = asset_dir(out_dir, asset)?.join(format!("{}.anim", asset.name));
    write_artifact(&path, |w| write_animation(w, animation))?;
    Ok(path)
}

fn asset_dir(out_dir: &Path, asset: AssetNames<'_>) -> Result<PathBuf, ConvertError> {
    let dir = out_dir.join(asset.path);
    fs::create_dir_all(&dir).map_err(|e| ConvertError::artifact(&dir, e))?;
    Ok(dir)
}

fn write_artifact(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), ConvertError> {
    let file = File::create(path).map_err(|e| ConvertError::artifact(path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| ConvertError::artifact(path, e))?;
    tracing::debug!("Wrote {:?}", path);
    Ok(())
}
