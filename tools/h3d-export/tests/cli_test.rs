//! Command line tests
//!
//! Runs the built binary against documents written into a temp directory.

mod documents;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use h3d_common::formats::{AnimationFile, GeometryFile};
use serde_json::Value;

fn run_cli(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_h3d-export"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("Failed to run h3d-export")
}

fn write_document(path: &Path, doc: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
}

#[test]
fn test_model_command_mirrors_input_tree() {
    let dir = tempfile::tempdir().unwrap();
    write_document(&dir.path().join("in/props/quad.json"), &documents::quad());
    write_document(&dir.path().join("in/leg.json"), &documents::skinned_leg());

    let output = run_cli(&["model", "in", "-o", "out", "--add-model-name"], dir.path());
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out = dir.path().join("out");
    assert!(out.join("props/quad.geo").exists());
    assert!(out.join("props/quad_Stone.material.xml").exists());
    assert!(out.join("leg.geo").exists());
    assert!(out.join("leg_Stone.material.xml").exists());

    let scene = fs::read_to_string(out.join("props/quad.scene.xml")).unwrap();
    assert!(scene.contains("geometry=\"props/quad.geo\""));
    assert!(scene.contains("material=\"props/quad_Stone.material.xml\""));

    let material = fs::read_to_string(out.join("leg_Stone.material.xml")).unwrap();
    assert!(material.contains("_F01_Skinning"));
}

#[test]
fn test_model_command_without_optimization() {
    let dir = tempfile::tempdir().unwrap();
    write_document(&dir.path().join("grid.json"), &documents::scrambled_grid(3));

    let output = run_cli(&["model", "grid.json", "--no-geo-opt"], dir.path());
    assert!(output.status.success());

    let bytes = fs::read(dir.path().join("grid.geo")).unwrap();
    let file = GeometryFile::from_bytes(&bytes).unwrap();
    assert_eq!(file.vertex_count, 16);
    assert_eq!(file.indices.len(), 54);
}

#[test]
fn test_existing_material_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    write_document(&dir.path().join("quad.json"), &documents::quad());
    fs::write(dir.path().join("Stone.material.xml"), "hand edited").unwrap();

    let output = run_cli(&["model", "quad.json"], dir.path());
    assert!(output.status.success());
    let material = fs::read_to_string(dir.path().join("Stone.material.xml")).unwrap();
    assert_eq!(material, "hand edited");

    let output = run_cli(&["model", "quad.json", "--overwrite-mats"], dir.path());
    assert!(output.status.success());
    let material = fs::read_to_string(dir.path().join("Stone.material.xml")).unwrap();
    assert!(material.contains("<Material>"));
}

#[test]
fn test_lod_distances_from_command_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = documents::quad();
    doc["scene"][0]["id"] = Value::from("Quad_lod2");
    write_document(&dir.path().join("quad.json"), &doc);

    let output = run_cli(
        &["model", "quad.json", "--lod-dist1", "5", "--lod-dist2", "12.5"],
        dir.path(),
    );
    assert!(output.status.success());

    let scene = fs::read_to_string(dir.path().join("quad.scene.xml")).unwrap();
    assert!(scene.contains("lodDist1=\"5\" lodDist2=\"12.5\">"));
    assert!(scene.contains("<Mesh name=\"Quad\" lodLevel=\"2\""));
}

#[test]
fn test_anim_command() {
    let dir = tempfile::tempdir().unwrap();
    write_document(
        &dir.path().join("walk.json"),
        &documents::walking_joint(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]),
    );
    fs::write(dir.path().join("empty.json"), "{}").unwrap();

    let output = run_cli(&["anim", ".", "-o", "anims"], dir.path());
    assert!(output.status.success());

    let bytes = fs::read(dir.path().join("anims/walk.anim")).unwrap();
    let file = AnimationFile::from_bytes(&bytes).unwrap();
    assert_eq!(file.header.frame_count, 3);
    assert_eq!(file.tracks.len(), 2);
    assert!(!dir.path().join("anims/empty.anim").exists());
}

#[test]
fn test_broken_document_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("in")).unwrap();
    fs::write(dir.path().join("in/broken.json"), "{ not json").unwrap();
    write_document(&dir.path().join("in/quad.json"), &documents::quad());

    let output = run_cli(&["model", "in", "-o", "out"], dir.path());
    assert!(!output.status.success());
    assert!(dir.path().join("out/quad.geo").exists());
}

#[test]
fn test_build_from_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write_document(&dir.path().join("models/quad.json"), &documents::quad());
    write_document(
        &dir.path().join("anims/walk.json"),
        &documents::walking_joint(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]),
    );
    fs::write(
        dir.path().join("assets.toml"),
        r#"
[output]
dir = "build"

[options]
add_model_name = true

[[models]]
path = "models"

[[animations]]
path = "anims/walk.json"
"#,
    )
    .unwrap();

    let output = run_cli(&["check"], dir.path());
    assert!(output.status.success());

    let output = run_cli(&["build"], dir.path());
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("build/quad.geo").exists());
    assert!(dir.path().join("build/quad_Stone.material.xml").exists());
    assert!(dir.path().join("build/walk.anim").exists());
}

#[test]
fn test_check_rejects_missing_entry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("assets.toml"),
        "[[models]]\npath = \"missing.json\"\n",
    )
    .unwrap();

    let output = run_cli(&["check"], dir.path());
    assert!(!output.status.success());
}
