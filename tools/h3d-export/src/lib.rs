//! h3d-export library
//!
//! Compiles parsed scene documents into engine assets: `.geo` geometry,
//! `.anim` animation, `.scene.xml` scene graphs and `.material.xml`
//! materials. The pipeline is usable in-process through [`convert_model`]
//! and [`convert_animation`]; [`batch`] and [`manifest`] drive it over files.

pub mod batch;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod flatten;
pub mod formats;
pub mod manifest;
pub mod material;
pub mod mesh;
pub mod rig;
pub mod scene;
pub mod scene_graph;
pub mod source;

pub use convert::{
    convert_animation, convert_model, ConvertOptions, ConvertedAnimation, ConvertedModel,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::ConvertError;
pub use export::{export_animation, export_model, ExportReport};
pub use scene_graph::AssetNames;
pub use source::SourceDocument;
