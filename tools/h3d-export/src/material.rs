//! `.material.xml` generation for the materials a model uses

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::scene_graph::escape;
use crate::source::SourceMaterial;

/// Shader every generated material references
pub const MODEL_SHADER: &str = "shaders/model.shader";

/// Write one material.
///
/// Texture paths are resolved against `asset_path`. Skinned models get the
/// skinning shader flag. Specular parameters are only written for effects
/// with a specular colour. A material without effect stays empty.
pub fn write_material<W: Write>(
    w: &mut W,
    material: &SourceMaterial,
    asset_path: &str,
    skinned: bool,
) -> io::Result<()> {
    let mut out = String::from("<Material>\n");

    if let Some(effect) = &material.effect {
        let _ = writeln!(out, "\t<Shader source=\"{}\" />", MODEL_SHADER);
        if skinned {
            out.push_str("\t<ShaderFlag name=\"_F01_Skinning\" />\n");
        }
        out.push('\n');

        match &effect.diffuse_map {
            Some(map) => {
                let _ = writeln!(
                    out,
                    "\t<Sampler name=\"albedoMap\" map=\"{}{}\" />",
                    escape(asset_path),
                    escape(map)
                );
            }
            None => {
                let [a, b, c, d] = effect.diffuse_color;
                let _ = writeln!(
                    out,
                    "\t<Uniform name=\"matDiffuseCol\" a=\"{}\" b=\"{}\" c=\"{}\" d=\"{}\" />",
                    a, b, c, d
                );
            }
        }

        if let Some([a, b, c, _]) = effect.specular_color {
            let _ = writeln!(
                out,
                "\t<Uniform name=\"matSpecParams\" a=\"{}\" b=\"{}\" c=\"{}\" d=\"{}\" />",
                a, b, c, effect.shininess
            );
        }
    }

    out.push_str("</Material>\n");
    w.write_all(out.as_bytes())
}

/// File name of a material, relative to the asset directory
pub fn material_file_name(prefix: &str, material: &SourceMaterial) -> String {
    format!("{}{}.material.xml", prefix, material.name())
}
