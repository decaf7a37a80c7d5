//! Scene documents for integration tests, built as JSON the way the loader
//! dumps them.

#![allow(dead_code)]

use serde_json::{json, Value};

/// Row-major translation matrix
pub fn translation_row_major(x: f32, y: f32, z: f32) -> Vec<f32> {
    vec![
        1.0, 0.0, 0.0, x, //
        0.0, 1.0, 0.0, y, //
        0.0, 0.0, 1.0, z, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

fn corner(position: u32, normal: u32, uv: u32) -> Value {
    json!({ "position": position, "normal": normal, "texcoords": [uv] })
}

fn stone_material() -> Value {
    json!({
        "id": "stone-mat",
        "name": "Stone",
        "effect": {
            "diffuse_map": "stone.png",
            "specular_color": [0.2, 0.2, 0.2, 1.0],
            "shininess": 0.4
        }
    })
}

fn mesh_node(id: &str, url: &str) -> Value {
    json!({
        "id": id,
        "instances": [{ "url": url, "material_bindings": { "surface": "stone-mat" } }]
    })
}

/// One unskinned triangle with distinct positions, normals and UVs
pub fn single_triangle() -> Value {
    json!({
        "scene": [mesh_node("Tri", "tri-geo")],
        "geometries": [{
            "id": "tri-geo",
            "positions": { "data": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] },
            "triangles": [{
                "material": "surface",
                "normals": { "data": [0.0, 0.0, 1.0, 0.0, 0.1, 1.0, 0.1, 0.0, 1.0] },
                "texcoords": [{ "stride": 2, "data": [0.0, 0.0, 1.0, 0.0, 0.0, 1.0] }],
                "indices": [corner(0, 0, 0), corner(1, 1, 1), corner(2, 2, 2)]
            }]
        }],
        "materials": [stone_material()]
    })
}

/// Two triangles sharing an edge with identical attributes along it
pub fn quad() -> Value {
    json!({
        "scene": [mesh_node("Quad", "quad-geo")],
        "geometries": [quad_geometry("quad-geo")],
        "materials": [stone_material()]
    })
}

fn quad_geometry(id: &str) -> Value {
    json!({
        "id": id,
        "positions": { "data": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0] },
        "triangles": [{
            "material": "surface",
            "normals": { "data": [0.0, 0.0, 1.0] },
            "texcoords": [{ "stride": 2, "data": [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0] }],
            "indices": [
                corner(0, 0, 0), corner(1, 0, 1), corner(2, 0, 2),
                corner(0, 0, 0), corner(2, 0, 2), corner(3, 0, 3)
            ]
        }]
    })
}

/// Two sibling nodes with the same name
pub fn duplicate_names() -> Value {
    json!({
        "scene": [
            { "id": "arm-l", "name": "Arm", "instances": [{ "url": "quad-geo" }] },
            { "id": "arm-r", "name": "Arm", "instances": [{ "url": "quad-geo" }] }
        ],
        "geometries": [quad_geometry("quad-geo")]
    })
}

/// Z-up triangle standing in the XZ plane
pub fn z_up_triangle() -> Value {
    json!({
        "y_up": false,
        "scene": [{ "id": "Tri", "instances": [{ "url": "tri-geo" }] }],
        "geometries": [{
            "id": "tri-geo",
            "positions": { "data": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0] },
            "triangles": [{
                "indices": [{ "position": 0 }, { "position": 1 }, { "position": 2 }]
            }]
        }]
    })
}

/// A vertical strip of two quads skinned to a hip and a knee joint.
///
/// Bind matrices invert the joints' scene pose, so baked positions equal the
/// source positions. Position 5 carries five influences.
pub fn skinned_leg() -> Value {
    let mut bind = translation_row_major(0.0, -1.0, 0.0);
    bind.extend(translation_row_major(0.0, -2.0, 0.0));
    json!({
        "scene": [
            {
                "id": "hip",
                "joint": true,
                "transforms": [{ "sid": "loc", "kind": "translate", "values": [0.0, 1.0, 0.0] }],
                "children": [{ "node": {
                    "id": "knee",
                    "joint": true,
                    "transforms": [{ "sid": "loc", "kind": "translate", "values": [0.0, 1.0, 0.0] }]
                }}]
            },
            {
                "id": "leg",
                "instances": [{ "url": "leg-skin", "material_bindings": { "surface": "stone-mat" } }]
            }
        ],
        "geometries": [{
            "id": "leg-geo",
            "positions": { "data": [
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 1.0, 1.0, 0.0,
                0.0, 2.0, 0.0, 1.0, 2.0, 0.0
            ] },
            "triangles": [{
                "material": "surface",
                "normals": { "data": [0.0, 0.0, 1.0] },
                "texcoords": [{ "stride": 2, "data": [
                    0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 1.0, 0.5, 0.0, 1.0, 1.0, 1.0
                ] }],
                "indices": [
                    corner(0, 0, 0), corner(1, 0, 1), corner(3, 0, 3),
                    corner(0, 0, 0), corner(3, 0, 3), corner(2, 0, 2),
                    corner(2, 0, 2), corner(3, 0, 3), corner(5, 0, 5),
                    corner(2, 0, 2), corner(5, 0, 5), corner(4, 0, 4)
                ]
            }]
        }],
        "skins": [{
            "id": "leg-skin",
            "owner": "leg-geo",
            "joints": ["hip", "knee"],
            "weights": [1.0, 0.5, 0.1, 0.05, 0.6, 0.2],
            "inverse_bind_matrices": bind,
            "vertex_weights": [
                [{ "joint": 0, "weight": 0 }],
                [{ "joint": 0, "weight": 0 }],
                [{ "joint": 0, "weight": 1 }, { "joint": 1, "weight": 1 }],
                [{ "joint": 0, "weight": 1 }, { "joint": 1, "weight": 1 }],
                [{ "joint": 1, "weight": 0 }],
                [
                    { "joint": 0, "weight": 2 },
                    { "joint": 1, "weight": 3 },
                    { "joint": 0, "weight": 4 },
                    { "joint": 1, "weight": 5 },
                    { "joint": 0, "weight": 3 }
                ]
            ]
        }],
        "materials": [stone_material()]
    })
}

/// Triangle with a morph target that lifts its top corner
pub fn morphed_face() -> Value {
    json!({
        "scene": [{ "id": "face", "instances": [{ "url": "face-morph" }] }],
        "geometries": [
            {
                "id": "face-geo",
                "positions": { "data": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] },
                "triangles": [{
                    "texcoords": [{ "stride": 2, "data": [0.0, 0.0, 1.0, 0.0, 0.0, 1.0] }],
                    "indices": [
                        { "position": 0, "texcoords": [0] },
                        { "position": 1, "texcoords": [1] },
                        { "position": 2, "texcoords": [2] }
                    ]
                }]
            },
            {
                "id": "smile-geo",
                "name": "smile",
                "positions": { "data": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.5] },
                "triangles": []
            }
        ],
        "morphs": [{ "id": "face-morph", "owner": "face-geo", "targets": ["smile-geo"] }]
    })
}

/// Grid of `n` x `n` quads with its triangles listed in scrambled order
pub fn scrambled_grid(n: u32) -> Value {
    let side = n + 1;
    let mut positions = Vec::new();
    for y in 0..side {
        for x in 0..side {
            positions.extend([x as f32, y as f32, 0.0]);
        }
    }

    let mut triangles = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let i = y * side + x;
            triangles.push([i, i + 1, i + side + 1]);
            triangles.push([i, i + side + 1, i + side]);
        }
    }
    let count = triangles.len();
    let indices: Vec<Value> = (0..count)
        .map(|k| triangles[(k * 37) % count])
        .flat_map(|t| t.map(|p| json!({ "position": p })))
        .collect();

    json!({
        "scene": [{ "id": "grid", "instances": [{ "url": "grid-geo" }] }],
        "geometries": [{
            "id": "grid-geo",
            "positions": { "data": positions },
            "triangles": [{ "indices": indices }]
        }]
    })
}

/// A root joint translated along X over three frames and a static child
pub fn walking_joint(samples: Vec<f32>) -> Value {
    json!({
        "scene": [{
            "id": "root",
            "joint": true,
            "transforms": [{ "sid": "loc", "kind": "translate", "values": [0.0, 0.0, 0.0] }],
            "children": [{ "node": {
                "id": "tip",
                "joint": true,
                "transforms": [{ "sid": "loc", "kind": "translate", "values": [0.0, 1.0, 0.0] }]
            }}]
        }],
        "animations": [{
            "target": "root",
            "sid": "loc",
            "input": [0.0, 1.0, 2.0],
            "output": samples
        }]
    })
}
