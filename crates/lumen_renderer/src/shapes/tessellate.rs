//! Polygonization of scalar fields.
//!
//! Samples a field on a regular grid and extracts the zero level set with
//! marching tetrahedra: each grid cell is cut into six tetrahedra sharing
//! its main diagonal, so neighbouring cells agree on shared faces and no
//! case tables are needed.

use std::sync::Arc;

use lumen_core::Material;
use lumen_math::{Aabb, DVec3};

use super::{Mesh, Triangle};

/// Corners of a cell as offsets, indexed by bits (x, y, z).
const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Six tetrahedra around the 0-7 diagonal.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

/// Triangulate `{p : field(p) = 0}` inside `bounds` with cells of size
/// `step`. Negative values are inside.
pub fn tessellate<F>(field: F, bounds: Aabb, step: f64, material: Arc<Material>) -> Mesh
where
    F: Fn(DVec3) -> f64,
{
    // One extra cell of padding so closed surfaces touching the bounds close.
    let min = bounds.min - DVec3::splat(step);
    let size = bounds.size() + DVec3::splat(2.0 * step);
    let nx = (size.x / step).ceil() as usize + 1;
    let ny = (size.y / step).ceil() as usize + 1;
    let nz = (size.z / step).ceil() as usize + 1;

    let point = |x: usize, y: usize, z: usize| {
        min + DVec3::new(x as f64, y as f64, z as f64) * step
    };
    let index = |x: usize, y: usize, z: usize| (z * ny + y) * nx + x;

    let mut values = vec![0.0; nx * ny * nz];
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                values[index(x, y, z)] = field(point(x, y, z));
            }
        }
    }

    let mut triangles = Vec::new();
    for z in 0..nz.saturating_sub(1) {
        for y in 0..ny.saturating_sub(1) {
            for x in 0..nx.saturating_sub(1) {
                let mut p = [DVec3::ZERO; 8];
                let mut v = [0.0; 8];
                for (i, c) in CORNERS.iter().enumerate() {
                    let (cx, cy, cz) = (x + c[0], y + c[1], z + c[2]);
                    p[i] = point(cx, cy, cz);
                    v[i] = values[index(cx, cy, cz)];
                }
                if v.iter().all(|&s| s < 0.0) || v.iter().all(|&s| s >= 0.0) {
                    continue;
                }
                for tet in &TETRAHEDRA {
                    let tp = tet.map(|i| p[i]);
                    let tv = tet.map(|i| v[i]);
                    polygonize_tetrahedron(&tp, &tv, &material, &mut triangles);
                }
            }
        }
    }

    log::debug!(
        "Tessellated {}x{}x{} grid into {} triangles",
        nx,
        ny,
        nz,
        triangles.len()
    );
    Mesh::new(triangles)
}

fn polygonize_tetrahedron(
    p: &[DVec3; 4],
    v: &[f64; 4],
    material: &Arc<Material>,
    out: &mut Vec<Triangle>,
) {
    let inside: Vec<usize> = (0..4).filter(|&i| v[i] < 0.0).collect();
    let outside: Vec<usize> = (0..4).filter(|&i| v[i] >= 0.0).collect();
    // Always interpolated from the inside corner so that tetrahedra sharing
    // an edge produce bit-identical vertices.
    let edge = |a: usize, b: usize| {
        let t = v[a] / (v[a] - v[b]);
        p[a] + (p[b] - p[a]) * t
    };
    let centroid = |ids: &[usize]| ids.iter().map(|&i| p[i]).sum::<DVec3>() / ids.len() as f64;

    let corners: Vec<[DVec3; 3]> = match (inside.len(), outside.len()) {
        (1, 3) => {
            let a = inside[0];
            vec![[edge(a, outside[0]), edge(a, outside[1]), edge(a, outside[2])]]
        }
        (3, 1) => {
            let a = outside[0];
            vec![[edge(inside[0], a), edge(inside[1], a), edge(inside[2], a)]]
        }
        (2, 2) => {
            let (a, b) = (inside[0], inside[1]);
            let (c, d) = (outside[0], outside[1]);
            let (ac, ad, bc, bd) = (edge(a, c), edge(a, d), edge(b, c), edge(b, d));
            vec![[ac, ad, bd], [ac, bd, bc]]
        }
        _ => return,
    };

    // Wind every triangle so its face normal points outward.
    let outward = centroid(&outside) - centroid(&inside);
    for [a, b, c] in corners {
        let normal = (b - a).cross(c - a);
        if normal.length_squared() < 1e-24 {
            continue;
        }
        let triangle = if normal.dot(outward) >= 0.0 {
            Triangle::new(a, b, c, material.clone())
        } else {
            Triangle::new(a, c, b, material.clone())
        };
        out.push(triangle);
    }
}
