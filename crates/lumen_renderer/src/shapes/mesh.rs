//! Triangle meshes with their own spatial index.

use std::collections::HashMap;
use std::sync::Arc;

use lumen_core::Material;
use lumen_math::{Aabb, DMat4, DVec3, Mat4Ext, Ray};

use super::Triangle;
use crate::hit::{Hit, Primitive};
use crate::tree::{intersect_linear, Tree, TreeConfig};

/// A flat array of triangles, indexed by a private tree once compiled.
#[derive(Debug, Clone)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    bbox: Aabb,
    tree: Option<Tree>,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let bbox = Aabb::for_boxes(triangles.iter().map(|t| t.bounding_box()));
        Self {
            triangles,
            bbox,
            tree: None,
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Build the triangle tree. Does nothing if it already exists.
    pub fn compile(&mut self) {
        if self.tree.is_none() {
            self.tree = Some(Tree::build(&self.triangles, TreeConfig::default()));
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.tree.is_some()
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Hit<'_>> {
        match &self.tree {
            Some(tree) => tree.intersect(&self.triangles, ray),
            None => intersect_linear(&self.triangles, ray).map(|(_, hit)| hit),
        }
    }

    /// Apply `matrix` to every vertex and normal.
    pub fn transform(&mut self, matrix: DMat4) {
        let normal_matrix = matrix
            .checked_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or(matrix);
        for t in &mut self.triangles {
            t.v1 = matrix.mul_position(t.v1);
            t.v2 = matrix.mul_position(t.v2);
            t.v3 = matrix.mul_position(t.v3);
            t.n1 = normal_matrix.mul_direction(t.n1);
            t.n2 = normal_matrix.mul_direction(t.n2);
            t.n3 = normal_matrix.mul_direction(t.n3);
        }
        self.dirty();
    }

    /// Translate so the bounding box point at `anchor` lands on `position`.
    pub fn move_to(&mut self, position: DVec3, anchor: DVec3) {
        let offset = position - self.bbox.anchor(anchor);
        self.transform(DMat4::from_translation(offset));
    }

    /// Uniformly scale and translate into `target`, aligned by `anchor`.
    pub fn fit_inside(&mut self, target: Aabb, anchor: DVec3) {
        let size = self.bbox.size();
        let scale = (target.size() / size).min_element();
        let extra = target.size() - size * scale;
        let matrix = DMat4::from_translation(target.min + extra * anchor)
            * DMat4::from_scale(DVec3::splat(scale))
            * DMat4::from_translation(-self.bbox.min);
        self.transform(matrix);
    }

    /// Average the normals of triangles sharing a vertex position.
    pub fn smooth_normals(&mut self) {
        let key = |v: DVec3| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
        let mut lookup: HashMap<[u64; 3], DVec3> = HashMap::new();
        for t in &self.triangles {
            *lookup.entry(key(t.v1)).or_default() += t.n1;
            *lookup.entry(key(t.v2)).or_default() += t.n2;
            *lookup.entry(key(t.v3)).or_default() += t.n3;
        }
        for n in lookup.values_mut() {
            *n = n.normalize_or_zero();
        }
        for t in &mut self.triangles {
            t.n1 = lookup[&key(t.v1)];
            t.n2 = lookup[&key(t.v2)];
            t.n3 = lookup[&key(t.v3)];
            t.fix_normals();
        }
    }

    pub fn set_material(&mut self, material: Material) {
        let material = Arc::new(material);
        for t in &mut self.triangles {
            t.material = material.clone();
        }
    }

    fn dirty(&mut self) {
        self.bbox = Aabb::for_boxes(self.triangles.iter().map(|t| t.bounding_box()));
        self.tree = None;
    }
}
