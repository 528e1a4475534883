use crate::{DVec3, Interval, Ray};

/// One of the three coordinate axes, used to pick split planes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (0=X, 1=Y, 2=Z).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Axis-aligned bounding box given by its min and max corners.
///
/// Constructed boxes keep `min <= max` per component. [`Aabb::EMPTY`] is the
/// zero-shape box used for aggregates that contain nothing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// The zero-shape sentinel.
    pub const EMPTY: Aabb = Aabb {
        min: DVec3::ZERO,
        max: DVec3::ZERO,
    };

    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box enclosing every box in `boxes`, or [`Aabb::EMPTY`] when
    /// there are none.
    pub fn for_boxes(boxes: impl IntoIterator<Item = Aabb>) -> Self {
        let mut iter = boxes.into_iter();
        match iter.next() {
            Some(first) => iter.fold(first, |acc, b| acc.extend(&b)),
            None => Aabb::EMPTY,
        }
    }

    /// Point inside the box at normalized coordinates `anchor` (0 = min, 1 = max).
    pub fn anchor(&self, anchor: DVec3) -> DVec3 {
        self.min + self.size() * anchor
    }

    pub fn center(&self) -> DVec3 {
        self.anchor(DVec3::splat(0.5))
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Radius of the sphere that encloses the box.
    pub fn outer_radius(&self) -> f64 {
        (self.min - self.center()).length()
    }

    /// Largest half-extent of the box.
    pub fn inner_radius(&self) -> f64 {
        (self.center() - self.min).max_element()
    }

    /// Box surrounding both `self` and `other`.
    pub fn extend(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Componentwise inclusive containment test.
    pub fn contains(&self, p: DVec3) -> bool {
        self.min.x <= p.x
            && self.max.x >= p.x
            && self.min.y <= p.y
            && self.max.y >= p.y
            && self.min.z <= p.z
            && self.max.z >= p.z
    }

    /// True when the two boxes overlap (touching faces count).
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.min.x > other.max.x
            || self.max.x < other.min.x
            || self.min.y > other.max.y
            || self.max.y < other.min.y
            || self.min.z > other.max.z
            || self.max.z < other.min.z)
    }

    /// Slab test. Returns the ray parameter range spent inside the box;
    /// the range is empty (`max < min`) when the ray misses.
    pub fn intersect(&self, ray: &Ray) -> Interval {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;
        let near = t0.min(t1);
        let far = t0.max(t1);
        Interval::new(near.max_element(), far.min_element())
    }

    /// Which sides of the plane `axis = point` the box reaches, as
    /// `(left, right)`. A box straddling the plane reaches both.
    pub fn partition(&self, axis: Axis, point: f64) -> (bool, bool) {
        let i = axis.index();
        (self.min[i] <= point, self.max[i] >= point)
    }
}
