use nalgebra::Vector3;

/// Intersections closer than this along a ray are ignored.
const MIN_DISTANCE: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BoundaryType {
    /// Particles cross into whatever cell lies beyond.
    #[default]
    Transmission,
    /// Particles crossing this surface leave the world.
    Vacuum,
}

#[derive(Clone, Debug)]
pub struct Surface {
    pub surface_id: usize,
    pub kind: SurfaceKind,
    pub boundary_type: BoundaryType,
}

#[derive(Clone, Debug)]
pub enum SurfaceKind {
    /// a x + b y + c z - d = 0
    Plane { a: f64, b: f64, c: f64, d: f64 },
    Sphere { center: Vector3<f64>, radius: f64 },
    /// Infinite cylinder; `axis` is a unit vector.
    Cylinder {
        axis: Vector3<f64>,
        origin: Vector3<f64>,
        radius: f64,
    },
}

/// Smallest root above `MIN_DISTANCE` of `a t^2 + b t + c = 0`.
fn smallest_positive_root(a: f64, b: f64, c: f64) -> Option<f64> {
    if a.abs() < MIN_DISTANCE {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    if t1 > MIN_DISTANCE {
        Some(t1)
    } else if t2 > MIN_DISTANCE {
        Some(t2)
    } else {
        None
    }
}

impl Surface {
    /// Distance from `point` along the unit `direction` to the surface, if the
    /// ray hits it ahead of the point.
    pub fn distance_to_surface(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<f64> {
        match &self.kind {
            SurfaceKind::Plane { a, b, c, d } => {
                let normal = Vector3::new(*a, *b, *c);
                let denom = normal.dot(direction);
                if denom.abs() < MIN_DISTANCE {
                    return None;
                }
                let t = (d - normal.dot(point)) / denom;
                if t > 0.0 {
                    Some(t)
                } else {
                    None
                }
            }
            SurfaceKind::Sphere { center, radius } => {
                let oc = point - center;
                smallest_positive_root(
                    direction.norm_squared(),
                    2.0 * oc.dot(direction),
                    oc.norm_squared() - radius * radius,
                )
            }
            SurfaceKind::Cylinder {
                axis,
                origin,
                radius,
            } => {
                // Project the ray onto the plane normal to the axis.
                let d = direction - direction.dot(axis) * axis;
                let delta = point - origin;
                let m = delta - delta.dot(axis) * axis;
                smallest_positive_root(
                    d.norm_squared(),
                    2.0 * d.dot(&m),
                    m.norm_squared() - radius * radius,
                )
            }
        }
    }

    /// Signed distance-like value: negative below (inside), positive above.
    pub fn evaluate(&self, point: &Vector3<f64>) -> f64 {
        match &self.kind {
            SurfaceKind::Plane { a, b, c, d } => a * point.x + b * point.y + c * point.z - d,
            SurfaceKind::Sphere { center, radius } => (point - center).norm() - radius,
            SurfaceKind::Cylinder {
                axis,
                origin,
                radius,
            } => {
                let v = point - origin;
                (v - v.dot(axis) * axis).norm() - radius
            }
        }
    }

    pub fn new_plane(a: f64, b: f64, c: f64, d: f64, surface_id: usize) -> Self {
        Surface {
            surface_id,
            kind: SurfaceKind::Plane { a, b, c, d },
            boundary_type: BoundaryType::default(),
        }
    }

    pub fn x_plane(x0: f64, surface_id: usize) -> Self {
        Self::new_plane(1.0, 0.0, 0.0, x0, surface_id)
    }

    pub fn y_plane(y0: f64, surface_id: usize) -> Self {
        Self::new_plane(0.0, 1.0, 0.0, y0, surface_id)
    }

    pub fn z_plane(z0: f64, surface_id: usize) -> Self {
        Self::new_plane(0.0, 0.0, 1.0, z0, surface_id)
    }

    pub fn sphere(x0: f64, y0: f64, z0: f64, radius: f64, surface_id: usize) -> Self {
        Surface {
            surface_id,
            kind: SurfaceKind::Sphere {
                center: Vector3::new(x0, y0, z0),
                radius,
            },
            boundary_type: BoundaryType::default(),
        }
    }

    /// Cylinder of `radius` around the line through `origin` along `axis`.
    pub fn cylinder(
        origin: Vector3<f64>,
        axis: Vector3<f64>,
        radius: f64,
        surface_id: usize,
    ) -> Self {
        Surface {
            surface_id,
            kind: SurfaceKind::Cylinder {
                axis: axis.normalize(),
                origin,
                radius,
            },
            boundary_type: BoundaryType::default(),
        }
    }

    /// Cylinder along Z centred at (x0, y0).
    pub fn z_cylinder(x0: f64, y0: f64, radius: f64, surface_id: usize) -> Self {
        Self::cylinder(
            Vector3::new(x0, y0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            radius,
            surface_id,
        )
    }

    pub fn with_boundary(mut self, boundary_type: BoundaryType) -> Self {
        self.boundary_type = boundary_type;
        self
    }

    pub fn is_vacuum(&self) -> bool {
        self.boundary_type == BoundaryType::Vacuum
    }
}
