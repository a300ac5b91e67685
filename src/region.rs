use crate::surface::Surface;
use nalgebra::Vector3;
use std::sync::Arc;

/// Constructive solid geometry over surface half-spaces.
#[derive(Clone, Debug)]
pub struct Region {
    pub expr: RegionExpr,
}

#[derive(Clone, Debug)]
pub enum HalfspaceType {
    Above(Arc<Surface>),
    Below(Arc<Surface>),
}

#[derive(Clone, Debug)]
pub enum RegionExpr {
    Halfspace(HalfspaceType),
    Union(Box<RegionExpr>, Box<RegionExpr>),
    Intersection(Box<RegionExpr>, Box<RegionExpr>),
    Complement(Box<RegionExpr>),
}

impl Region {
    pub fn new_from_halfspace(halfspace_type: HalfspaceType) -> Self {
        Region {
            expr: RegionExpr::Halfspace(halfspace_type),
        }
    }

    pub fn above(surface: &Arc<Surface>) -> Self {
        Self::new_from_halfspace(HalfspaceType::Above(Arc::clone(surface)))
    }

    pub fn below(surface: &Arc<Surface>) -> Self {
        Self::new_from_halfspace(HalfspaceType::Below(Arc::clone(surface)))
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Region {
            expr: RegionExpr::Intersection(
                Box::new(self.expr.clone()),
                Box::new(other.expr.clone()),
            ),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Region {
            expr: RegionExpr::Union(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
        }
    }

    pub fn complement(&self) -> Self {
        Region {
            expr: RegionExpr::Complement(Box::new(self.expr.clone())),
        }
    }

    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        self.expr.evaluate_contains(point)
    }

    /// Every surface bounding the region, each listed once per occurrence.
    pub fn surfaces(&self) -> Vec<Arc<Surface>> {
        fn collect(expr: &RegionExpr, surfaces: &mut Vec<Arc<Surface>>) {
            match expr {
                RegionExpr::Halfspace(HalfspaceType::Above(surf))
                | RegionExpr::Halfspace(HalfspaceType::Below(surf)) => {
                    surfaces.push(Arc::clone(surf))
                }
                RegionExpr::Union(a, b) | RegionExpr::Intersection(a, b) => {
                    collect(a, surfaces);
                    collect(b, surfaces);
                }
                RegionExpr::Complement(inner) => collect(inner, surfaces),
            }
        }
        let mut result = Vec::new();
        collect(&self.expr, &mut result);
        result
    }

    /// Whether travelling `dist` (plus `eps`) from `point` along `direction`
    /// ends outside the region.
    pub fn is_exit(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
        dist: f64,
        eps: f64,
    ) -> bool {
        let probe = point + direction * (dist + eps);
        !self.contains(&probe)
    }
}

impl RegionExpr {
    pub fn evaluate_contains(&self, point: &Vector3<f64>) -> bool {
        match self {
            RegionExpr::Halfspace(hs) => match hs {
                HalfspaceType::Above(surf) => surf.evaluate(point) > 0.0,
                HalfspaceType::Below(surf) => surf.evaluate(point) < 0.0,
            },
            RegionExpr::Union(a, b) => a.evaluate_contains(point) || b.evaluate_contains(point),
            RegionExpr::Intersection(a, b) => {
                a.evaluate_contains(point) && b.evaluate_contains(point)
            }
            RegionExpr::Complement(inner) => !inner.evaluate_contains(point),
        }
    }
}
