use crate::region::Region;
use crate::surface::Surface;
use nalgebra::Vector3;
use std::sync::Arc;

/// Probe distance past a candidate crossing when checking that it leaves the cell.
const EXIT_PROBE: f64 = 1e-8;

/// A volume of the geometry: a region with an id and optional name.
#[derive(Clone, Debug)]
pub struct Cell {
    pub cell_id: u32,
    pub name: Option<String>,
    pub region: Region,
}

impl Cell {
    pub fn new(cell_id: u32, region: Region, name: Option<String>) -> Self {
        Cell {
            cell_id,
            name,
            region,
        }
    }

    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        self.region.contains(point)
    }

    /// Nearest crossing along the ray that actually leaves the cell, and the
    /// surface crossed there.
    pub fn exit_surface(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<(f64, Arc<Surface>)> {
        let mut nearest: Option<(f64, Arc<Surface>)> = None;
        for surface in self.region.surfaces() {
            // A quadric can be crossed twice; the first crossing may lead
            // into another part of a union rather than out of the cell.
            let mut travelled = 0.0_f64;
            for _ in 0..2 {
                let origin = point + direction * travelled;
                let Some(dist) = surface.distance_to_surface(&origin, direction) else {
                    break;
                };
                let total = travelled + dist;
                if nearest.as_ref().is_some_and(|(best, _)| total >= *best) {
                    break;
                }
                if total > 1e-10 && self.region.is_exit(point, direction, total, EXIT_PROBE) {
                    nearest = Some((total, Arc::clone(&surface)));
                    break;
                }
                travelled = total + EXIT_PROBE;
            }
        }
        nearest
    }

    /// Distance to the nearest exit crossing.
    pub fn distance_to_surface(&self, point: &Vector3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        self.exit_surface(point, direction).map(|(dist, _)| dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_cell_exit() {
        let s = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 1.0, 7));
        let cell = Cell::new(1, Region::below(&s), Some("ball".to_string()));
        let (dist, surf) = cell
            .exit_surface(&Vector3::zeros(), &Vector3::new(0.0, 0.0, 1.0))
            .unwrap();
        assert!((dist - 1.0).abs() < 1e-12);
        assert_eq!(surf.surface_id, 7);
    }

    #[test]
    fn test_shell_cell_skips_inner_surface_when_not_exiting() {
        let inner = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 1.0, 1));
        let outer = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 3.0, 2));
        let shell = Cell::new(2, Region::above(&inner).intersection(&Region::below(&outer)), None);
        // From inside the shell heading outward only the outer sphere counts.
        let d = shell.distance_to_surface(&Vector3::new(2.0, 0.0, 0.0), &Vector3::new(1.0, 0.0, 0.0));
        assert!((d.unwrap() - 1.0).abs() < 1e-12);
        // Heading inward the inner sphere is hit first.
        let d = shell.distance_to_surface(&Vector3::new(2.0, 0.0, 0.0), &Vector3::new(-1.0, 0.0, 0.0));
        assert!((d.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_union_cell_exit_past_overlap() {
        let a = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 2.0, 1));
        let b = Arc::new(Surface::sphere(3.0, 0.0, 0.0, 2.0, 2));
        let cell = Cell::new(3, Region::below(&a).union(&Region::below(&b)), None);
        assert!(cell.contains(&Vector3::new(3.0, 0.0, 0.0)));
        let d = cell.distance_to_surface(&Vector3::zeros(), &Vector3::new(1.0, 0.0, 0.0));
        assert!((d.unwrap() - 5.0).abs() < 1e-12);
    }
}
