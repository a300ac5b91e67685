use crate::cell::Cell;
use crate::error::GeometryError;
use crate::navigation::{NavState, Navigator};
use crate::units::PUSH;
use nalgebra::Vector3;
use std::collections::HashSet;
use std::sync::Arc;

/// A collection of cells; the navigation state is the index of a cell.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub cells: Vec<Cell>,
}

impl Geometry {
    /// Build a geometry, rejecting duplicate cell or surface ids.
    pub fn new(cells: Vec<Cell>) -> Result<Self, GeometryError> {
        if cells.is_empty() {
            return Err(GeometryError::Empty);
        }

        let mut used_cell_ids = HashSet::new();
        for cell in &cells {
            if !used_cell_ids.insert(cell.cell_id) {
                return Err(GeometryError::DuplicateCellId(cell.cell_id));
            }
        }

        // Surfaces shared between cells are the same Arc; dedupe by pointer.
        let mut unique_surface_ptrs = HashSet::new();
        let mut used_surface_ids = HashSet::new();
        for cell in &cells {
            for surface in cell.region.surfaces() {
                if unique_surface_ptrs.insert(Arc::as_ptr(&surface))
                    && !used_surface_ids.insert(surface.surface_id)
                {
                    return Err(GeometryError::DuplicateSurfaceId(surface.surface_id));
                }
            }
        }

        Ok(Geometry { cells })
    }

    /// Index of the first cell containing the point.
    pub fn find_cell(&self, point: &Vector3<f64>) -> Option<usize> {
        self.cells.iter().position(|cell| cell.contains(point))
    }

    pub fn cell(&self, state: &NavState) -> Option<&Cell> {
        state.top().and_then(|index| self.cells.get(index))
    }
}

impl Navigator for Geometry {
    fn locate(&self, position: &Vector3<f64>) -> NavState {
        match self.find_cell(position) {
            Some(index) => NavState::inside(index),
            None => NavState::outside(),
        }
    }

    fn compute_step_and_next_volume(
        &self,
        position: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_step: f64,
        current: &NavState,
    ) -> (f64, NavState) {
        let Some(cell) = self.cell(current) else {
            return (max_step, NavState::outside());
        };
        match cell.exit_surface(position, direction) {
            Some((dist, surface)) if dist < max_step => {
                let next = if surface.is_vacuum() {
                    None
                } else {
                    self.find_cell(&(position + direction * (dist + PUSH)))
                };
                (dist, NavState::entering(next))
            }
            _ => (max_step, current.relocated()),
        }
    }

    fn relocate(&self, position: &Vector3<f64>, state: &mut NavState) {
        // Leaving through a vacuum surface is final.
        if state.top().is_none() {
            return;
        }
        *state = self.locate(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use crate::surface::{BoundaryType, Surface};

    /// A ball of radius 1 nested in a vacuum-bounded ball of radius 10.
    fn nested_balls() -> Geometry {
        let inner = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 1.0, 1));
        let outer = Arc::new(
            Surface::sphere(0.0, 0.0, 0.0, 10.0, 2).with_boundary(BoundaryType::Vacuum),
        );
        let core = Cell::new(1, Region::below(&inner), Some("core".to_string()));
        let shell = Cell::new(
            2,
            Region::above(&inner).intersection(&Region::below(&outer)),
            Some("shell".to_string()),
        );
        Geometry::new(vec![core, shell]).unwrap()
    }

    #[test]
    fn test_find_cell() {
        let geometry = nested_balls();
        assert_eq!(geometry.find_cell(&Vector3::zeros()), Some(0));
        assert_eq!(geometry.find_cell(&Vector3::new(5.0, 0.0, 0.0)), Some(1));
        assert_eq!(geometry.find_cell(&Vector3::new(50.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_step_without_boundary_is_exact() {
        let geometry = nested_balls();
        let state = geometry.locate(&Vector3::zeros());
        let (step, next) = geometry.compute_step_and_next_volume(
            &Vector3::zeros(),
            &Vector3::new(1.0, 0.0, 0.0),
            0.3,
            &state,
        );
        assert_eq!(step, 0.3);
        assert_eq!(next, state);
        assert!(!next.is_on_boundary());
    }

    #[test]
    fn test_step_to_inner_boundary() {
        let geometry = nested_balls();
        let state = geometry.locate(&Vector3::zeros());
        let (step, next) = geometry.compute_step_and_next_volume(
            &Vector3::zeros(),
            &Vector3::new(0.0, 1.0, 0.0),
            5.0,
            &state,
        );
        assert!((step - 1.0).abs() < 1e-12);
        assert!(next.is_on_boundary());
        assert_eq!(next.top(), Some(1));
    }

    #[test]
    fn test_vacuum_boundary_leaves_world() {
        let geometry = nested_balls();
        let start = Vector3::new(5.0, 0.0, 0.0);
        let state = geometry.locate(&start);
        let (step, next) = geometry.compute_step_and_next_volume(
            &start,
            &Vector3::new(1.0, 0.0, 0.0),
            100.0,
            &state,
        );
        assert!((step - 5.0).abs() < 1e-12);
        assert_eq!(next.top(), None);

        let mut relocated = next;
        geometry.relocate(&Vector3::new(10.0 + PUSH, 0.0, 0.0), &mut relocated);
        assert_eq!(relocated.top(), None);
    }

    #[test]
    fn test_relocate_clears_boundary_flag() {
        let geometry = nested_balls();
        let mut state = NavState::entering(Some(1));
        geometry.relocate(&Vector3::new(1.0 + PUSH, 0.0, 0.0), &mut state);
        assert_eq!(state, NavState::inside(1));
    }

    #[test]
    fn test_cell_id_validation() {
        let s1 = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 1.0, 1));
        let cell1 = Cell::new(1, Region::below(&s1), None);
        let cell2 = Cell::new(1, Region::above(&s1), None);
        let result = Geometry::new(vec![cell1, cell2]);
        assert_eq!(result.unwrap_err(), GeometryError::DuplicateCellId(1));
    }

    #[test]
    fn test_surface_id_validation() {
        let s1 = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 1.0, 4));
        let s2 = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 2.0, 4));
        let cell1 = Cell::new(1, Region::below(&s1), None);
        let cell2 = Cell::new(2, Region::above(&s1).intersection(&Region::below(&s2)), None);
        let result = Geometry::new(vec![cell1, cell2]);
        assert_eq!(result.unwrap_err(), GeometryError::DuplicateSurfaceId(4));
    }

    #[test]
    fn test_shared_surface_is_not_a_duplicate() {
        assert!(Geometry::new(nested_balls().cells).is_ok());
        assert_eq!(Geometry::new(Vec::new()).unwrap_err(), GeometryError::Empty);
    }
}
