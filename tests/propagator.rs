// Propagation through the CSG geometry in a constant field.

use emtransport::cell::Cell;
use emtransport::config::PropagatorSettings;
use emtransport::geometry::Geometry;
use emtransport::navigation::{NavState, Navigator};
use emtransport::propagator::FieldPropagator;
use emtransport::region::Region;
use emtransport::surface::{BoundaryType, Surface};
use emtransport::track::ParticleKind;
use emtransport::units::{MEV, TESLA};
use nalgebra::Vector3;
use std::sync::Arc;

/// A unit ball inside a vacuum-bounded ball of radius 100.
fn two_balls() -> Geometry {
    let inner = Arc::new(Surface::sphere(0.0, 0.0, 0.0, 1.0, 1));
    let outer =
        Arc::new(Surface::sphere(0.0, 0.0, 0.0, 100.0, 2).with_boundary(BoundaryType::Vacuum));
    let core = Cell::new(1, Region::below(&inner), Some("core".to_string()));
    let world = Cell::new(
        2,
        Region::above(&inner).intersection(&Region::below(&outer)),
        Some("world".to_string()),
    );
    Geometry::new(vec![core, world]).unwrap()
}

#[test]
fn test_neutral_track_in_bulk_moves_exactly() {
    let geometry = two_balls();
    let propagator = FieldPropagator::new(2.0 * TESLA, PropagatorSettings::default());
    let start = Vector3::new(0.1, -0.2, 0.3);
    let dir0 = Vector3::new(0.0, 0.6, -0.8);
    let mut pos = start;
    let mut dir = dir0;
    let state = geometry.locate(&pos);

    let result = propagator.propagate(
        &geometry,
        ParticleKind::Gamma,
        1.0 * MEV,
        0.25,
        &mut pos,
        &mut dir,
        &state,
    );

    assert_eq!(result.step, 0.25);
    assert!((pos - (start + dir0 * 0.25)).norm() < 1e-15);
    assert_eq!(dir, dir0);
    assert_eq!(result.next_state, state);
}

#[test]
fn test_charged_without_field_matches_neutral() {
    let geometry = two_balls();
    let propagator = FieldPropagator::new(0.0, PropagatorSettings::default());
    let start = Vector3::new(0.2, 0.1, 0.0);
    let dir0 = Vector3::new(0.48, 0.6, 0.64);
    let state = geometry.locate(&start);

    let mut neutral_pos = start;
    let mut neutral_dir = dir0;
    let neutral = propagator.propagate(
        &geometry,
        ParticleKind::Gamma,
        2.0 * MEV,
        5.0,
        &mut neutral_pos,
        &mut neutral_dir,
        &state,
    );

    for kind in [ParticleKind::Electron, ParticleKind::Positron] {
        let mut pos = start;
        let mut dir = dir0;
        let charged =
            propagator.propagate(&geometry, kind, 2.0 * MEV, 5.0, &mut pos, &mut dir, &state);
        assert_eq!(charged.step, neutral.step);
        assert_eq!(charged.next_state, neutral.next_state);
        assert_eq!(pos, neutral_pos);
        assert_eq!(dir, neutral_dir);
    }
    // The unit ball stops the move at its surface.
    assert!(neutral.next_state.is_on_boundary());
    assert!((neutral_pos.norm() - 1.0).abs() < 1e-9);
}

#[test]
fn test_curved_tracks_stop_on_the_surface_with_unit_direction() {
    let geometry = two_balls();
    // Enough chords to reach the surface of the unit ball in one call.
    let settings = PropagatorSettings {
        max_chord_iterations: 100,
        ..PropagatorSettings::default()
    };
    let propagator = FieldPropagator::new(1.0 * TESLA, settings);
    let directions = [
        Vector3::new(0.6, 0.0, 0.8),
        Vector3::new(-0.36, 0.48, 0.8),
        Vector3::new(0.0, 0.6, -0.8),
        Vector3::new(0.8, 0.0, -0.6),
    ];

    for kind in [ParticleKind::Electron, ParticleKind::Positron] {
        for &dir0 in &directions {
            let mut pos = Vector3::zeros();
            let mut dir = dir0;
            let state = geometry.locate(&pos);
            let result =
                propagator.propagate(&geometry, kind, 1.0 * MEV, 20.0, &mut pos, &mut dir, &state);

            assert!(result.next_state.is_on_boundary(), "{kind} {dir0:?}");
            assert_eq!(result.next_state.top(), Some(1));
            assert!((dir.norm() - 1.0).abs() < 1e-9);
            assert!((pos.norm() - 1.0).abs() < 1e-6, "ended at radius {}", pos.norm());
            assert!(result.step > 1.0 && result.step < 20.0);
        }
    }
}

#[test]
fn test_opposite_charges_bend_opposite_ways() {
    let geometry = two_balls();
    let propagator = FieldPropagator::new(1.0 * TESLA, PropagatorSettings::default());
    let start = Vector3::new(5.0, 0.0, 0.0);
    let state = geometry.locate(&start);

    let mut ends = Vec::new();
    for kind in [ParticleKind::Electron, ParticleKind::Positron] {
        let mut pos = start;
        let mut dir = Vector3::new(0.0, 1.0, 0.0);
        propagator.propagate(&geometry, kind, 10.0 * MEV, 1.0, &mut pos, &mut dir, &state);
        ends.push(pos);
    }
    // Mirror images about the initial direction of motion.
    assert!((ends[0].x - start.x) * (ends[1].x - start.x) < 0.0);
    assert!((ends[0].y - ends[1].y).abs() < 1e-9);
}
