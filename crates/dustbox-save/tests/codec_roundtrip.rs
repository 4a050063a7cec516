//! End-to-end codec properties: round-trips, idempotent re-encode,
//! boundary handling, replace-mode isolation and corruption resilience.

use dustbox_core::element::{ids, ElementRegistry};
use dustbox_core::particle::Particle;
use dustbox_core::sign::{Justification, Sign, MAX_SIGNS};
use dustbox_core::state::{MovingSolid, Region, SimulationState};
use dustbox_core::wall::walls;
use dustbox_core::{BLOCK_H, BLOCK_W, CELL, XRES, YRES};
use dustbox_save::compress::decompress_bounded;
use dustbox_save::tree::Document;
use dustbox_save::{
    build_save, parse_save, sniff_format, DecodeError, DecodeOptions, EncodeOptions,
    ReplaceMode, SaveFormat,
};
use proptest::prelude::*;

fn registry() -> ElementRegistry {
    ElementRegistry::builtin()
}

fn particle(ptype: i32, x: f32, y: f32) -> Particle {
    Particle {
        ptype,
        x,
        y,
        temp: dustbox_core::DEFAULT_TEMP,
        ..Particle::default()
    }
}

fn live(state: &SimulationState) -> Vec<&Particle> {
    state.parts.iter().filter(|p| !p.is_empty()).collect()
}

/// Open a document-container blob and return its decoded document, for
/// asserting on fields the high-level API does not surface.
fn open_document(blob: &[u8]) -> Document {
    let packed_len = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]) as usize;
    let payload = decompress_bounded(&blob[12..12 + packed_len]).unwrap();
    Document::decode(&payload).unwrap()
}

fn minimum_version_of(blob: &[u8]) -> (i32, i32) {
    let doc = open_document(blob);
    let min = doc.object_of("minimumVersion").unwrap();
    (min.int_of("major").unwrap(), min.int_of("minor").unwrap())
}

// ---------------------------------------------------------------------------
// Scenario: empty save
// ---------------------------------------------------------------------------

#[test]
fn empty_save_round_trips() {
    let reg = registry();
    let state = SimulationState::new();
    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(sniff_format(&blob), Some(SaveFormat::Document));

    let mut out = SimulationState::new();
    let report = parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();
    assert_eq!(report.format, SaveFormat::Document);
    assert_eq!((report.block_w, report.block_h), (1, 1));
    assert!(live(&out).is_empty());
    assert!(out.signs.is_empty());
}

// ---------------------------------------------------------------------------
// Round-trip with quantization bounds
// ---------------------------------------------------------------------------

#[test]
fn full_state_round_trips_within_quantization() {
    let reg = registry();
    let mut state = SimulationState::new();

    let mut dust = particle(ids::DUST, 5.0, 6.0);
    dust.vx = 2.5;
    dust.vy = -1.25;
    dust.temp = 400.0;
    dust.life = 300;
    dust.tmp = 0x12345;
    state.parts[0] = dust;

    let mut lava = particle(ids::LAVA, 9.0, 9.0);
    lava.ctype = ids::METL;
    lava.dcolour = 0xC0112233;
    state.parts[1] = lava;

    state.walls[SimulationState::cell_index(1, 1)] = walls::FAN;
    state.fan_vx[SimulationState::cell_index(1, 1)] = 0.5;
    state.fan_vy[SimulationState::cell_index(1, 1)] = -0.25;
    state.walls[SimulationState::cell_index(0, 2)] = walls::WALL;
    state.pressure[SimulationState::cell_index(0, 0)] = 1.5;
    state.vel_x[SimulationState::cell_index(2, 2)] = -3.25;
    state.signs.push(Sign::new("marker", 4, 4, Justification::Right));

    let blob = build_save(
        &state,
        Region::new(0, 0, 4 * CELL, 4 * CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();

    let mut out = SimulationState::new();
    parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();

    let parts = live(&out);
    assert_eq!(parts.len(), 2);
    let dust = parts.iter().find(|p| p.ptype == ids::DUST).unwrap();
    assert_eq!((dust.x, dust.y), (5.0, 6.0));
    assert!((dust.vx - 2.5).abs() <= 1.0 / 32.0);
    assert!((dust.vy + 1.25).abs() <= 1.0 / 32.0);
    assert!((dust.temp - 400.0).abs() <= 0.5);
    assert_eq!(dust.life, 300);
    assert_eq!(dust.tmp, 0x12345);

    let lava = parts.iter().find(|p| p.ptype == ids::LAVA).unwrap();
    assert_eq!(lava.ctype, ids::METL);
    assert_eq!(lava.dcolour, 0xC0112233);

    assert_eq!(out.walls[SimulationState::cell_index(1, 1)], walls::FAN);
    assert!((out.fan_vx[SimulationState::cell_index(1, 1)] - 0.5).abs() < 1e-6);
    assert!((out.fan_vy[SimulationState::cell_index(1, 1)] + 0.25).abs() < 1e-6);
    assert_eq!(out.walls[SimulationState::cell_index(0, 2)], walls::WALL);
    assert!((out.pressure[SimulationState::cell_index(0, 0)] - 1.5).abs() < 1.0 / 128.0);
    assert!((out.vel_x[SimulationState::cell_index(2, 2)] + 3.25).abs() < 1.0 / 128.0);

    assert_eq!(out.signs.len(), 1);
    assert_eq!(out.signs[0].text, "marker");
    assert_eq!(out.signs[0].justification, Justification::Right);
    assert_eq!((out.signs[0].x, out.signs[0].y), (4, 4));
}

// ---------------------------------------------------------------------------
// Scenario: stacked particles
// ---------------------------------------------------------------------------

#[test]
fn stacked_particles_survive_in_insertion_order() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[3] = particle(ids::WATR, 2.0, 2.0);
    state.parts[7] = particle(ids::OIL, 2.0, 2.0);

    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let mut out = SimulationState::new();
    parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();

    let parts = live(&out);
    assert_eq!(parts.len(), 2);
    // Both at the same pixel, recoverable in original insertion order.
    let index = dustbox_save::spatial::SpatialIndex::build(
        &out.parts,
        Region::new(0, 0, CELL, CELL),
    )
    .unwrap();
    let stacked: Vec<i32> = index
        .particles_at(2, 2)
        .map(|k| out.parts[k].ptype)
        .collect();
    assert_eq!(stacked, vec![ids::WATR, ids::OIL]);
}

// ---------------------------------------------------------------------------
// Idempotent re-encode
// ---------------------------------------------------------------------------

#[test]
fn reencoding_a_decoded_save_is_byte_identical() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = particle(ids::DUST, 1.0, 1.0);
    state.parts[1] = {
        let mut p = particle(ids::SOAP, 2.0, 1.0);
        p.ctype = 2;
        p.tmp = 2; // forward link to the soap below
        p
    };
    state.parts[2] = {
        let mut p = particle(ids::SOAP, 3.0, 1.0);
        p.ctype = 4;
        p.tmp2 = 1;
        p
    };
    state.walls[0] = walls::DESTROYALL;
    state.signs.push(Sign::new("x", 1, 1, Justification::Left));

    let region = Region::new(0, 0, 2 * CELL, 2 * CELL);
    let opts = EncodeOptions::default();
    let first = build_save(&state, region, &reg, &opts).unwrap();

    let mut decoded = SimulationState::new();
    let decode_opts = DecodeOptions {
        session_metadata: true,
        ..DecodeOptions::default()
    };
    parse_save(&first, 0, 0, &mut decoded, &reg, &decode_opts).unwrap();

    let second = build_save(&decoded, region, &reg, &opts).unwrap();
    assert_eq!(first, second, "encode(decode(encode(s))) must be stable");
}

// ---------------------------------------------------------------------------
// Soap links
// ---------------------------------------------------------------------------

#[test]
fn soap_links_resolve_through_save_indices() {
    let reg = registry();
    let mut state = SimulationState::new();
    // Park the pair at high live indices so decode relocates them.
    state.parts[100] = {
        let mut p = particle(ids::SOAP, 1.0, 1.0);
        p.ctype = 2;
        p.tmp = 200;
        p
    };
    state.parts[200] = {
        let mut p = particle(ids::SOAP, 2.0, 1.0);
        p.ctype = 4;
        p.tmp2 = 100;
        p
    };

    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let mut out = SimulationState::new();
    parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();

    let soaps: Vec<usize> = out
        .parts
        .iter()
        .enumerate()
        .filter(|(_, p)| p.ptype == ids::SOAP)
        .map(|(k, _)| k)
        .collect();
    assert_eq!(soaps.len(), 2);
    let (a, b) = (soaps[0], soaps[1]);
    // Forward link from a to b, back link from b to a, at the new
    // positions in the live array.
    assert_ne!(out.parts[a].ctype & 2, 0);
    assert_eq!(out.parts[a].tmp, b as i32);
    assert_ne!(out.parts[b].ctype & 4, 0);
    assert_eq!(out.parts[b].tmp2, a as i32);
}

// ---------------------------------------------------------------------------
// Moving solids and animations
// ---------------------------------------------------------------------------

#[test]
fn moving_solid_groups_renumber_on_load() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.moving_solids = vec![
        MovingSolid::default(),
        MovingSolid::default(),
        MovingSolid {
            rotation: 1.0,
            particle_count: 1,
            centre: 1,
        },
    ];
    state.parts[0] = {
        let mut p = particle(ids::MOVS, 1.0, 1.0);
        p.tmp2 = 2;
        p.pavg = [3.0, -4.0];
        p
    };

    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let mut out = SimulationState::new();
    parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();

    let parts = live(&out);
    assert_eq!(parts.len(), 1);
    let p = parts[0];
    assert_eq!(p.ptype, ids::MOVS);
    // Group renumbered to the first free slot of the fresh simulation.
    assert_eq!(p.tmp2, 0);
    assert_eq!(out.moving_solids.len(), 1);
    assert!((out.moving_solids[0].rotation - 1.0).abs() < 0.06);
    assert_eq!(out.moving_solids[0].particle_count, 1);
    // Negative pressure averages survive the biased wire form.
    assert_eq!(p.pavg, [3.0, -4.0]);
}

#[test]
fn animation_frames_round_trip_and_clamp() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = {
        let mut p = particle(ids::ANIM, 1.0, 1.0);
        p.ctype = 2;
        p.animations = Some(vec![0xFF000001, 0xFF000002, 0xFF000003, 0xFF000004]);
        p
    };

    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let mut out = SimulationState::new();
    parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();

    let parts = live(&out);
    let p = parts[0];
    assert_eq!(p.ctype, 2);
    let frames = p.animations.as_ref().unwrap();
    assert_eq!(frames.len(), dustbox_save::document::MAX_ANIM_FRAMES);
    assert_eq!(&frames[..3], &[0xFF000001, 0xFF000002, 0xFF000003]);
    assert!(frames[3..].iter().all(|&f| f == 0));
}

// ---------------------------------------------------------------------------
// Minimum reader version
// ---------------------------------------------------------------------------

#[test]
fn minimum_version_stays_at_baseline_for_plain_content() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = particle(ids::DUST, 1.0, 1.0);
    state.parts[1] = particle(ids::WATR, 2.0, 1.0);
    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(
        minimum_version_of(&blob),
        dustbox_save::document::MINIMUM_VERSION_BASELINE
    );
}

#[test]
fn minimum_version_escalates_for_newer_features() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = particle(ids::HEAC, 1.0, 1.0);
    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(minimum_version_of(&blob), (92, 0));

    let mut state = SimulationState::new();
    state.parts[0] = {
        let mut p = particle(ids::NWHL, 1.0, 1.0);
        p.tmp = 1;
        p
    };
    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(minimum_version_of(&blob), (91, 5));
}

// ---------------------------------------------------------------------------
// Boundaries
// ---------------------------------------------------------------------------

#[test]
fn full_bounds_save_decodes_without_clipping() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = particle(ids::DUST, 0.0, 0.0);
    state.parts[1] = particle(ids::DUST, (XRES - 1) as f32, (YRES - 1) as f32);
    let blob = build_save(&state, Region::full(), &reg, &EncodeOptions::default()).unwrap();
    assert_eq!(blob[6] as i32, BLOCK_W);
    assert_eq!(blob[7] as i32, BLOCK_H);

    let mut out = SimulationState::new();
    let report = parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();
    assert_eq!((report.block_w, report.block_h), (BLOCK_W, BLOCK_H));
    let parts = live(&out);
    assert_eq!(parts.len(), 2);
    assert!(parts
        .iter()
        .any(|p| (p.x, p.y) == ((XRES - 1) as f32, (YRES - 1) as f32)));
}

#[test]
fn save_one_cell_larger_than_bounds_is_rejected() {
    let reg = registry();
    let state = SimulationState::new();
    let mut blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    blob[6] = (BLOCK_W + 1) as u8;
    let mut out = SimulationState::new();
    let err = parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, DecodeError::SaveTooLarge { .. }));

    // Pasting a fitting save at an offset that pushes it out also fails.
    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let err = parse_save(
        &blob,
        XRES - CELL + CELL, // one block past the last column
        0,
        &mut out,
        &reg,
        &DecodeOptions::default(),
    );
    assert!(err.is_err() || out.parts.iter().all(|p| p.is_empty()));
}

// ---------------------------------------------------------------------------
// Replace modes
// ---------------------------------------------------------------------------

#[test]
fn partial_replace_keeps_global_flags() {
    let reg = registry();
    let mut source = SimulationState::new();
    source.flags.paused = true;
    source.flags.gravity_mode = 2;
    source.parts[0] = particle(ids::DUST, 1.0, 1.0);
    let blob = build_save(
        &source,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();

    let mut target = SimulationState::new();
    target.flags.paused = false;
    target.flags.gravity_mode = 1;
    let opts = DecodeOptions {
        replace: ReplaceMode::Partial,
        ..DecodeOptions::default()
    };
    parse_save(&blob, 0, 0, &mut target, &reg, &opts).unwrap();
    assert!(!target.flags.paused);
    assert_eq!(target.flags.gravity_mode, 1);
    assert_eq!(live(&target).len(), 1);

    let mut target = SimulationState::new();
    parse_save(&blob, 0, 0, &mut target, &reg, &DecodeOptions::default()).unwrap();
    assert!(target.flags.paused);
    assert_eq!(target.flags.gravity_mode, 2);
}

#[test]
fn partial_replace_merges_onto_existing_state() {
    let reg = registry();
    let mut source = SimulationState::new();
    source.parts[0] = particle(ids::WATR, 1.0, 1.0);
    let blob = build_save(
        &source,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();

    let mut target = SimulationState::new();
    target.parts[0] = particle(ids::STNE, 100.0, 50.0);
    target.rebuild_indices();
    let opts = DecodeOptions {
        replace: ReplaceMode::Partial,
        ..DecodeOptions::default()
    };
    parse_save(&blob, 0, 0, &mut target, &reg, &opts).unwrap();
    let parts = live(&target);
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().any(|p| p.ptype == ids::STNE));
    assert!(parts.iter().any(|p| p.ptype == ids::WATR));
}

// ---------------------------------------------------------------------------
// Signs
// ---------------------------------------------------------------------------

#[test]
fn excess_signs_are_dropped_on_decode() {
    let reg = registry();
    let mut state = SimulationState::new();
    for i in 0..(MAX_SIGNS + 4) {
        state
            .signs
            .push(Sign::new(&format!("s{i}"), 1, 1, Justification::Left));
    }
    let blob = build_save(
        &state,
        Region::new(0, 0, CELL, CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let mut out = SimulationState::new();
    parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();
    assert_eq!(out.signs.len(), MAX_SIGNS);
}

// ---------------------------------------------------------------------------
// Session metadata and authorship
// ---------------------------------------------------------------------------

#[test]
fn session_metadata_and_authors_round_trip() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = particle(ids::DUST, 1.0, 1.0);

    let info = dustbox_save::SaveInfo {
        save_opened: true,
        save_name: "demo".into(),
        author: "someone".into(),
        ..Default::default()
    };
    let authors = serde_json::json!({ "id": 9, "username": "someone" });
    let opts = EncodeOptions {
        session: Some(info.clone()),
        authors: Some(authors),
        ..EncodeOptions::default()
    };
    let blob = build_save(&state, Region::new(0, 0, CELL, CELL), &reg, &opts).unwrap();

    let mut out = SimulationState::new();
    let decode_opts = DecodeOptions {
        session_metadata: true,
        ..DecodeOptions::default()
    };
    let report = parse_save(&blob, 0, 0, &mut out, &reg, &decode_opts).unwrap();
    assert_eq!(report.save_info.as_ref(), Some(&info));
    let authors = report.authors.unwrap();
    assert_eq!(authors["id"], serde_json::json!(9));
    assert_eq!(authors["username"], serde_json::json!("someone"));

    // Without the session option the metadata is not surfaced.
    let mut out = SimulationState::new();
    let report =
        parse_save(&blob, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();
    assert!(report.save_info.is_none());
}

// ---------------------------------------------------------------------------
// Scenario: transform
// ---------------------------------------------------------------------------

#[test]
fn rotating_a_save_180_degrees_mirrors_positions_and_velocities() {
    let reg = registry();
    let mut state = SimulationState::new();
    let (w, h) = (2 * CELL, 2 * CELL);
    let mut a = particle(ids::DUST, 1.0, 2.0);
    a.vx = 0.5;
    a.vy = -0.25;
    state.parts[0] = a;
    state.parts[1] = particle(ids::WATR, 6.0, 5.0);

    let blob = build_save(
        &state,
        Region::new(0, 0, w, h),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let rotated = dustbox_save::transform_save(
        &blob,
        &reg,
        [[-1.0, 0.0], [0.0, -1.0]],
        (0.0, 0.0),
    )
    .unwrap();

    let mut out = SimulationState::new();
    parse_save(&rotated, 0, 0, &mut out, &reg, &DecodeOptions::default()).unwrap();
    let parts = live(&out);
    assert_eq!(parts.len(), 2);

    let expected: Vec<(i32, f32, f32)> = vec![
        (ids::DUST, (w - 1 - 1) as f32, (h - 1 - 2) as f32),
        (ids::WATR, (w - 1 - 6) as f32, (h - 1 - 5) as f32),
    ];
    for (ptype, ex, ey) in expected {
        let p = parts.iter().find(|p| p.ptype == ptype).unwrap();
        assert_eq!((p.x, p.y), (ex, ey), "element {ptype} position");
    }
    let dust = parts.iter().find(|p| p.ptype == ids::DUST).unwrap();
    assert!((dust.vx + 0.5).abs() <= 1.0 / 16.0);
    assert!((dust.vy - 0.25).abs() <= 1.0 / 16.0);
}

#[test]
fn transform_is_deterministic() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = particle(ids::DUST, 3.0, 3.0);
    let blob = build_save(
        &state,
        Region::new(0, 0, 2 * CELL, 2 * CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();
    let m = [[0.0, -1.0], [1.0, 0.0]];
    let once = dustbox_save::transform_save(&blob, &reg, m, (0.0, 0.0)).unwrap();
    let twice = dustbox_save::transform_save(&blob, &reg, m, (0.0, 0.0)).unwrap();
    assert_eq!(once, twice);
}

// ---------------------------------------------------------------------------
// Thumbnails
// ---------------------------------------------------------------------------

#[test]
fn preview_renders_element_colors_without_state_mutation() {
    let reg = registry();
    let mut state = SimulationState::new();
    state.parts[0] = particle(ids::DUST, 5.0, 5.0);
    state.walls[SimulationState::cell_index(2, 0)] = walls::WALL;
    let blob = build_save(
        &state,
        Region::new(0, 0, 4 * CELL, 4 * CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap();

    let img = dustbox_save::thumbnail::prerender(&blob, &reg).unwrap();
    assert_eq!((img.width, img.height), (4 * CELL, 4 * CELL));
    assert_eq!(img.get(5, 5), reg.colour(ids::DUST));

    // Corrupt geometry must produce no image, not an error.
    let mut broken = blob.clone();
    broken.truncate(30);
    assert!(dustbox_save::thumbnail::prerender(&broken, &reg).is_none());
}

// ---------------------------------------------------------------------------
// Corruption resilience
// ---------------------------------------------------------------------------

fn truncation_fixture() -> Vec<u8> {
    let reg = registry();
    let mut state = SimulationState::new();
    for i in 0..20 {
        state.parts[i] = particle(ids::DUST, (i % 8) as f32, (i / 8) as f32);
    }
    state.walls[0] = walls::WALL;
    state.signs.push(Sign::new("t", 1, 1, Justification::Left));
    build_save(
        &state,
        Region::new(0, 0, 2 * CELL, 2 * CELL),
        &reg,
        &EncodeOptions::default(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn truncating_at_any_offset_errors_cleanly(cut in 0usize..4096) {
        let blob = truncation_fixture();
        let cut = cut % blob.len();
        let reg = registry();
        let mut state = SimulationState::new();
        let result = parse_save(
            &blob[..cut],
            0,
            0,
            &mut state,
            &reg,
            &DecodeOptions::default(),
        );
        prop_assert!(result.is_err());
    }
}
