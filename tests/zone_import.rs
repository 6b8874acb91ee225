mod common;

use std::cell::RefCell;

use glam::Vec3;
use rose_zone_import::{
    import_zone, resolver::LIST_ZONE_PATH, CancelFlag, Cancelled, DiagnosticKind, ErrorKind,
    ImportOptions, ImportPhase, ZoneImporter,
};

use common::{triangle_zms, write_file, write_him, ZoneFixture};

fn options() -> ImportOptions {
    ImportOptions {
        load_textures: false,
        ..Default::default()
    }
}

#[test]
fn single_tile_zone() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    let scene = import_zone(&fixture.zone_path(), &options()).unwrap();

    let terrain = &scene.terrain;
    assert_eq!((terrain.width, terrain.height), (65, 65));
    assert_eq!(terrain.tile_min, (31, 31));
    assert!(terrain.heights.iter().all(|&height| height == 32767));
    assert_eq!(terrain.anchor_xy.x, -24000.0);
    assert_eq!(terrain.anchor_xy.y, -24000.0);
    assert_eq!(terrain.patches.len(), 16 * 16);

    assert_eq!(terrain.layers.len(), 1);
    let painted = terrain.layers[0].weights.iter().filter(|&&weight| weight == 255).count();
    assert_eq!(painted, 64 * 64);

    assert_eq!(scene.instances.len(), 1);
    assert_eq!(scene.buckets.len(), 1);
    assert_eq!(scene.buckets[0].instance_count, 1);
    let instance = &scene.instances[0];
    assert_eq!(instance.transform.translation, Vec3::new(5200.0, -5200.0, 100.0));
    assert_eq!(scene.meshes[instance.mesh_id].path, "3DDATA/JUNON/TREE01.ZMS");
    assert_eq!(scene.meshes[instance.mesh_id].vertex_count(), 3);

    assert_eq!(scene.animated.len(), 1);
    let animated = &scene.animated[0];
    assert_eq!(animated.transform.translation, Vec3::new(5300.0, -5200.0, 0.0));
    let animation = &scene.animations[animated.anim_id.unwrap()];
    assert_eq!(animation.frame_count, 2);
    assert_eq!(animation.fps, 10);
    assert_eq!(animation.tracks.len(), 1);
}

#[test]
fn four_by_four_zone_merges_into_one_grid() {
    let tiles: Vec<_> = (30..34)
        .flat_map(|y| (30..34).map(move |x| (x, y)))
        .collect();
    let fixture = ZoneFixture::new(&tiles);
    write_file(&fixture.zone_directory(), "33_33.HIM", write_him(25600.0));

    let scene = import_zone(&fixture.zone_path(), &options()).unwrap();
    let terrain = &scene.terrain;
    assert_eq!((terrain.width, terrain.height), (257, 257));
    assert_eq!(terrain.tile_min, (30, 30));
    assert_eq!(terrain.tile_max, (33, 33));
    assert_eq!(terrain.anchor_xy.x, -40000.0);
    assert_eq!(terrain.heights.len(), 257 * 257);
    assert_eq!(terrain.heights[257 * 257 - 1], 65535);
    assert_eq!(terrain.heights[0], 32767);
    assert_eq!(terrain.patches.len(), 64 * 64);
    assert_eq!(scene.instances.len(), 1);
}

#[test]
fn imports_are_reproducible() {
    let fixture = ZoneFixture::new(&[(31, 31), (32, 31)]);
    let first = import_zone(&fixture.zone_path(), &ImportOptions::default()).unwrap();
    let second = import_zone(&fixture.zone_path(), &ImportOptions::default()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn corrupt_mesh_aborts_import() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    write_file(fixture.root.path(), "3DData/JUNON/TREE01.ZMS", b"ZMS9999\0".to_vec());

    let error = import_zone(&fixture.zone_path(), &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::BadMagic);
    assert!(error
        .path
        .as_deref()
        .is_some_and(|path| path.ends_with("3DDATA/JUNON/TREE01.ZMS")));
}

#[test]
fn corrupt_texture_aborts_import() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    write_file(fixture.root.path(), "3DData/JUNON/TREE01.DDS", b"DDS ".to_vec());

    let error = import_zone(&fixture.zone_path(), &ImportOptions::default()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Truncated);
}

#[test]
fn meshes_are_found_below_asset_roots() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    fixture.remove("3DData/JUNON/TREE01.ZMS");
    write_file(fixture.root.path(), "3DData/AVATAR/TREE01.ZMS", triangle_zms());

    let scene = import_zone(&fixture.zone_path(), &options()).unwrap();
    assert_eq!(scene.instances.len(), 1);
    assert_eq!(
        scene.meshes[scene.instances[0].mesh_id].path,
        "3DDATA/AVATAR/TREE01.ZMS"
    );
}

#[test]
fn distant_tiles_are_out_of_range() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    write_file(&fixture.zone_directory(), "2000000_31.HIM", write_him(0.0));

    let error = import_zone(&fixture.zone_path(), &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::OutOfRange);
}

#[test]
fn zone_without_tiles_is_out_of_range() {
    let fixture = ZoneFixture::new(&[]);
    let error = import_zone(&fixture.zone_path(), &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::OutOfRange);
}

#[test]
fn missing_zone_file() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    fixture.remove("3DData/MAPS/JUNON/JDT01/JDT01.ZON");
    let error = import_zone(&fixture.zone_path(), &options()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::PathNotFound);
}

#[test]
fn missing_zone_list_keeps_terrain() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    fixture.remove("3DData/STB/LIST_ZONE.STB");

    let scene = import_zone(&fixture.zone_path(), &options()).unwrap();
    assert_eq!(scene.terrain.width, 65);
    assert!(scene.instances.is_empty());
    assert!(scene.animated.is_empty());
    assert!(scene.diagnostics.iter().any(|diagnostic| {
        diagnostic.kind == DiagnosticKind::MissingFile
            && diagnostic.path.as_deref() == Some(LIST_ZONE_PATH)
    }));
}

#[test]
fn missing_tile_map_and_objects_are_diagnostics() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    fixture.remove("3DData/MAPS/JUNON/JDT01/31_31.TIL");
    fixture.remove("3DData/MAPS/JUNON/JDT01/31_31.IFO");

    let scene = import_zone(&fixture.zone_path(), &options()).unwrap();
    assert!(scene.instances.is_empty());
    assert!(scene.terrain.layers.iter().all(|layer| layer.weights.iter().all(|&w| w == 0)));
    let missing = scene
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.kind == DiagnosticKind::MissingFile)
        .count();
    assert!(missing >= 2);
}

#[test]
fn missing_mesh_drops_its_instances() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    fixture.remove("3DData/JUNON/TREE01.ZMS");

    let scene = import_zone(&fixture.zone_path(), &options()).unwrap();
    assert!(scene.instances.is_empty());
    assert!(scene.diagnostics.iter().any(|diagnostic| {
        diagnostic.kind == DiagnosticKind::MissingFile
            && diagnostic.path.as_deref() == Some("3DDATA/JUNON/TREE01.ZMS")
    }));
}

#[test]
fn animations_can_be_skipped() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    let scene = import_zone(
        &fixture.zone_path(),
        &ImportOptions {
            load_animations: false,
            ..options()
        },
    )
    .unwrap();
    assert_eq!(scene.animated.len(), 1);
    assert_eq!(scene.animated[0].anim_id, None);
    assert!(scene.animations.is_empty());
}

#[test]
fn progress_reports_every_phase_in_order() {
    let fixture = ZoneFixture::new(&[(31, 31), (32, 31)]);
    let phases = RefCell::new(Vec::new());
    let mut progress = |phase: ImportPhase, fraction: f32| -> Result<(), Cancelled> {
        assert!((0.0..=1.0).contains(&fraction));
        let mut phases = phases.borrow_mut();
        if phases.last() != Some(&phase) {
            phases.push(phase);
        }
        Ok(())
    };

    ZoneImporter::new(options())
        .import(&fixture.zone_path(), &mut progress)
        .unwrap();
    assert_eq!(
        phases.into_inner(),
        vec![
            ImportPhase::Loading,
            ImportPhase::Terrain,
            ImportPhase::Placing,
            ImportPhase::Finalizing
        ]
    );
}

#[test]
fn progress_callback_cancels() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    let mut progress = |phase: ImportPhase, _: f32| {
        if phase == ImportPhase::Placing {
            Err(Cancelled)
        } else {
            Ok(())
        }
    };

    let error = ZoneImporter::new(options())
        .import(&fixture.zone_path(), &mut progress)
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Cancelled);
}

#[test]
fn cancel_flag_stops_import() {
    let fixture = ZoneFixture::new(&[(31, 31)]);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let error = ZoneImporter::new(options())
        .with_cancel_flag(cancel)
        .import(&fixture.zone_path(), &mut rose_zone_import::NoProgress)
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Cancelled);
}
