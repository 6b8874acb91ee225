mod common;

use glam::Vec3;
use rose_zone_import::{import_character, ImportOptions};

use common::{write_file, write_zmd, write_zmo, write_zms};

fn character_root() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();

    // The head is listed before the neck it hangs from
    write_file(
        root.path(),
        "3DData/AVATAR/MALE.ZMD",
        write_zmd(&[
            ("b1_pelvis", -1, [0.0, 0.0, 1.0]),
            ("b1_head", 2, [0.0, 0.0, 0.25]),
            ("b1_neck", 0, [0.0, 0.0, 0.5]),
        ]),
    );
    write_file(
        root.path(),
        "3DData/AVATAR/HAIR/HAIR01.ZMS",
        write_zms(
            &[[0.0; 3], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]],
            &[],
            &[],
            &[0, 1, 2],
        ),
    );
    write_file(
        root.path(),
        "3DData/AVATAR/BODY/BODY01.ZMS",
        write_zms(
            &[[0.0; 3], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]],
            &[0, 1],
            &[
                ([1.0, 0.0, 0.0, 0.0], [0, 0, 0, 0]),
                ([0.5, 0.5, 0.0, 0.0], [0, 1, 0, 0]),
                ([1.0, 0.0, 0.0, 0.0], [1, 0, 0, 0]),
            ],
            &[0, 1, 2],
        ),
    );
    write_file(
        root.path(),
        "3DData/MOTION/NOD.ZMO",
        write_zmo(
            30,
            &[(2, 1), (2, 7)],
            &[
                vec![0.0, 0.0, 1.7, 5.0, 5.0, 5.0],
                vec![0.0, 0.0, 1.8, 5.0, 5.0, 5.0],
            ],
        ),
    );
    root
}

#[test]
fn character_parts_bind_to_one_skeleton() {
    let root = character_root();
    let character = import_character(
        root.path(),
        "3DDATA/AVATAR/MALE.ZMD",
        &["3DDATA/AVATAR/HAIR/HAIR01.ZMS", "3DDATA/AVATAR/BODY/BODY01.ZMS"],
        &["3DDATA/MOTION/NOD.ZMO"],
        &ImportOptions::default(),
    )
    .unwrap();

    let skeleton = &character.skeleton;
    let names: Vec<_> = skeleton.bones.iter().map(|bone| bone.name.as_str()).collect();
    assert_eq!(names, vec!["b1_pelvis", "b1_neck", "b1_head"]);
    assert_eq!(skeleton.remap, vec![Some(0), Some(2), Some(1)]);
    assert_eq!(skeleton.bones[2].parent, Some(1));
    assert_eq!(
        skeleton.bones[2].world.translation,
        Vec3::new(0.0, 0.0, 1.75)
    );

    let mesh = &character.mesh;
    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.sections.len(), 2);

    // Hair is rigid and follows the head
    for vertex in 0..3 {
        assert_eq!(mesh.skin[vertex].len(), 1);
        assert_eq!(mesh.skin[vertex][0].bone, 2);
        assert_eq!(mesh.skin[vertex][0].weight, 1.0);
    }
    assert_eq!(mesh.positions[0], Vec3::new(0.0, 0.0, 1.75));

    // Body bone 1 is the head in the file, emitted as bone 2
    assert_eq!(mesh.skin[3][0].bone, 0);
    assert_eq!(mesh.skin[4].len(), 2);
    assert_eq!(mesh.skin[4][1].bone, 2);
    assert_eq!(mesh.skin[5][0].bone, 2);

    assert_eq!(character.animations.len(), 1);
    let animation = &character.animations[0];
    assert_eq!(animation.frame_count, 2);
    assert_eq!(animation.tracks.len(), 1);
    assert_eq!(animation.tracks[0].bone, 2);
    assert!(character.diagnostics.is_empty());
}

#[test]
fn motions_can_be_skipped() {
    let root = character_root();
    let character = import_character(
        root.path(),
        "3DDATA/AVATAR/MALE.ZMD",
        &["3DDATA/AVATAR/BODY/BODY01.ZMS"],
        &["3DDATA/MOTION/NOD.ZMO"],
        &ImportOptions {
            load_animations: false,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(character.animations.is_empty());
    assert_eq!(character.mesh.vertex_count(), 3);
}
