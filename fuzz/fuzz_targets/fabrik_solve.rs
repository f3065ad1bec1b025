#![no_main]

use glam::Vec2;
use libfuzzer_sys::fuzz_target;
use marionette_rig::{Bone, BoneId, IkChain, IkConfig, Skeleton, solve_fabrik};

// Solving any finite chain must neither panic nor write non-finite
// rotations or world positions.
fuzz_target!(|data: (Vec<(f32, f32)>, (f32, f32))| {
    let (bones, (tx, ty)) = data;
    if bones.is_empty() || bones.len() > 32 {
        return;
    }
    if !tx.is_finite() || !ty.is_finite() {
        return;
    }

    let mut skeleton = Skeleton::new();
    let mut ids = Vec::with_capacity(bones.len());
    let mut parent = None;
    for (i, (length, rotation)) in bones.into_iter().enumerate() {
        if !length.is_finite() || !rotation.is_finite() {
            return;
        }
        let id = BoneId(i as u32);
        skeleton.add_bone(
            Bone::new(id, "bone")
                .with_length(length.abs().min(1e6))
                .with_rotation(rotation % std::f32::consts::TAU),
            parent,
        );
        ids.push(id);
        parent = Some(id);
    }
    skeleton.update_world_transform();

    let chain = IkChain::new(ids.clone());
    let target = Vec2::new(tx.clamp(-1e6, 1e6), ty.clamp(-1e6, 1e6));
    solve_fabrik(&mut skeleton, &chain, target, &IkConfig::default(), None);

    skeleton.update_world_transform();
    for id in ids {
        let bone = skeleton.bone(id).unwrap();
        assert!(bone.rotation.is_finite());
        assert!(bone.world_position.is_finite());
    }
});
