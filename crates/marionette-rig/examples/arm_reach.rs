//! A three-bone arm reaching for a handful of targets.
//!
//! Run with `cargo run --example arm_reach`.

use glam::Vec2;
use marionette_rig::{
    Bone, BoneId, IkChain, IkConfig, Skeleton, solve_analytical, solve_fabrik,
};

fn main() {
    let mut skeleton = Skeleton::new();
    let ids = [BoneId(0), BoneId(1), BoneId(2)];
    skeleton.add_bone(Bone::new(ids[0], "shoulder").with_length(60.0), None);
    skeleton.add_bone(Bone::new(ids[1], "elbow").with_length(50.0), Some(ids[0]));
    skeleton.add_bone(Bone::new(ids[2], "wrist").with_length(30.0), Some(ids[1]));
    skeleton.update_world_transform();

    let chain = IkChain::new(ids.to_vec());
    let config = IkConfig::default();
    let targets = [
        Vec2::new(120.0, 40.0),
        Vec2::new(30.0, 100.0),
        Vec2::new(-60.0, 80.0),
        Vec2::new(400.0, 0.0), // out of reach
    ];

    println!("FABRIK over a {}-bone chain:", chain.len());
    for target in targets {
        let result = solve_fabrik(&mut skeleton, &chain, target, &config, None);
        skeleton.update_world_transform();
        let tip = skeleton.bone(ids[2]).unwrap().tail_world();
        println!(
            "  target ({:7.1}, {:7.1}) -> tip ({:7.1}, {:7.1}) after {} iteration(s), reached: {}",
            target.x, target.y, tip.x, tip.y, result.iterations, result.reached
        );
    }

    // The first two bones also form a two-bone chain the closed-form
    // solver can place directly.
    let target = Vec2::new(70.0, 30.0);
    skeleton.bone_mut(ids[2]).unwrap().rotation = 0.0;
    solve_analytical(&mut skeleton, ids[0], ids[1], target);
    skeleton.update_world_transform();
    let elbow_tip = skeleton.bone(ids[1]).unwrap().tail_world();
    println!(
        "analytical: target ({:.1}, {:.1}) -> elbow tip ({:.1}, {:.1})",
        target.x, target.y, elbow_tip.x, elbow_tip.y
    );
}
