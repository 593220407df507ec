use std::collections::HashSet;

use stimforge::binding::{Bindings, BootContext};
use stimforge::component::modulation::Cosine;
use stimforge::component::motion::{Crossing, Linear};
use stimforge::component::pif::{SineGrating, Solid, Spot};
use stimforge::component::warp::OnElectrodes;
use stimforge::component::{Modulation, Motion, Pif, TimeWarp, Warp};
use stimforge::controls::ControlSet;
use stimforge::program::PassProgram;
use stimforge::stimulus::{Duration, SingleShape};
use stimforge::types::{EventLog, SequenceInfo, SourceLocation};
use stimforge::validation::{validate_glsl, ShaderStage};

fn apply_root(pif: &Pif, program: &mut PassProgram) {
    let controls = ControlSet::new();
    let mut bindings = Bindings::default();
    let mut log = EventLog::default();
    let mut ctx = BootContext {
        controls: &controls,
        bindings: &mut bindings,
        log: &mut log,
        time_s: 0.0,
    };
    pif.apply(program, &mut ctx, "fig", &SourceLocation::new("pass.pif"))
        .unwrap_or_else(|e| panic!("apply failed: {e:#}"));
}

fn deep_tree() -> Pif {
    Pif::from(Spot::default())
        .warped(Warp::OnElectrodes(OnElectrodes::default()))
        .moved(Motion::from(Linear::default()))
        .mix(
            Pif::from(SineGrating::default()).time_warped(TimeWarp::Loop { period_s: 2.0 }),
            Solid { color: 0.25.into() },
        )
        .modulated(Modulation::from(Cosine::default()))
}

#[test]
fn every_tree_node_is_emitted_exactly_once() {
    let mut program = PassProgram::new(&SequenceInfo::default(), 2.0);
    apply_root(&deep_tree(), &mut program);
    let order = program.function_order();
    let unique: HashSet<&String> = order.iter().collect();
    assert_eq!(unique.len(), order.len(), "duplicate names in {order:?}");
    assert_eq!(order.len(), program.functions().len());
}

#[test]
fn children_are_emitted_before_their_parents() {
    let mut program = PassProgram::new(&SequenceInfo::default(), 2.0);
    apply_root(&deep_tree(), &mut program);
    let order = program.function_order();
    // A name extending another with '_' names a descendant in the tree, and
    // the emitted program must define it before its caller.
    for (parent_index, parent) in order.iter().enumerate() {
        for (child_index, child) in order.iter().enumerate() {
            if child.starts_with(&format!("{parent}_")) {
                assert!(
                    child_index < parent_index,
                    "{child} emitted after {parent}: {order:?}"
                );
            }
        }
    }
}

#[test]
fn composites_use_their_fixed_child_suffixes() {
    let mut program = PassProgram::new(&SequenceInfo::default(), 2.0);
    let tree = Pif::from(Spot::default())
        .moved(Motion::default())
        .warped(Warp::default())
        .time_warped(TimeWarp::Delay { delay_s: 0.5 })
        .modulated(Modulation::default())
        .mix(Solid::default(), Solid::default());
    apply_root(&tree, &mut program);
    let mut order = program.function_order().to_vec();
    order.sort();
    assert_eq!(
        order,
        [
            "fig",
            "fig_background",
            "fig_foreground",
            "fig_shape",
            "fig_shape_modulated",
            "fig_shape_modulated_warp",
            "fig_shape_modulated_warped",
            "fig_shape_modulated_warped_warp",
            "fig_shape_modulated_warped_warped",
            "fig_shape_modulated_warped_warped_moved",
            "fig_shape_modulated_warped_warped_pose",
            "fig_shape_modulator",
        ]
    );
}

#[test]
fn arithmetic_composites_call_their_operands() {
    let tree = (Pif::from(Solid::default()) + Pif::from(SineGrating::default()))
        * Pif::from(Solid { color: 0.5.into() });
    let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
    apply_root(&tree, &mut program);
    assert_eq!(
        program.functions()["fig"],
        "vec3 fig (vec2 x, float time){\n    return fig_op1(x, time) * fig_op2(x, time);\n}\n"
    );
    assert!(
        program.functions()["fig_op1"]
            .contains("fig_op1_op1(x, time) + fig_op1_op2(x, time)"),
        "{}",
        program.functions()["fig_op1"]
    );
}

#[test]
fn a_deep_tree_assembles_into_valid_glsl() {
    let stimulus = stimforge::stimulus::Generic {
        duration: Duration::Seconds(2.0),
        pif: deep_tree(),
        ..Default::default()
    }
    .boot(
        &SequenceInfo::default(),
        ControlSet::new(),
        &SourceLocation::new("pass"),
    )
    .unwrap_or_else(|e| panic!("boot failed: {e:#}"));

    let fragment = stimulus.program.fragment_source();
    validate_glsl(&fragment, ShaderStage::Fragment)
        .unwrap_or_else(|e| panic!("fragment did not validate: {e:#}"));
    let vertex = stimulus.program.vertex_source();
    validate_glsl(&vertex, ShaderStage::Vertex)
        .unwrap_or_else(|e| panic!("vertex did not validate: {e:#}"));
}

#[test]
fn a_crossing_grows_the_pass_to_cover_the_travel() {
    let recipe = SingleShape {
        duration: Duration::Seconds(1.0),
        shape_motion: Motion::from(Crossing::default()),
        ..SingleShape::default()
    };
    let seq = SequenceInfo {
        frame_interval_s: 0.01,
        ..SequenceInfo::default()
    };
    let stimulus = recipe
        .boot(&seq, ControlSet::new(), &SourceLocation::new("pass"))
        .unwrap();
    // travel spans the 2000 um field plus the 50 um default shape length at
    // 100 um/s, in 10 ms frames
    assert_eq!(stimulus.program.duration_frames(), 2051);
    assert_eq!(
        stimulus.program.vectors()["fig_modulated_shape_pose_startPosition"],
        [-1025.0, 0.0]
    );
}
