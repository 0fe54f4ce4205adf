use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::DVector;

use zdisk::{first_step, verlet_position, IntegratorState, PositionVerlet};
use zdisk::{Acceleration, AccelSet, PairwiseGravity, PotentialModel, System};
use zdisk::{BodiesConfig, ForceLawCache, Scenario, ScenarioConfig, SimError};
use zdisk::{KM_PER_PC, KM_PER_PC_DERIVATION};

/// Scenario with the given bodies and the reference disk parameters
pub fn config_with(m: &[f64], x: &[f64], z: &[f64], v: &[f64], background: bool) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::default_disk();
    cfg.engine.background = background;
    cfg.bodies = BodiesConfig {
        m: m.to_vec(),
        x: x.to_vec(),
        z: z.to_vec(),
        v: v.to_vec(),
    };
    cfg
}

/// Two bodies of different mass with no background term
pub fn isolated_pair(iterations: i64) -> ScenarioConfig {
    let mut cfg = config_with(&[300.0, 100.0], &[0.0, 1.0], &[-5.0, 5.0], &[0.0, 0.0], false);
    cfg.parameters.h0 = 1.0e13;
    cfg.parameters.iterations = iterations;
    cfg
}

pub fn build(cfg: ScenarioConfig) -> Scenario {
    Scenario::build_scenario(cfg).expect("valid scenario")
}

// ==================================================================================
// Force law tests
// ==================================================================================

#[test]
fn pair_law_matches_closed_form() {
    let s = build(ScenarioConfig::default_disk());
    let g = s.parameters.G;

    let (x1, x2, z1, z2, m) = (10.0_f64, 40.0_f64, -30.0_f64, 30.0_f64, 300.0_f64);
    let r = ((x2 - x1) * (x2 - x1) + (z2 - z1) * (z2 - z1)).sqrt();
    let expected = g * m * (z2 - z1) / r.powi(3) / KM_PER_PC_DERIVATION;

    assert_relative_eq!(s.law.pair_accel(x1, x2, z1, z2, m), expected, max_relative = 1e-12);
}

#[test]
fn background_law_matches_closed_form() {
    let s = build(ScenarioConfig::default_disk());
    let p = &s.parameters;

    let (x, z) = (30.0_f64, 10.0_f64);
    let w = (z * z + p.b * p.b).sqrt();
    let r = (x * x + (w + p.a) * (w + p.a)).sqrt();
    let expected = -p.G * p.background_mass / (r * r) * ((w + p.a) / r) * (z / w) / KM_PER_PC_DERIVATION;

    assert_relative_eq!(s.law.background_accel(x, z), expected, max_relative = 1e-12);
}

#[test]
fn potentials_evaluate_to_closed_form() {
    let model = PotentialModel {
        G: 4.3009e-3,
        background_mass: 125000.0,
        a: 2700.0,
        b: 200.0,
    };

    let pair = model.two_body().compile().unwrap();
    let r = (30.0_f64 * 30.0 + 40.0 * 40.0).sqrt();
    assert_relative_eq!(pair.eval(&[10.0, 40.0, -10.0, 30.0, 200.0]), -model.G * 200.0 / r, max_relative = 1e-12);

    let background = model.background().compile().unwrap();
    let w = (50.0_f64 * 50.0 + 200.0 * 200.0).sqrt();
    let big_r = (20.0_f64 * 20.0 + (w + 2700.0) * (w + 2700.0)).sqrt();
    assert_relative_eq!(
        background.eval(&[20.0, 50.0]),
        -model.G * model.background_mass / big_r,
        max_relative = 1e-12
    );
}

#[test]
fn background_pulls_toward_midplane() {
    let s = build(ScenarioConfig::default_disk());
    assert!(s.law.background_accel(20.0, 50.0) < 0.0);
    assert!(s.law.background_accel(20.0, -50.0) > 0.0);
    assert_eq!(s.law.background_accel(20.0, 0.0), 0.0);
}

#[test]
fn background_mass_is_multiple_of_body_mass() {
    let s = build(ScenarioConfig::default_disk());
    assert_relative_eq!(s.parameters.background_mass, 100.0 * 1250.0);
}

#[test]
fn derived_expressions_are_rendered() {
    let s = build(ScenarioConfig::default_disk());
    let (pair, background) = s.law.expressions();
    assert!(pair.contains("z1") && pair.contains("z2") && pair.contains('m'));
    assert!(background.contains("z1"));
    assert!(!background.contains("z2"));
}

#[test]
fn cache_reuses_law_for_same_potential() {
    let mut cache = ForceLawCache::new();
    let a = Scenario::build_scenario_with_cache(ScenarioConfig::default_disk(), &mut cache).unwrap();
    let b = Scenario::build_scenario_with_cache(ScenarioConfig::default_disk(), &mut cache).unwrap();
    assert_eq!(cache.len(), 1);
    assert!(Arc::ptr_eq(&a.law, &b.law));

    let mut other = ScenarioConfig::default_disk();
    other.parameters.b = 300.0;
    let c = Scenario::build_scenario_with_cache(other, &mut cache).unwrap();
    assert_eq!(cache.len(), 2);
    assert!(!Arc::ptr_eq(&a.law, &c.law));
}

// ==================================================================================
// Aggregator tests
// ==================================================================================

#[test]
fn single_body_feels_only_background() {
    let s = build(config_with(&[500.0], &[25.0], &[40.0], &[0.0], true));
    let z = s.system.heights();
    let acc = s.forces.accumulate_accels(0, &s.system, &z).unwrap();

    assert_eq!(acc.len(), 1);
    assert_relative_eq!(acc[0], s.law.background_accel(25.0, 40.0));
    assert!(acc[0] != 0.0);
}

#[test]
fn symmetric_pair_accelerations_are_opposite() {
    let s = build(config_with(&[300.0, 300.0], &[0.0, 0.0], &[-5.0, 5.0], &[0.0, 0.0], false));
    let z = s.system.heights();
    let acc = s.forces.accumulate_accels(0, &s.system, &z).unwrap();

    // lower body is pulled up, upper body down
    assert!(acc[0] > 0.0);
    assert_relative_eq!(acc[0], -acc[1], max_relative = 1e-12);

    let expected = s.parameters.G * 300.0 / 100.0 / KM_PER_PC_DERIVATION;
    assert_relative_eq!(acc[0], expected, max_relative = 1e-12);
}

#[test]
fn accelerations_do_not_depend_on_body_order() {
    let cfg = ScenarioConfig::default_disk();
    let mut reversed = cfg.clone();
    reversed.bodies.m.reverse();
    reversed.bodies.x.reverse();
    reversed.bodies.z.reverse();
    reversed.bodies.v.reverse();

    let s = build(cfg);
    let r = build(reversed);
    let acc = s.forces.accumulate_accels(0, &s.system, &s.system.heights()).unwrap();
    let acc_r = r.forces.accumulate_accels(0, &r.system, &r.system.heights()).unwrap();

    let n = acc.len();
    for i in 0..n {
        assert_relative_eq!(acc[i], acc_r[n - 1 - i], max_relative = 1e-12);
    }
}

#[test]
fn parallel_matches_serial() {
    let serial = build(ScenarioConfig::default_disk());
    let mut cfg = ScenarioConfig::default_disk();
    cfg.engine.parallel = true;
    let parallel = build(cfg);
    assert!(parallel.forces.is_parallel());

    assert_eq!(serial.run().unwrap(), parallel.run().unwrap());
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn first_step_without_acceleration_is_linear() {
    let dt = 3.156e15;
    let z0 = DVector::from_vec(vec![-30.0, 20.0]);
    let v0 = DVector::from_vec(vec![1.5, -2.0]);
    let a0 = DVector::zeros(2);

    let z1 = first_step(&z0, &v0, &a0, dt).unwrap();
    for i in 0..2 {
        assert_relative_eq!(z1[i], z0[i] + v0[i] * dt / KM_PER_PC, max_relative = 1e-12);
    }
}

#[test]
fn first_step_of_lone_body_without_background() {
    let mut cfg = config_with(&[100.0], &[0.0], &[12.0], &[7.0], false);
    cfg.parameters.iterations = 0;
    let s = build(cfg);
    let t = s.run().unwrap();

    assert_eq!(t.len(), 2);
    let dt = s.parameters.h0;
    assert_relative_eq!(t.snapshot(1).unwrap()[0], 12.0 + 7.0 * dt / KM_PER_PC, max_relative = 1e-12);
}

#[test]
fn first_step_rejects_bad_time_step() {
    let z0 = DVector::from_vec(vec![1.0]);
    let v0 = DVector::from_vec(vec![0.0]);
    let a0 = DVector::from_vec(vec![0.0]);
    assert!(matches!(first_step(&z0, &v0, &a0, 0.0), Err(SimError::Config(_))));
    assert!(matches!(first_step(&z0, &v0, &a0, -1.0), Err(SimError::Config(_))));
    assert!(matches!(first_step(&z0, &v0, &a0, f64::NAN), Err(SimError::Config(_))));
}

#[test]
fn verlet_recurrence_is_reproducible() {
    let s = build(ScenarioConfig::default_disk());
    let t = s.run().unwrap();
    let dt = s.parameters.h0;

    for k in 1..t.len() - 1 {
        let z_prev = t.snapshot(k - 1).unwrap();
        let z_curr = t.snapshot(k).unwrap();
        let a_curr = s.forces.accumulate_accels(k, &s.system, z_curr).unwrap();
        let z_next = verlet_position(z_prev, z_curr, &a_curr, dt);

        let stored = t.snapshot(k + 1).unwrap();
        for i in 0..z_next.len() {
            assert_relative_eq!(z_next[i], stored[i], epsilon = 1e-9, max_relative = 1e-12);
        }
    }
}

#[test]
fn center_of_mass_stays_put_without_background() {
    let s = build(isolated_pair(50));
    let t = s.run().unwrap();
    let masses = s.system.masses();

    let com0 = t.center_of_mass(&masses, 0).unwrap();
    assert_relative_eq!(com0, -2.5);
    for k in 1..t.len() {
        let com = t.center_of_mass(&masses, k).unwrap();
        assert!((com - com0).abs() < 1e-9, "COM drifted to {com} at step {k}");
    }

    // the bodies did move toward each other
    let last = t.snapshot(t.len() - 1).unwrap();
    assert!(last[0] > -5.0 && last[1] < 5.0);
}

#[test]
fn state_machine_transitions() {
    let s = build(isolated_pair(3));
    let mut verlet = PositionVerlet::new(&s.system, &s.forces, &s.parameters);

    assert_eq!(verlet.state(), IntegratorState::Uninitialized);
    assert!(matches!(verlet.step(), Err(SimError::State(_))));

    verlet.initialize().unwrap();
    assert_eq!(verlet.state(), IntegratorState::Running { step: 0 });
    assert_eq!(verlet.trajectory().len(), 2);
    assert!(matches!(verlet.initialize(), Err(SimError::State(_))));

    verlet.step().unwrap();
    assert_eq!(verlet.state(), IntegratorState::Running { step: 1 });
    assert_eq!(verlet.trajectory().len(), 3);

    let t = verlet.run().unwrap();
    assert_eq!(t.len(), 5);
}

#[test]
fn running_past_final_step_is_an_error() {
    let s = build(isolated_pair(1));
    let mut verlet = PositionVerlet::new(&s.system, &s.forces, &s.parameters);
    verlet.initialize().unwrap();
    verlet.step().unwrap();
    assert!(matches!(verlet.step(), Err(SimError::State(_))));
}

/// Extra term that reports a singularity on body 0 once `step` reaches `from`
struct SingularFrom {
    from: usize,
}

impl Acceleration for SingularFrom {
    fn body_acceleration(&self, step: usize, i: usize, _sys: &System, _z: &DVector<f64>) -> zdisk::Result<f64> {
        if step >= self.from && i == 0 {
            return Err(SimError::Singularity { step, body: i, partner: None });
        }
        Ok(0.0)
    }
}

fn run_with_singularity_from(from: usize) -> zdisk::Result<zdisk::Trajectory> {
    let s = build(isolated_pair(5));
    let forces = AccelSet::new()
        .with(PairwiseGravity { law: Arc::clone(&s.law) })
        .with(SingularFrom { from });
    PositionVerlet::new(&s.system, &forces, &s.parameters).run()
}

#[test]
fn singularity_inside_loop_reports_its_step() {
    match run_with_singularity_from(3) {
        Err(SimError::Singularity { step, body, partner }) => {
            assert_eq!(step, 3);
            assert_eq!(body, 0);
            assert_eq!(partner, None);
        }
        other => panic!("expected singularity at step 3, got {other:?}"),
    }
}

#[test]
fn singularity_at_first_step_reports_step_one() {
    assert!(matches!(
        run_with_singularity_from(1),
        Err(SimError::Singularity { step: 1, body: 0, partner: None })
    ));
}

#[test]
fn singularity_at_final_snapshot_is_not_dropped() {
    // isolated_pair(5) ends at snapshot 6
    assert!(matches!(
        run_with_singularity_from(6),
        Err(SimError::Singularity { step: 6, .. })
    ));
    assert_eq!(run_with_singularity_from(7).unwrap().len(), 7);
}

// ==================================================================================
// Scenario tests
// ==================================================================================

#[test]
fn reference_disk_run() {
    let s = build(ScenarioConfig::default_disk());
    let t = s.run().unwrap();

    assert_eq!(t.len(), 12);
    assert_eq!(t.snapshot(0).unwrap().as_slice(), &[-30.0, 20.0, 10.0, 30.0, -10.0]);
    for snapshot in t.snapshots() {
        assert_eq!(snapshot.len(), 5);
        assert!(snapshot.iter().all(|z| z.is_finite()));
    }

    let times: Vec<f64> = t.iter_timed().map(|(time, _)| time).collect();
    assert_eq!(times[0], 0.0);
    assert!(times.windows(2).all(|w| w[1] > w[0]));
    assert_relative_eq!(times[11], 11.0 * 3.156e15);

    assert_eq!(t.body_track(4).unwrap().len(), 12);
    assert!(t.body_track(5).is_none());
}

#[test]
fn coincident_bodies_are_a_singularity() {
    let cfg = config_with(&[100.0, 200.0], &[10.0, 10.0], &[5.0, 5.0], &[0.0, 0.0], true);
    let s = build(cfg);
    match s.run() {
        Err(SimError::Singularity { step, body, partner }) => {
            assert_eq!(step, 0);
            assert_eq!(body, 0);
            assert_eq!(partner, Some(1));
        }
        other => panic!("expected singularity, got {other:?}"),
    }
}

#[test]
fn coincident_bodies_among_others() {
    let cfg = config_with(
        &[100.0, 200.0, 150.0],
        &[10.0, 20.0, 10.0],
        &[-3.0, 4.0, -3.0],
        &[0.0, 0.0, 0.0],
        false,
    );
    let s = build(cfg);
    assert!(matches!(
        s.run(),
        Err(SimError::Singularity { step: 0, body: 0, partner: Some(2) })
    ));
}

#[test]
fn mismatched_lengths_are_rejected() {
    let cfg = config_with(&[1.0, 2.0], &[0.0, 1.0], &[0.0], &[0.0, 0.0], true);
    assert!(matches!(
        Scenario::build_scenario(cfg),
        Err(SimError::LengthMismatch { field: "z", expected: 2, found: 1 })
    ));
}

#[test]
fn bad_parameters_are_rejected() {
    let mut zero_dt = ScenarioConfig::default_disk();
    zero_dt.parameters.h0 = 0.0;
    assert!(matches!(Scenario::build_scenario(zero_dt), Err(SimError::Config(_))));

    let mut negative_dt = ScenarioConfig::default_disk();
    negative_dt.parameters.h0 = -3.0;
    assert!(matches!(Scenario::build_scenario(negative_dt), Err(SimError::Config(_))));

    let mut negative_iterations = ScenarioConfig::default_disk();
    negative_iterations.parameters.iterations = -1;
    assert!(matches!(Scenario::build_scenario(negative_iterations), Err(SimError::Config(_))));

    let empty = config_with(&[], &[], &[], &[], true);
    assert!(matches!(Scenario::build_scenario(empty), Err(SimError::Config(_))));

    let negative_mass = config_with(&[-1.0], &[0.0], &[0.0], &[0.0], true);
    assert!(matches!(Scenario::build_scenario(negative_mass), Err(SimError::Config(_))));
}

#[test]
fn yaml_defaults_are_applied() {
    let yaml = r#"
parameters:
  a: 2700.0
  b: 200.0
  h0: 3.156e15
  iterations: 4
bodies:
  m: [100.0, 200.0]
  x: [10.0, 20.0]
  z: [-30.0, 20.0]
  v: [0.0, 0.0]
"#;
    let cfg = ScenarioConfig::from_yaml_str(yaml).unwrap();
    assert!(!cfg.engine.parallel);
    assert!(cfg.engine.background);
    assert_relative_eq!(cfg.parameters.G, 4.3009e-3);
    assert_relative_eq!(cfg.parameters.background_multiplier, 100.0);

    let t = build(cfg).run().unwrap();
    assert_eq!(t.len(), 6);
}
