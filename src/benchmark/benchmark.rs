use std::time::Instant;

use crate::configuration::config::{BodiesConfig, EngineConfig, ScenarioConfig};
use crate::simulation::forces::{ForceLaw, ForceLawCache};
use crate::simulation::scenario::Scenario;

/// Helper to build a scenario of `n` bodies spread over the disk
fn make_config(n: usize, parallel: bool, iterations: i64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::default_disk();
    cfg.engine = EngineConfig {
        parallel,
        background: true,
    };
    cfg.parameters.iterations = iterations;

    // deterministic positions, no rand needed
    let mut bodies = BodiesConfig::default();
    for i in 0..n {
        let i_f = i as f64;
        bodies.m.push(100.0 + 50.0 * (i % 9) as f64);
        bodies.x.push(10.0 * i_f + 5.0);
        bodies.z.push((i_f * 0.37).sin() * 50.0);
        bodies.v.push((i_f * 0.13).cos() * 2.0);
    }
    cfg.bodies = bodies;
    cfg
}

/// Time one derivation against a cache hit
pub fn bench_derivation() {
    let cfg = make_config(5, false, 0);
    let scenario = Scenario::build_scenario(cfg).expect("benchmark scenario is valid");
    let model = *scenario.law.model();

    let t0 = Instant::now();
    let _ = ForceLaw::derive(&model);
    let dt_derive = t0.elapsed().as_secs_f64();

    let mut cache = ForceLawCache::new();
    let _ = cache.get_or_derive(&model);
    let t1 = Instant::now();
    let _ = cache.get_or_derive(&model);
    let dt_hit = t1.elapsed().as_secs_f64();

    println!("derive = {:10.3} us, cache hit = {:10.3} us", dt_derive * 1e6, dt_hit * 1e6);
}

/// Serial vs rayon aggregator for increasing body counts
pub fn bench_accel() {
    let ns = [100, 200, 400, 800, 1600, 3200];

    for n in ns {
        let serial = Scenario::build_scenario(make_config(n, false, 0)).expect("benchmark scenario is valid");
        let parallel = Scenario::build_scenario(make_config(n, true, 0)).expect("benchmark scenario is valid");
        let z = serial.system.heights();

        // Warm up
        let _ = serial.forces.accumulate_accels(0, &serial.system, &z);
        let _ = parallel.forces.accumulate_accels(0, &parallel.system, &z);

        let t0 = Instant::now();
        let _ = serial.forces.accumulate_accels(0, &serial.system, &z);
        let dt_serial = t0.elapsed().as_secs_f64();

        let t1 = Instant::now();
        let _ = parallel.forces.accumulate_accels(0, &parallel.system, &z);
        let dt_par = t1.elapsed().as_secs_f64();

        println!("N = {n:5}, serial = {:8.6} s, rayon = {:8.6} s", dt_serial, dt_par);
    }
}

/// Full runs, printed as CSV
pub fn bench_run_curve() {
    println!("N,serial_ms,rayon_ms");

    for n in (100..=1600).step_by(100) {
        let steps = if n <= 400 { 20 } else { 5 };
        let serial = Scenario::build_scenario(make_config(n, false, steps)).expect("benchmark scenario is valid");
        let parallel = Scenario::build_scenario(make_config(n, true, steps)).expect("benchmark scenario is valid");

        let t0 = Instant::now();
        let _ = serial.run();
        let ms_serial = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        let _ = parallel.run();
        let ms_par = t1.elapsed().as_secs_f64() * 1000.0;

        println!("{},{:.6},{:.6}", n, ms_serial, ms_par);
    }
}
