use zdisk::{Scenario, ScenarioConfig};
use zdisk::{bench_accel, bench_derivation, bench_run_curve};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file inside the `scenarios/` directory
    #[arg(short, default_value = "disk_five_body.yaml")]
    file_name: String,

    /// Run the timing sweeps instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_derivation();
        bench_accel();
        bench_run_curve();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let scenario = Scenario::build_scenario(scenario_cfg)?;
    let (a_z, a_bg_z) = scenario.law.expressions();
    info!("a_z(x1, x2, z1, z2, m) = {a_z}");
    info!("a_bg_z(x1, z1) = {a_bg_z}");

    let trajectory = scenario.run()?;

    // t, z_0 .. z_{N-1}
    for (t, snapshot) in trajectory.iter_timed() {
        let row: Vec<String> = snapshot.iter().map(|z| format!("{z:.6}")).collect();
        println!("{t:.6e},{}", row.join(","));
    }

    Ok(())
}
