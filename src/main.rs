use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lander_sim::emergency::{scenario_by_name, scenario_names};
use lander_sim::physics::presets as planets;
use lander_sim::{
    ControllerConfig, ControllerKind, EmergencyScenario, ScenarioConfig, SimConfig, Simulator, Telemetry,
    VehicleKind,
};

/// Vertical-descent lander simulation.
///
/// Runs a TOML scenario file, or compares the PID, LQR and MPC guidance laws
/// on a built-in descent.
#[derive(Debug, Parser)]
#[command(name = "lander-sim", version, about)]
struct Args {
    /// TOML scenario file; overrides every other run option.
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Planet for the built-in comparison (earth, mars, moon).
    #[arg(long, default_value = "moon")]
    planet: String,

    /// Vehicle for the built-in comparison.
    #[arg(long, default_value = "moon_lander")]
    vehicle: String,

    /// Controllers to compare (pid, lqr, mpc). Defaults to all three.
    #[arg(short, long, value_delimiter = ',')]
    controller: Vec<String>,

    /// Target descent velocity, m/s (negative = down).
    #[arg(long, default_value_t = -2.0, allow_hyphen_values = true)]
    setpoint: f64,

    /// Named emergency scenario, e.g. "One Engine Failure".
    #[arg(short, long)]
    emergency: Option<String>,

    /// Initial altitude, m. Defaults to the planet's recommendation.
    #[arg(long)]
    altitude: Option<f64>,

    /// Initial vertical velocity, m/s. Defaults to the planet's recommendation.
    #[arg(long, allow_hyphen_values = true)]
    velocity: Option<f64>,

    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    #[arg(long, default_value_t = 600.0)]
    max_time: f64,

    /// Print a sampled trajectory table for each run.
    #[arg(short, long)]
    table: bool,

    /// List planets, vehicles and emergency scenarios, then exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    if args.list {
        print_catalog();
        return Ok(());
    }

    let runs = match &args.scenario {
        Some(path) => {
            let cfg = ScenarioConfig::load(path)
                .with_context(|| format!("loading scenario {}", path.display()))?;
            vec![cfg]
        }
        None => comparison_runs(&args)?,
    };

    println!();
    println!("====================================================================");
    println!("  LANDER-SIM  Vertical Descent Guidance");
    println!("====================================================================");

    let mut summary = Vec::new();
    for cfg in &runs {
        let mut sim = cfg.build().context("building simulator")?;
        let trajectory = sim.run(cfg.sim.dt).context("stepping simulator")?;
        print_run(&sim, &trajectory, args.table);
        summary.push(summarize(&sim, &trajectory));
    }

    if summary.len() > 1 {
        print_summary(&summary);
    }
    println!("====================================================================");
    println!();
    Ok(())
}

fn comparison_runs(args: &Args) -> Result<Vec<ScenarioConfig>> {
    let vehicle: VehicleKind = args.vehicle.parse()?;
    let emergency = match &args.emergency {
        Some(name) => scenario_by_name(name)
            .with_context(|| format!("unknown emergency scenario {name:?} (try --list)"))?,
        None => EmergencyScenario::Nominal,
    };
    let kinds: Vec<ControllerKind> = if args.controller.is_empty() {
        ControllerKind::ALL.to_vec()
    } else {
        args.controller
            .iter()
            .map(|k| k.parse::<ControllerKind>())
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(kinds
        .into_iter()
        .map(|kind| {
            let controller = ControllerConfig::defaults(kind)
                .with_setpoint(args.setpoint)
                .with_activation_altitude(None);
            ScenarioConfig {
                planet: args.planet.clone(),
                vehicle,
                initial_altitude: args.altitude,
                initial_velocity: args.velocity,
                sim: SimConfig {
                    dt: args.dt,
                    max_time: args.max_time,
                    controller: Some(controller),
                    emergency,
                    ..SimConfig::default()
                },
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

struct RunSummary {
    label: String,
    time: f64,
    speed: f64,
    fuel_used: f64,
    outcome: String,
}

fn summarize(sim: &Simulator, trajectory: &[Telemetry]) -> RunSummary {
    let label = sim.controller_name().unwrap_or("manual").to_string();
    let fuel_used = sim.lander().max_fuel_mass - sim.lander().fuel_mass();
    match sim.touchdown() {
        Some(td) => RunSummary {
            label,
            time: td.time,
            speed: td.speed,
            fuel_used,
            outcome: td.outcome.to_string(),
        },
        None => RunSummary {
            label,
            time: sim.time(),
            speed: trajectory.last().map_or(0.0, |t| t.velocity.norm()),
            fuel_used,
            outcome: "airborne at max_time".into(),
        },
    }
}

fn print_run(sim: &Simulator, trajectory: &[Telemetry], table: bool) {
    let lander = sim.lander();
    println!();
    println!(
        "  {} on {}  |  guidance: {}  |  emergency: {}",
        lander.name,
        sim.planet().name,
        sim.controller_name().unwrap_or("manual"),
        sim.emergency().scenario()
    );
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Mass:          {:>8.0} kg    Fuel:         {:>8.0} kg",
        lander.dry_mass + lander.max_fuel_mass,
        lander.max_fuel_mass
    );
    println!(
        "  Engines:       {:>8}       Max thrust:   {:>8.1} kN",
        format!("{}/{}", lander.active_engine_count(), lander.engines.len()),
        lander.max_total_thrust() / 1000.0
    );

    match sim.touchdown() {
        Some(td) => println!(
            "  TOUCHDOWN t={:>6.1}s   speed={:>6.2}m/s   fuel left={:>7.1}kg   {}",
            td.time, td.speed, td.fuel_remaining, td.outcome
        ),
        None => println!("  No touchdown within {:.0} s", sim.config().max_time),
    }

    if table && !trajectory.is_empty() {
        println!();
        println!(
            "  {:>7}  {:>9}  {:>9}  {:>9}  {:>9}",
            "t (s)", "alt (m)", "vel (m/s)", "thrust(kN)", "fuel (kg)"
        );
        println!("  {}", "─".repeat(52));
        let every = (trajectory.len() / 25).max(1);
        for (i, t) in trajectory.iter().enumerate() {
            if i % every != 0 && i != trajectory.len() - 1 {
                continue;
            }
            println!(
                "  {:>7.1}  {:>9.1}  {:>9.2}  {:>9.2}  {:>9.1}",
                t.time,
                t.altitude(),
                t.vertical_velocity(),
                t.thrust / 1000.0,
                t.extras.fuel_mass
            );
        }
    }
}

fn print_summary(rows: &[RunSummary]) {
    println!();
    println!("  Comparison");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>6}  {:>9}  {:>11}  {:>12}  {}",
        "law", "time (s)", "speed (m/s)", "fuel (kg)", "outcome"
    );
    for r in rows {
        println!(
            "  {:>6}  {:>9.1}  {:>11.2}  {:>12.1}  {}",
            r.label, r.time, r.speed, r.fuel_used, r.outcome
        );
    }
}

fn print_catalog() {
    println!("Planets:   {}", planets::names().join(", "));
    println!("Vehicles:");
    for v in VehicleKind::ALL {
        println!("  {:<28} ({})", v.display_name(), v.compatible_planets().join(", "));
    }
    println!("Emergency scenarios:");
    for name in scenario_names() {
        println!("  {name}");
    }
}
