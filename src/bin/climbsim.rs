//! Clawclimb replay tool - drives one climber through a scripted scene

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use clawclimb::config::ClimbConfig;
use clawclimb::game::climbing::MovementIntent;
use clawclimb::game::{PartShape, PhysicsWorld, Simulation, TickReport};

const CHARACTER_ID: u64 = 1;
const FLOOR_ID: u64 = 100;
const WALL_ID: u64 = 10;

#[derive(Parser)]
#[command(name = "climbsim")]
#[command(about = "Headless climbing locomotion replay", long_about = None)]
struct Cli {
    /// Scripted scene to run
    #[arg(short, long, value_enum, default_value_t = Scenario::Climb)]
    scenario: Scenario,

    /// Number of fixed steps to simulate
    #[arg(short, long, default_value = "600")]
    ticks: u64,

    /// Climbing config file (climb.toml); defaults are used when omitted
    #[arg(short, long, env = "CLAWCLIMB_CONFIG")]
    config: Option<PathBuf>,

    /// Print one JSON report per tick on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Grab a tall wall and climb until running off its top
    Climb,
    /// Climb a short wall and get pushed over the ledge
    Ledge,
    /// Climb for a second, then jump off
    JumpOff,
    /// Walk into an overhanging face and lose grip
    Overhang,
}

impl Scenario {
    fn build_world(self) -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.add_part(
            FLOOR_ID,
            [0.0, -0.5, 0.0],
            UnitQuaternion::identity(),
            [200.0, 1.0, 200.0],
            true,
            true,
            PartShape::Block,
        );

        let (position, rotation, size) = match self {
            Scenario::Climb | Scenario::JumpOff => {
                ([0.0, 10.0, -3.0], UnitQuaternion::identity(), [10.0, 20.0, 2.0])
            }
            Scenario::Ledge => ([0.0, 2.0, -3.0], UnitQuaternion::identity(), [10.0, 4.0, 2.0]),
            Scenario::Overhang => (
                [0.0, 4.0, -4.0],
                UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 50.0_f32.to_radians()),
                [10.0, 12.0, 2.0],
            ),
        };
        world.add_part(WALL_ID, position, rotation, size, true, true, PartShape::Block);
        world.set_climbable(WALL_ID, true);
        world
    }

    fn intent(self, tick: u64) -> MovementIntent {
        match self {
            Scenario::Climb | Scenario::Ledge | Scenario::Overhang => {
                MovementIntent::new(0.0, 1.0, false)
            }
            Scenario::JumpOff => MovementIntent::new(0.0, 1.0, tick == 60),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON reports stay machine-readable.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => match ClimbConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => ClimbConfig::default(),
    };

    let mut sim = Simulation::new(
        cli.scenario.build_world(),
        CHARACTER_ID,
        [0.0, 1.1, 0.0],
        config,
    );
    info!(scenario = ?cli.scenario, ticks = cli.ticks, "starting replay");

    let mut last: Option<TickReport> = None;
    for tick in 0..cli.ticks {
        let report = sim.tick(cli.scenario.intent(tick));
        if cli.json {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{}", line),
                Err(e) => {
                    error!("Failed to encode tick report: {}", e);
                    std::process::exit(1);
                }
            }
        }
        if let Some(change) = report.change {
            info!(
                tick = report.tick,
                time = report.time,
                from = ?change.from,
                to = ?change.to,
                position = ?report.position,
                "state change"
            );
        }
        last = Some(report);
    }

    if let Some(report) = last {
        info!(
            state = ?report.state,
            position = ?report.position,
            surface_id = ?report.surface_id,
            "replay finished"
        );
    }
}
