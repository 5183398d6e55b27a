use common::logger::MyLog;
use common::saveload::{save, JSONPretty};
use signals::{ControlMode, SignalConfig};
use std::path::PathBuf;
use structopt::StructOpt;

mod sim;

use sim::Sim;

#[derive(StructOpt, Debug)]
#[structopt(name = "signals headless", no_version, author = "by Uriopass")]
struct Opt {
    /// Controller configuration as JSON. Missing fields take their defaults
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Overrides the mode of the configuration: off, fixed-time, high-density or low-density
    #[structopt(long)]
    mode: Option<ControlMode>,

    /// Simulated seconds to run
    #[structopt(long, default_value = "3600")]
    duration: f64,

    /// Vehicles per second entering each approach
    #[structopt(long, default_value = "0.1")]
    arrival_rate: f64,

    /// Timestep in seconds
    #[structopt(long, default_value = "0.5")]
    timestep: f64,

    /// Writes the final phase plan as JSON to this file
    #[structopt(long, parse(from_os_str))]
    save_plan: Option<PathBuf>,

    /// Seed of the traffic generator
    #[structopt(long, default_value = "0")]
    seed: u32,
}

fn main() {
    let opt: Opt = Opt::from_args();
    MyLog::init();

    let mut config = match opt.config {
        Some(ref path) => match SignalConfig::load(path) {
            Ok(x) => x,
            Err(e) => {
                log::error!("could not load config {}: {}", path.display(), e);
                return;
            }
        },
        None => SignalConfig::with_mode(ControlMode::HighDensity),
    };
    if let Some(mode) = opt.mode {
        config.mode = mode;
    }

    if opt.timestep.is_nan() || opt.timestep <= 0.0 {
        log::error!("timestep must be positive, got {}", opt.timestep);
        return;
    }

    let mut sim = match Sim::new(config, opt.seed) {
        Ok(x) => x,
        Err(e) => {
            log::error!("could not build controller: {}", e);
            return;
        }
    };
    if let Err(e) = sim.start() {
        log::error!("could not start controller: {}", e);
        return;
    }
    log::info!("running {}s of traffic in {:?} mode", opt.duration, sim.controller.mode());

    while sim.queue.now() < opt.duration {
        sim.tick(opt.timestep, opt.arrival_rate);
    }
    sim.shutdown();

    let s = sim.stats;
    log::info!(
        "done: {} spawned, {} departed, {} waiting, {} switches, {} extensions, {} recalculations, {} errors",
        s.spawned,
        s.departed,
        sim.traffic.len(),
        s.switches,
        s.extensions,
        s.recalculations,
        s.errors
    );
    println!("{}", sim.controller);

    if let Some(ref path) = opt.save_plan {
        if let Err(e) = save::<JSONPretty, _>(sim.controller.plan(), path) {
            log::error!("could not save plan to {}: {}", path.display(), e);
        }
    }
}
