#[macro_use]
extern crate tracing;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use bubblebar::bubbles::bubble_animator::{BarLayout, TransitionState};
use bubblebar::bubbles::snapshot::TransitionSnapshot;
use bubblebar::bubbles::Options;
use bubblebar::cli::{Cli, GeometryArgs, SimulateArgs, Step, Sub};
use bubblebar::simulation;
use bubblebar_config::Config;
use clap::Parser;
use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "bubblebar=debug,bubblebar_config=debug";

fn main() -> anyhow::Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    let _client = tracy_client::Client::start();

    match cli.subcommand {
        Sub::Validate => {
            let (path, _) = config_path(cli.config)?;
            Config::load(&path).map_err(|err| anyhow!("{err:?}"))?;
            info!("config is valid");
            Ok(())
        }
        Sub::Geometry(args) => {
            let config = load_config(cli.config)?;
            geometry(&Options::from_config(&config), &args)
        }
        Sub::Simulate(args) => {
            let config = load_config(cli.config)?;
            simulate(Options::from_config(&config), args)
        }
    }
}

/// Returns the config path and whether it was given explicitly.
fn config_path(cli_path: Option<PathBuf>) -> anyhow::Result<(PathBuf, bool)> {
    if let Some(path) = cli_path {
        return Ok((path, true));
    }

    if let Some(path) = env::var_os("BUBBLEBAR_CONFIG") {
        return Ok((PathBuf::from(path), true));
    }

    let dirs = ProjectDirs::from("", "", "bubblebar")
        .context("error retrieving the home directory")?;
    Ok((dirs.config_dir().join("config.kdl"), false))
}

fn load_config(cli_path: Option<PathBuf>) -> anyhow::Result<Config> {
    let (path, explicit) = config_path(cli_path)?;

    if !explicit && !path.exists() {
        debug!("{path:?} does not exist, using the default config");
        return Ok(Config::default());
    }

    Config::load(&path).map_err(|err| anyhow!("{err:?}"))
}

fn geometry(options: &Options, args: &GeometryArgs) -> anyhow::Result<()> {
    let state = args.state();
    let count = args.count;

    if count == 0 {
        bail!("the bar needs at least one bubble");
    }
    if args.selected >= count {
        bail!("selected bubble {} is out of range", args.selected);
    }
    if matches!(
        state,
        TransitionState::RemovingBubble { .. } | TransitionState::AddingAndRemoving { .. }
    ) && args.removed >= count
    {
        bail!("removed bubble {} is out of range", args.removed);
    }
    if let TransitionState::RemovingBubble {
        removed,
        removing_last,
        ..
    } = state
    {
        if removing_last != (removed == count - 1) {
            warn!("--removing-last does not match the removed index");
        }
    }

    let layout = BarLayout {
        icon_size: options.icon_size,
        spacing: options.icon_spacing,
        count,
        on_left: options.on_left,
    };
    let snapshot = TransitionSnapshot::capture(&layout, state, args.steps);

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &snapshot)?;
        writeln!(stdout)?;
        return Ok(());
    }

    writeln!(stdout, "{}", snapshot.state)?;
    for frame in &snapshot.frames {
        let translations = frame
            .translations
            .iter()
            .map(|x| format!("{x:7.2}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            stdout,
            "{:.3}: [{translations}] width {:.2} arrow {:.2}",
            frame.fraction, frame.expanded_width, frame.arrow_position
        )?;
    }

    Ok(())
}

fn simulate(mut options: Options, args: SimulateArgs) -> anyhow::Result<()> {
    if args.transient {
        options.transient_taskbar = true;
    }

    let steps = if args.steps.is_empty() {
        Step::default_script()
    } else {
        args.steps
    };

    if args.realtime {
        simulation::run_realtime(options, steps, args.json)
    } else {
        let mut stdout = io::stdout().lock();
        simulation::run_simulated(options, &steps, args.json, &mut stdout)
    }
}
