use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::bubbles::bubble_animator::TransitionState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(subcommand_value_name = "SUBCOMMAND")]
#[command(subcommand_help_heading = "Subcommands")]
pub struct Cli {
    /// Path to config file (default: `$XDG_CONFIG_HOME/bubblebar/config.kdl`).
    ///
    /// This can also be set with the `BUBBLEBAR_CONFIG` environment variable. If both are set,
    /// the command line argument takes precedence.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub subcommand: Sub,
}

#[derive(Subcommand)]
pub enum Sub {
    /// Print the bubble row geometry of a transition.
    Geometry(GeometryArgs),
    /// Play a scripted sequence of bubble bar events and print how the bar changes.
    Simulate(SimulateArgs),
    /// Validate the config file.
    Validate,
}

#[derive(clap::Args)]
pub struct GeometryArgs {
    /// Transition to sample.
    #[arg(value_enum)]
    pub transition: TransitionKind,
    /// Number of bubbles in the bar while the transition runs.
    #[arg(long, default_value_t = 3)]
    pub count: usize,
    /// Index of the selected bubble.
    #[arg(long, default_value_t = 0)]
    pub selected: usize,
    /// Index of the removed bubble, for transitions that remove one.
    #[arg(long, default_value_t = 0)]
    pub removed: usize,
    /// The removed bubble is the last one in the bar.
    #[arg(long)]
    pub removing_last: bool,
    /// Number of progress steps between 0 and 1.
    #[arg(long, default_value_t = 4)]
    pub steps: usize,
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl GeometryArgs {
    pub fn state(&self) -> TransitionState {
        match self.transition {
            TransitionKind::Idle => TransitionState::Idle,
            TransitionKind::Adding => TransitionState::AddingBubble {
                selected: self.selected,
            },
            TransitionKind::Removing => TransitionState::RemovingBubble {
                removed: self.removed,
                selected: self.selected,
                removing_last: self.removing_last,
            },
            TransitionKind::AddingAndRemoving => TransitionState::AddingAndRemoving {
                selected: self.selected,
                removed: self.removed,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransitionKind {
    Idle,
    Adding,
    Removing,
    AddingAndRemoving,
}

#[derive(clap::Args)]
pub struct SimulateArgs {
    /// Use the transient taskbar, overriding the config.
    #[arg(long)]
    pub transient: bool,
    /// Steps of the script, in order.
    ///
    /// One of `add:KEY`, `add-silent:KEY`, `remove:KEY`, `select:KEY`, `expand`, `collapse`,
    /// `stash`, `show`, `touch`, `home:on|off`, `overview:on|off`, `locked:on|off` or
    /// `wait:MSEC`.
    #[arg(long = "step", value_name = "STEP")]
    pub steps: Vec<Step>,
    /// Run against the monotonic clock on an event loop instead of simulated time.
    #[arg(long)]
    pub realtime: bool,
    /// Print every change as a JSON line.
    #[arg(long)]
    pub json: bool,
}

/// One step of a simulation script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Add(String),
    AddSilent(String),
    Remove(String),
    Select(String),
    Expand,
    Collapse,
    Stash,
    Show,
    Touch,
    Home(bool),
    Overview(bool),
    Locked(bool),
    Wait(Duration),
}

impl Step {
    /// The script used when none is given.
    pub fn default_script() -> Vec<Step> {
        vec![
            Step::Add(String::from("first")),
            Step::Wait(Duration::from_millis(5000)),
            Step::Add(String::from("second")),
            Step::Wait(Duration::from_millis(1500)),
            Step::Touch,
            Step::Wait(Duration::from_millis(500)),
            Step::Expand,
            Step::Wait(Duration::from_millis(500)),
            Step::Add(String::from("third")),
            Step::Wait(Duration::from_millis(500)),
            Step::Collapse,
            Step::Wait(Duration::from_millis(1000)),
        ]
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };

        let key = || match arg {
            Some(key) if !key.is_empty() => Ok(key.to_owned()),
            _ => Err(format!("{name} needs a bubble key, like {name}:KEY")),
        };
        let flag = || match arg {
            Some("on") => Ok(true),
            Some("off") => Ok(false),
            _ => Err(format!("{name} needs on or off, like {name}:on")),
        };
        let no_arg = |step: Step| match arg {
            None => Ok(step),
            Some(_) => Err(format!("{name} takes no argument")),
        };

        match name {
            "add" => key().map(Step::Add),
            "add-silent" => key().map(Step::AddSilent),
            "remove" => key().map(Step::Remove),
            "select" => key().map(Step::Select),
            "expand" => no_arg(Step::Expand),
            "collapse" => no_arg(Step::Collapse),
            "stash" => no_arg(Step::Stash),
            "show" => no_arg(Step::Show),
            "touch" => no_arg(Step::Touch),
            "home" => flag().map(Step::Home),
            "overview" => flag().map(Step::Overview),
            "locked" => flag().map(Step::Locked),
            "wait" => {
                let msec = arg.ok_or_else(|| String::from("wait needs a duration, like wait:500"))?;
                let msec = msec
                    .parse::<u64>()
                    .map_err(|err| format!("invalid wait duration {msec:?}: {err}"))?;
                Ok(Step::Wait(Duration::from_millis(msec)))
            }
            _ => Err(format!("unknown step {name:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_steps() {
        assert_eq!("add:a".parse::<Step>(), Ok(Step::Add(String::from("a"))));
        assert_eq!(
            "add-silent:b".parse::<Step>(),
            Ok(Step::AddSilent(String::from("b")))
        );
        assert_eq!("home:on".parse::<Step>(), Ok(Step::Home(true)));
        assert_eq!("locked:off".parse::<Step>(), Ok(Step::Locked(false)));
        assert_eq!(
            "wait:250".parse::<Step>(),
            Ok(Step::Wait(Duration::from_millis(250)))
        );
        assert_eq!("touch".parse::<Step>(), Ok(Step::Touch));
    }

    #[test]
    fn reject_bad_steps() {
        assert!("add".parse::<Step>().is_err());
        assert!("add:".parse::<Step>().is_err());
        assert!("home:yes".parse::<Step>().is_err());
        assert!("wait:soon".parse::<Step>().is_err());
        assert!("touch:now".parse::<Step>().is_err());
        assert!("jump".parse::<Step>().is_err());
    }

    #[test]
    fn cli_parses_geometry() {
        let cli = Cli::try_parse_from([
            "bubblebar",
            "geometry",
            "removing",
            "--count",
            "4",
            "--removed",
            "3",
            "--selected",
            "3",
            "--removing-last",
        ])
        .unwrap();

        let Sub::Geometry(args) = cli.subcommand else {
            panic!("expected the geometry subcommand");
        };
        assert_eq!(
            args.state(),
            TransitionState::RemovingBubble {
                removed: 3,
                selected: 3,
                removing_last: true,
            }
        );
    }

    #[test]
    fn cli_parses_simulate_steps() {
        let cli = Cli::try_parse_from([
            "bubblebar",
            "--config",
            "test.kdl",
            "simulate",
            "--transient",
            "--step",
            "add:a",
            "--step",
            "wait:100",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("test.kdl")));
        let Sub::Simulate(args) = cli.subcommand else {
            panic!("expected the simulate subcommand");
        };
        assert!(args.transient);
        assert_eq!(
            args.steps,
            [
                Step::Add(String::from("a")),
                Step::Wait(Duration::from_millis(100))
            ]
        );
    }
}
