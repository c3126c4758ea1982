//! Scripted runs of the bubble bar, for the command line.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, LoopSignal};
use serde::Serialize;

use crate::animation::Clock;
use crate::bubbles::snapshot::BarSnapshot;
use crate::bubbles::{BubbleBar, BubbleBarEvent, Options};
use crate::cli::Step;
use crate::scheduler::{CalloopScheduler, ManualScheduler, Scheduler, Task};

/// Frame interval of the simulation.
pub const FRAME: Duration = Duration::from_micros(16_667);

/// How long the bar may keep animating after the script is done.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Applies one step that is not a wait.
pub fn apply_step<S: Scheduler>(bubble_bar: &mut BubbleBar<S>, step: &Step) {
    debug!("step: {step:?}");

    match step {
        Step::Add(key) => bubble_bar.on_bubble_added(key, false),
        Step::AddSilent(key) => bubble_bar.on_bubble_added(key, true),
        Step::Remove(key) => bubble_bar.on_bubble_removed(key),
        Step::Select(key) => {
            if !bubble_bar.select_bubble(key) {
                warn!("cannot select {key}, it is not in the bar");
            }
        }
        Step::Expand => bubble_bar.expand(),
        Step::Collapse => bubble_bar.collapse(),
        Step::Stash => bubble_bar.stash(),
        Step::Show => bubble_bar.show(),
        Step::Touch => bubble_bar.on_bubble_bar_touched(),
        Step::Home(showing) => bubble_bar.set_bubbles_showing_on_home(*showing),
        Step::Overview(showing) => bubble_bar.set_bubbles_showing_on_overview(*showing),
        Step::Locked(locked) => bubble_bar.set_sysui_locked(*locked),
        Step::Wait(_) => (),
    }
}

fn is_settled<S: Scheduler>(bubble_bar: &BubbleBar<S>) -> bool {
    !bubble_bar.are_animations_ongoing() && !bubble_bar.animator().has_animation()
}

/// Prints the bar whenever its discrete state changes.
#[derive(Debug)]
pub struct Reporter {
    json: bool,
    last: Option<BarSnapshot>,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    time_ms: u128,
    events: Vec<String>,
    #[serde(flatten)]
    snapshot: &'a BarSnapshot,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self { json, last: None }
    }

    pub fn report<S: Scheduler>(
        &mut self,
        time: Duration,
        bubble_bar: &mut BubbleBar<S>,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let events = bubble_bar.take_events();
        let snapshot = BarSnapshot::capture(bubble_bar);

        let changed = match &self.last {
            Some(last) => !same_discrete_state(last, &snapshot),
            None => true,
        };
        if !changed && events.is_empty() {
            return Ok(());
        }

        if self.json {
            let line = JsonLine {
                time_ms: time.as_millis(),
                events: events.iter().map(|event| format!("{event:?}")).collect(),
                snapshot: &snapshot,
            };
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", format_line(time, &events, &snapshot))?;
        }

        self.last = Some(snapshot);
        Ok(())
    }
}

fn same_discrete_state(a: &BarSnapshot, b: &BarSnapshot) -> bool {
    a.bubbles == b.bubbles
        && a.selected == b.selected
        && a.expanded == b.expanded
        && a.visible == b.visible
        && a.stashed == b.stashed
        && a.notification == b.notification
}

fn format_line(time: Duration, events: &[BubbleBarEvent], snapshot: &BarSnapshot) -> String {
    let mut line = format!(
        "{:>6}ms bubbles=[{}] selected={} expanded={} visible={} stashed={} ty={:.1} alpha={:.2}",
        time.as_millis(),
        snapshot.bubbles.join(", "),
        snapshot.selected.as_deref().unwrap_or("-"),
        snapshot.expanded,
        snapshot.visible,
        snapshot.stashed,
        snapshot.translation_y,
        snapshot.alpha,
    );

    if let Some(notification) = &snapshot.notification {
        line += &format!(" notification={}:{}", notification.bubble, notification.state);
    }
    for event in events {
        line += &format!(" {event:?}");
    }

    line
}

/// Runs the script on simulated time, one frame at a time.
pub fn run_simulated(
    options: Options,
    steps: &[Step],
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut clock = Clock::with_time(Duration::ZERO);
    let scheduler = ManualScheduler::new(clock.clone());
    let mut bubble_bar = BubbleBar::new(clock.clone(), options, scheduler);
    let mut reporter = Reporter::new(json);

    let mut frame = |clock: &mut Clock, bubble_bar: &mut BubbleBar<ManualScheduler>| {
        let now = clock.now_unadjusted() + FRAME;
        clock.set_unadjusted(now);
        bubble_bar.advance_animations();
        bubble_bar.run_due_tasks();
        reporter.report(now, bubble_bar, &mut *out)
    };

    for step in steps {
        match step {
            Step::Wait(duration) => {
                let end = clock.now_unadjusted() + *duration;
                while clock.now_unadjusted() < end {
                    frame(&mut clock, &mut bubble_bar).context("error writing output")?;
                }
            }
            step => {
                apply_step(&mut bubble_bar, step);
                frame(&mut clock, &mut bubble_bar).context("error writing output")?;
            }
        }
    }

    let deadline = clock.now_unadjusted() + SETTLE_TIMEOUT;
    while !is_settled(&bubble_bar) {
        if clock.now_unadjusted() >= deadline {
            warn!("the bar did not settle in {SETTLE_TIMEOUT:?}");
            break;
        }
        frame(&mut clock, &mut bubble_bar).context("error writing output")?;
    }

    Ok(())
}

struct Realtime {
    bubble_bar: BubbleBar<CalloopScheduler<Realtime>>,
    clock: Clock,
    start: Duration,
    handle: LoopHandle<'static, Realtime>,
    signal: LoopSignal,
    script: VecDeque<Step>,
    script_done: bool,
    reporter: Reporter,
}

impl Realtime {
    fn run_task(&mut self, task: Task) {
        self.bubble_bar.run_task(task);
        self.report();
    }

    /// Applies steps up to the next wait.
    fn run_script(&mut self) {
        while let Some(step) = self.script.pop_front() {
            if let Step::Wait(duration) = step {
                let res = self
                    .handle
                    .insert_source(Timer::from_duration(duration), |_, _, state| {
                        state.run_script();
                        TimeoutAction::Drop
                    });
                if let Err(err) = res {
                    warn!("error scheduling the next step: {}", err.error);
                    self.script_done = true;
                }
                return;
            }

            apply_step(&mut self.bubble_bar, &step);
        }

        self.script_done = true;
    }

    fn frame(&mut self) {
        self.clock.clear();
        self.bubble_bar.advance_animations();
        self.report();

        if self.script_done && is_settled(&self.bubble_bar) {
            self.signal.stop();
        }
    }

    fn report(&mut self) {
        let time = self.clock.now_unadjusted().saturating_sub(self.start);
        let mut stdout = io::stdout().lock();
        if let Err(err) = self.reporter.report(time, &mut self.bubble_bar, &mut stdout) {
            warn!("error writing output: {err:?}");
            self.signal.stop();
        }
    }
}

/// Runs the script against the monotonic clock on a calloop event loop.
pub fn run_realtime(options: Options, steps: Vec<Step>, json: bool) -> anyhow::Result<()> {
    let mut event_loop =
        EventLoop::<Realtime>::try_new().context("error creating the event loop")?;
    let handle = event_loop.handle();

    let clock = Clock::default();
    let scheduler = CalloopScheduler::new(handle.clone(), Realtime::run_task);
    let bubble_bar = BubbleBar::new(clock.clone(), options, scheduler);

    let mut state = Realtime {
        bubble_bar,
        start: clock.now_unadjusted(),
        clock,
        handle: handle.clone(),
        signal: event_loop.get_signal(),
        script: steps.into(),
        script_done: false,
        reporter: Reporter::new(json),
    };

    handle
        .insert_source(Timer::from_duration(FRAME), |_, _, state| {
            state.frame();
            TimeoutAction::ToDuration(FRAME)
        })
        .map_err(|err| err.error)
        .context("error inserting the frame timer")?;

    state.run_script();
    event_loop
        .run(None, &mut state, |_| ())
        .context("error running the event loop")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> Options {
        let mut options = Options::default();
        options.transient_taskbar = true;
        options
    }

    fn run(options: Options, steps: &[Step], json: bool) -> String {
        let mut out = Vec::new();
        run_simulated(options, steps, json, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn notification_ends_stashed() {
        let output = run(transient(), &[Step::Add(String::from("a"))], false);
        let lines: Vec<_> = output.lines().collect();

        assert!(lines[0].contains("notification=a:animating-in"), "{output}");
        assert!(lines.iter().any(|line| line.contains("notification=a:in")));
        assert!(lines.iter().any(|line| line.contains("notification=a:animating-out")));

        let last = lines.last().unwrap();
        assert!(last.contains("bubbles=[a]"), "{last}");
        assert!(last.contains("stashed=true"), "{last}");
        assert!(last.contains("visible=false"), "{last}");
        assert!(!last.contains("notification"), "{last}");
    }

    #[test]
    fn json_lines_parse() {
        let steps = [
            Step::AddSilent(String::from("a")),
            Step::Home(true),
            Step::Expand,
            Step::Wait(Duration::from_millis(500)),
        ];
        let output = run(transient(), &steps, true);

        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let last = lines.last().unwrap();
        assert_eq!(last["bubbles"], serde_json::json!(["a"]));
        assert_eq!(last["expanded"], serde_json::json!(true));
        assert_eq!(last["stashed"], serde_json::json!(false));
        assert!(lines
            .iter()
            .any(|line| line["events"] == serde_json::json!(["Expanded(true)"])));
    }

    #[test]
    fn default_script_settles() {
        let output = run(transient(), &Step::default_script(), false);
        let last = output.lines().last().unwrap();
        assert!(last.contains("bubbles=[third, second, first]"), "{last}");
        assert!(last.contains("expanded=false"), "{last}");
        assert!(last.contains("stashed=true"), "{last}");
    }
}
