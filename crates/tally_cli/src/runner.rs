//! Scene runner
//!
//! Drives the tick scheduler from the main thread, like a UI run loop, and
//! redraws the board after every tick until all counters finish.

use crate::config::{LabelConfig, SceneFile, VALUE_PLACEHOLDER};
use crate::terminal::{Board, BoardLabel};
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tally_animation::{
    Completion, CountingAnimator, LabelSink, NumberFormat, RichText, SpanStyle, TickScheduler,
};
use tracing::{debug, info};

/// Upper bound on how long a scene may run past its longest label
const GRACE: Duration = Duration::from_secs(2);

/// Run options
pub struct RunOptions {
    /// Redraw in place with colors
    pub ansi: bool,
    /// Override the scene's tick rate
    pub tick_rate: Option<u32>,
}

fn build_counter(
    scheduler: &TickScheduler,
    board: &Arc<Board>,
    label: &LabelConfig,
) -> Result<(CountingAnimator, BoardLabel)> {
    let sink = board.add_label(&label.name);
    let counter = CountingAnimator::new(scheduler.handle())
        .with_sink(Arc::new(sink.clone()))
        .with_config(&label.animator)
        .with_context(|| format!("Label '{}'", label.name))?;

    if label.template.is_some() || label.bold {
        let format = NumberFormat::parse(&label.animator.format)
            .with_context(|| format!("Label '{}': invalid format", label.name))?;
        let template = label
            .template
            .clone()
            .unwrap_or_else(|| VALUE_PLACEHOLDER.to_string());

        let render = move |value: f64| {
            let number = format.render(value).unwrap_or_default();
            template.replace(VALUE_PLACEHOLDER, &number)
        };

        if label.bold {
            counter.set_rich_text_formatter(move |value| {
                RichText::styled(render(value), SpanStyle::bold())
            });
        } else {
            counter.set_string_formatter(render);
        }
    }

    Ok((counter, sink))
}

/// Run every label of a scene to completion
pub fn run_scene(scene: &SceneFile, options: &RunOptions, out: &mut impl Write) -> Result<()> {
    scene.validate()?;

    let mut config = scene.scheduler;
    if let Some(rate) = options.tick_rate {
        config.tick_rate = rate;
    }
    let scheduler = TickScheduler::with_config(config);
    let board = Board::new();
    let finished = Arc::new(AtomicUsize::new(0));

    let mut counters = Vec::with_capacity(scene.labels.len());
    for label in &scene.labels {
        let (counter, sink) = build_counter(&scheduler, &board, label)?;
        let colors = label.resolve()?;

        let done = Arc::clone(&finished);
        let name = label.name.clone();
        let completion: Completion = Box::new(move || {
            if let Some(color) = colors.completion {
                sink.set_color(color);
            }
            done.fetch_add(1, Ordering::SeqCst);
            debug!("label '{}' finished", name);
        });

        match colors.transition {
            Some((start, end)) => counter.increment_with_colors(
                label.from,
                label.to,
                start,
                end,
                label.duration,
                Some(completion),
            ),
            None => counter.increment(label.from, label.to, label.duration, Some(completion)),
        }
        counters.push(counter);
    }

    info!(
        "Running {} label(s) at {} Hz",
        counters.len(),
        scheduler.tick_rate()
    );

    let longest = scene
        .labels
        .iter()
        .map(|l| l.duration.max(0.0))
        .fold(0.0, f64::max);
    let deadline = Instant::now() + Duration::from_secs_f64(longest.min(3600.0)) + GRACE;
    let interval = scheduler.tick_interval();

    board.draw(out, options.ansi)?;
    while finished.load(Ordering::SeqCst) < counters.len() {
        if Instant::now() > deadline {
            anyhow::bail!("Scene did not finish in time");
        }

        let frame_start = Instant::now();
        scheduler.tick();
        if options.ansi {
            board.draw_if_dirty(out, true)?;
        }

        let spent = frame_start.elapsed();
        if spent < interval {
            thread::sleep(interval - spent);
        }
    }

    // Plain output only shows the final values
    if options.ansi {
        board.draw_if_dirty(out, true)?;
    } else {
        board.draw(out, false)?;
    }

    info!("{} frame(s) rendered", scheduler.frame_count());
    Ok(())
}
