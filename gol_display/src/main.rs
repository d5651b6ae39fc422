// main.rs - Starts the RPC service and a local Game of Life run side by side

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow, bail};
use gol::io::{self, write_pgm};
use gol::{DistributorChannels, Event, Grid, Params, State, patterns, rpc};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod ui;

const EVENT_BUFFER: usize = 1000;
const KEY_BUFFER: usize = 10;
const PORT_ENV_VAR: &str = "GOL_PORT";

const USAGE: &str = "\
usage: gol_display [-t THREADS] [-w WIDTH] [-h HEIGHT] [-turns TURNS] [-noVis]
                   [-port PORT] [-images DIR] [-out DIR] [-pattern NAME] [-serve]";

#[derive(Debug, PartialEq)]
struct Options {
    params: Params,
    serve_only: bool,
    pattern: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().skip(1).any(|a| a.trim_start_matches('-') == "help") {
        println!("{USAGE}");
        return Ok(());
    }
    let port_env = std::env::var(PORT_ENV_VAR).ok();
    let Options { params, serve_only, pattern } = parse_args(&args, port_env.as_deref())?;
    params.validate()?;

    info!("Threads: {}", params.threads);
    info!("Width: {}", params.image_width);
    info!("Height: {}", params.image_height);

    let runtime = tokio::runtime::Runtime::new().context("failed to start the tokio runtime")?;

    // The RPC service is independent of the local run and keeps serving alongside it.
    let listener = runtime
        .block_on(rpc::bind(params.port))
        .with_context(|| format!("failed to bind rpc port {}", params.port))?;
    let server = runtime.spawn(async move {
        if let Err(err) = rpc::serve(listener).await {
            error!(%err, "rpc server exited");
        }
    });

    if serve_only {
        return runtime.block_on(server).context("rpc server task panicked");
    }

    if let Some(name) = pattern {
        runtime.block_on(seed_image(&params, &name))?;
    }

    let (event_tx, events) = mpsc::channel(EVENT_BUFFER);
    let (keys, key_presses) = mpsc::channel(KEY_BUFFER);
    let run = runtime.spawn({
        let params = params.clone();
        async move {
            let io = io::spawn_io(&params);
            gol::run(params, DistributorChannels { events: event_tx, key_presses, io }).await
        }
    });

    if params.no_vis {
        let mut events = events;
        runtime.block_on(report(&mut events));
    } else {
        let events = Arc::new(Mutex::new(events));
        let paused = Arc::new(AtomicBool::new(false));
        let viewer = ui::Viewer::new(&params, Arc::clone(&events), keys.clone(), paused.clone());
        ui::show(viewer).map_err(|err| anyhow!("viewer failed: {err}"))?;

        // Window closed: the run still has to save and quit.
        runtime.block_on(async {
            let mut events = events.lock().await;
            shut_down(&mut events, &keys, paused.load(Ordering::Relaxed)).await;
        });
    }

    let turns = runtime.block_on(run).context("run task panicked")??;
    info!(turns, "completed");
    Ok(())
}

/// Drains the event stream without a window, logging the interesting events.
async fn report(events: &mut mpsc::Receiver<Event>) {
    while let Some(event) = events.recv().await {
        log_event(&event);
    }
}

fn log_event(event: &Event) {
    match event {
        Event::AliveCellsCount { .. } | Event::FinalTurnComplete { .. } => info!("{event}"),
        Event::StateChange { completed_turns, new_state } => {
            info!(turn = completed_turns, "{new_state}");
            if *new_state == State::Quitting {
                info!("event stream finished");
            }
        }
        Event::CellFlipped { .. } | Event::TurnComplete { .. } => {}
    }
}

/// Asks a run to quit and consumes the rest of its events until the stream closes.
///
/// `paused` is the last state the caller saw. A pause still in the stream, or
/// one caused by a stale `p`, is answered with another resume and quit, since a
/// paused run ignores `q`.
async fn shut_down(events: &mut mpsc::Receiver<Event>, keys: &mpsc::Sender<char>, paused: bool) {
    request_quit(keys, paused);
    while let Some(event) = events.recv().await {
        if let Event::StateChange { new_state: State::Paused, .. } = event {
            request_quit(keys, true);
        }
        log_event(&event);
    }
}

fn request_quit(keys: &mpsc::Sender<char>, resume: bool) {
    let presses: &[char] = if resume { &['p', 'q'] } else { &['q'] };
    for &key in presses {
        match keys.try_send(key) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => warn!(key = ?key, "key queue full, shutdown key dropped"),
        }
    }
}

/// Writes the starting image for this size from a named pattern, centred,
/// unless an image is already there.
async fn seed_image(params: &Params, name: &str) -> Result<()> {
    let pattern = patterns::find(name).with_context(|| {
        let known: Vec<&str> = patterns::PATTERNS.iter().map(|p| p.name).collect();
        format!("unknown pattern '{name}', expected one of {}", known.join(", "))
    })?;
    let path = params.image_dir.join(format!("{}.pgm", params.input_name()));
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        warn!(path = %path.display(), "image exists, not overwriting with pattern");
        return Ok(());
    }

    let mut grid = Grid::new(params.image_width, params.image_height);
    patterns::apply_pattern(&mut grid, pattern, params.image_height / 2, params.image_width / 2);
    write_pgm(&path, grid.width(), grid.height(), &grid.to_bytes()).await?;
    info!(path = %path.display(), pattern = pattern.name, "seeded starting image");
    Ok(())
}

fn parse_args(args: &[String], port_env: Option<&str>) -> Result<Options> {
    let mut options = Options { params: Params::default(), serve_only: false, pattern: None };
    if let Some(raw) = port_env {
        options.params.port = parse_value(PORT_ENV_VAR, raw)?;
    }

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let flag = arg.trim_start_matches('-');
        let params = &mut options.params;
        match flag {
            "t" => params.threads = parse_value(flag, next_value(&mut iter, arg)?)?,
            "w" => params.image_width = parse_value(flag, next_value(&mut iter, arg)?)?,
            "h" => params.image_height = parse_value(flag, next_value(&mut iter, arg)?)?,
            "turns" => params.turns = parse_value(flag, next_value(&mut iter, arg)?)?,
            "port" => params.port = parse_value(flag, next_value(&mut iter, arg)?)?,
            "images" => params.image_dir = next_value(&mut iter, arg)?.into(),
            "out" => params.out_dir = next_value(&mut iter, arg)?.into(),
            "noVis" => params.no_vis = true,
            "pattern" => options.pattern = Some(next_value(&mut iter, arg)?.to_owned()),
            "serve" => options.serve_only = true,
            _ => bail!("unknown flag '{arg}'\n{USAGE}"),
        }
    }
    Ok(options)
}

fn next_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("missing value for {flag}"))
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|err| anyhow!("invalid value '{raw}' for {name}: {err}"))
}
