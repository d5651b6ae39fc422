// distributor.rs - Control loop that advances turns and reacts to key presses
//
// Each iteration services at most one source, in priority order: a pending
// key press, a due ticker, otherwise one turn of the local stepper. Nothing
// here ever interrupts a step that is already running.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{GolError, Result};
use crate::event::{Event, State};
use crate::grid::Grid;
use crate::io::IoHandle;
use crate::params::Params;
use crate::world::World;

/// How often the number of live cells is reported.
pub const TICK_PERIOD: Duration = Duration::from_secs(2);

pub struct DistributorChannels {
    pub events: mpsc::Sender<Event>,
    pub key_presses: mpsc::Receiver<char>,
    pub io: IoHandle,
}

pub struct Distributor {
    params: Params,
    channels: DistributorChannels,
    tick_period: Duration,
}

/// Runs a whole game and returns the number of completed turns.
///
/// The event stream is closed when this returns, whether or not the run succeeded.
pub async fn run(params: Params, channels: DistributorChannels) -> Result<u64> {
    Distributor::new(params, channels).run().await
}

impl Distributor {
    pub fn new(params: Params, channels: DistributorChannels) -> Self {
        Self { params, channels, tick_period: TICK_PERIOD }
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub async fn run(self) -> Result<u64> {
        let Distributor { params, channels, tick_period } = self;
        let DistributorChannels { events, mut key_presses, io } = channels;
        let started = Instant::now();
        let events = EventSink(events);

        params.validate()?;
        info!(
            threads = params.threads,
            turns = params.turns,
            "starting {}x{} run",
            params.image_height,
            params.image_width
        );

        let bytes = io.read_image(&params.input_name()).await?;
        let grid = Grid::from_bytes(params.image_width, params.image_height, &bytes)?;
        let mut world = World::with_grid(grid, params.threads)?;
        let mut turn = 0;
        events.flips(&world, turn).await?;

        let mut ticker = time::interval_at(Instant::now() + tick_period, tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'turns: while turn < params.turns {
            tokio::select! {
                biased;

                Some(key) = key_presses.recv() => match key {
                    's' => save(&io, &params, &world, turn).await?,
                    'q' => {
                        info!(turn, "quit requested");
                        break 'turns;
                    }
                    'p' => {
                        events.state(turn, State::Paused).await?;
                        info!(turn, "paused");
                        wait_for_resume(&mut key_presses).await;
                        info!(turn, "continuing");
                        events.state(turn, State::Executing).await?;
                    }
                    other => debug!(key = ?other, "ignoring key"),
                },
                _ = ticker.tick() => {
                    events
                        .send(Event::AliveCellsCount { completed_turns: turn, cells_count: world.alive_count() })
                        .await?;
                }
                _ = std::future::ready(()) => {
                    world = step(world).await?;
                    turn += 1;
                    events.flips(&world, turn).await?;
                    events.send(Event::TurnComplete { completed_turns: turn }).await?;
                }
            }
        }

        // Finishing
        events
            .send(Event::FinalTurnComplete { completed_turns: turn, alive: world.alive_cells() })
            .await?;
        save(&io, &params, &world, turn).await?;
        info!(turn, elapsed = ?started.elapsed(), "run finished");

        // Quitting: every queued write must land before consumers are told we are done.
        io.check_idle().await?;
        events.state(turn, State::Quitting).await?;
        Ok(turn)
    }
}

struct EventSink(mpsc::Sender<Event>);

impl EventSink {
    async fn send(&self, event: Event) -> Result<()> {
        self.0.send(event).await.map_err(|_| GolError::ChannelClosed("events"))
    }

    async fn flips(&self, world: &World, turn: u64) -> Result<()> {
        for cell in world.flipped_cells() {
            self.send(Event::CellFlipped { completed_turns: turn, cell }).await?;
        }
        Ok(())
    }

    async fn state(&self, turn: u64, new_state: State) -> Result<()> {
        self.send(Event::StateChange { completed_turns: turn, new_state }).await
    }
}

/// Moves the world onto the blocking pool for one fork-join step.
async fn step(mut world: World) -> Result<World> {
    tokio::task::spawn_blocking(move || {
        world.step()?;
        Ok(world)
    })
    .await
    .map_err(|err| GolError::StepFailed(err.to_string()))?
}

async fn save(io: &IoHandle, params: &Params, world: &World, turn: u64) -> Result<()> {
    let name = params.output_name(turn);
    debug!(%name, "queueing snapshot");
    io.write_image(&name, world.current().to_bytes()).await
}

async fn wait_for_resume(key_presses: &mut mpsc::Receiver<char>) {
    loop {
        match key_presses.recv().await {
            Some('p') => return,
            Some(other) => debug!(key = ?other, "ignoring key while paused"),
            None => {
                warn!("key press channel closed while paused, resuming");
                return;
            }
        }
    }
}
