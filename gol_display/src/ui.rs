// ui.rs - egui viewer that replays the event stream and sends key presses back
//
// The viewer never sees the world itself: it keeps its own grid and toggles a
// cell for every CellFlipped event, which is enough to mirror the run. The
// event receiver is shared with main, which keeps draining it once the window
// is gone so the run can still finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eframe::egui;
use egui::{Color32, Key, Rect, Vec2};
use gol::{Event, Grid, Params, State};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::warn;

// Upper bound on events applied per frame, so a large initial image cannot freeze the UI.
const EVENTS_PER_FRAME: usize = 250_000;

pub type EventStream = Arc<Mutex<mpsc::Receiver<Event>>>;

pub struct Viewer {
    grid: Grid,
    events: EventStream,
    keys: mpsc::Sender<char>,
    paused: Arc<AtomicBool>,

    turn: u64,
    alive: Option<usize>,
    state: State,
    finished: bool,

    pub live_color: Color32,
    pub dead_color: Color32,
}

impl Viewer {
    pub fn new(
        params: &Params,
        events: EventStream,
        keys: mpsc::Sender<char>,
        paused: Arc<AtomicBool>,
    ) -> Self {
        Self {
            grid: Grid::new(params.image_width, params.image_height),
            events,
            keys,
            paused,
            turn: 0,
            alive: None,
            state: State::Executing,
            finished: false,
            live_color: Color32::from_rgb(0, 200, 0),
            dead_color: Color32::from_rgb(40, 40, 40),
        }
    }

    fn drain_events(&mut self) {
        let events = Arc::clone(&self.events);
        let Ok(mut events) = events.try_lock() else {
            return;
        };
        for _ in 0..EVENTS_PER_FRAME {
            match events.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    return;
                }
            }
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::CellFlipped { cell, .. } => self.grid.toggle(cell.y, cell.x),
            Event::TurnComplete { completed_turns } => self.turn = completed_turns,
            Event::AliveCellsCount { completed_turns, cells_count } => {
                self.turn = completed_turns;
                self.alive = Some(cells_count);
            }
            Event::FinalTurnComplete { completed_turns, alive } => {
                self.turn = completed_turns;
                self.alive = Some(alive.len());
            }
            Event::StateChange { completed_turns, new_state } => {
                self.turn = completed_turns;
                self.paused.store(new_state == State::Paused, Ordering::Relaxed);
                self.state = new_state;
            }
        }
    }

    fn press(&self, key: char) {
        if self.finished {
            return;
        }
        if let Err(err) = self.keys.try_send(key) {
            warn!(%err, key = ?key, "dropped key press");
        }
    }
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        let (save, pause, quit) =
            ctx.input(|i| (i.key_pressed(Key::S), i.key_pressed(Key::P), i.key_pressed(Key::Q)));
        if save {
            self.press('s');
        }
        if pause {
            self.press('p');
        }
        if quit {
            self.press('q');
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Game of Life");

            // Controls
            ui.horizontal(|ui| {
                if ui.button("💾 Save").clicked() {
                    self.press('s');
                }
                let pause_text = if self.paused.load(Ordering::Relaxed) { "▶ Resume" } else { "⏸ Pause" };
                if ui.button(pause_text).clicked() {
                    self.press('p');
                }
                if ui.button("⏹ Quit").clicked() {
                    self.press('q');
                }

                ui.separator();

                ui.label(format!("Turn: {}", self.turn));
                match self.alive {
                    Some(alive) => ui.label(format!("Alive cells: {alive}")),
                    None => ui.label("Alive cells: -"),
                };
                if self.finished {
                    ui.label("Finished");
                } else {
                    ui.label(self.state.to_string());
                }
            });

            ui.separator();

            // Only live cells are painted; the background stands in for dead ones.
            let (width, height) = (self.grid.width(), self.grid.height());
            let available = ui.available_size();
            let box_size = (available.x / width as f32).min(available.y / height as f32).max(1.0);
            let total_size = Vec2::new(box_size * width as f32, box_size * height as f32);

            let (response, painter) = ui.allocate_painter(total_size, egui::Sense::hover());
            let origin = response.rect.min;
            painter.rect_filled(response.rect, 0.0, self.dead_color);

            for cell in self.grid.alive_cells() {
                let rect = Rect::from_min_size(
                    origin + Vec2::new(cell.x as f32 * box_size, cell.y as f32 * box_size),
                    Vec2::splat(box_size),
                );
                painter.rect_filled(rect, 0.0, self.live_color);
            }
        });

        if !self.finished {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}

/// Opens the viewer window on the calling thread and blocks until it is closed.
pub fn show(viewer: Viewer) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 850.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Game of Life",
        options,
        Box::new(move |_cc| Box::new(viewer)),
    )
}
