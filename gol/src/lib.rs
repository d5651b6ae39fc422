//! Conway's Game of Life on a torus, stepped by a fork-join of band workers.
//!
//! [`distributor::run`] drives a local run and reports progress as a stream of
//! [`Event`]s; [`rpc`] exposes the same stepping over HTTP for out-of-process
//! callers.

pub mod distributor;
pub mod error;
pub mod event;
pub mod grid;
pub mod io;
pub mod params;
pub mod partition;
pub mod patterns;
pub mod rpc;
pub mod world;

pub use distributor::{Distributor, DistributorChannels, run};
pub use error::{GolError, Result};
pub use event::{Event, State};
pub use grid::{Cell, Grid};
pub use params::Params;
pub use partition::{Band, partition};
pub use world::{World, WorldSnapshot};
