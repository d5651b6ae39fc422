// params.rs - Run configuration, fixed for the lifetime of a run

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GolError, Result};

pub const DEFAULT_PORT: u16 = 8888;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub threads: usize,
    pub image_width: usize,
    pub image_height: usize,
    pub turns: u64,
    pub no_vis: bool,
    pub port: u16,
    pub image_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            threads: 8,
            image_width: 512,
            image_height: 512,
            turns: 10_000_000_000,
            no_vis: false,
            port: DEFAULT_PORT,
            image_dir: PathBuf::from("images"),
            out_dir: PathBuf::from("out"),
        }
    }
}

impl Params {
    /// Rejects anything that would fail once the run has started.
    /// Rows are the partitioned axis, so threads are bounded by the height.
    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(GolError::Configuration(format!(
                "image must be non-empty, got {}x{}",
                self.image_height, self.image_width
            )));
        }
        if self.threads == 0 {
            return Err(GolError::Configuration("thread count must be at least 1".into()));
        }
        if self.threads > self.image_height {
            return Err(GolError::Configuration(format!(
                "{} threads exceed the {} rows to partition",
                self.threads, self.image_height
            )));
        }
        Ok(())
    }

    /// Name of the starting image, e.g. `512x512`.
    pub fn input_name(&self) -> String {
        format!("{}x{}", self.image_height, self.image_width)
    }

    /// Name of a snapshot taken after `turn` turns, e.g. `512x512x100`.
    pub fn output_name(&self, turn: u64) -> String {
        format!("{}x{}x{}", self.image_height, self.image_width, turn)
    }
}
