// src/config.rs

use crate::types::Config;
use anyhow::{ensure, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.zone.polygon.len() == 4,
            "zone polygon must have exactly 4 vertices, got {}",
            self.zone.polygon.len()
        );
        ensure!(
            self.calibration.real_height_m > 0.0,
            "calibration.real_height_m must be positive"
        );
        ensure!(
            self.calibration.pixel_height_ref > 0.0,
            "calibration.pixel_height_ref must be positive"
        );
        ensure!(self.calibration.fps > 0.0, "calibration.fps must be positive");
        ensure!(
            self.calibration.frame_skip >= 1,
            "calibration.frame_skip must be at least 1"
        );
        ensure!(
            self.calibration.window >= 2,
            "calibration.window must be at least 2 for speed estimation"
        );
        Ok(())
    }
}
