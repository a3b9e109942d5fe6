use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Two-axis magnetometer exposed through the Linux IIO sysfs interface
/// (e.g. an LSM303DLH under `/sys/bus/iio/devices/iio:device0`).
#[derive(Debug, Clone)]
pub struct IioMagnetometer {
    dir: PathBuf,
}

impl IioMagnetometer {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        anyhow::ensure!(
            dir.join("in_magn_x_raw").exists() && dir.join("in_magn_y_raw").exists(),
            "no magnetometer channels under {}",
            dir.display()
        );
        Ok(Self { dir })
    }

    /// Scaled (x, y) field reading.
    pub fn read(&self) -> Result<(f64, f64)> {
        Ok((self.read_axis("x")?, self.read_axis("y")?))
    }

    fn read_axis(&self, axis: &str) -> Result<f64> {
        let raw = read_number(&self.dir.join(format!("in_magn_{}_raw", axis)))?;
        // per-channel scale, else the shared one, else raw counts
        let scale = [format!("in_magn_{}_scale", axis), "in_magn_scale".to_string()]
            .iter()
            .map(|name| self.dir.join(name))
            .find(|p| p.exists())
            .map(|p| read_number(&p))
            .transpose()?
            .unwrap_or(1.0);
        Ok(raw * scale)
    }
}

fn read_number(path: &Path) -> Result<f64> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    content.trim()
        .parse()
        .with_context(|| format!("parse {}", path.display()))
}
