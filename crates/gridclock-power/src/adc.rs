use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Raw battery-divider sample from an IIO voltage channel.
#[derive(Debug, Clone)]
pub struct IioAdc {
    path: PathBuf,
}

impl IioAdc {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            anyhow::bail!("No ADC channel at {}", path.display());
        }
        Ok(Self { path })
    }

    pub fn read(&self) -> Result<u32> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read adc {}", self.path.display()))?;

        content.trim()
            .parse()
            .with_context(|| format!("parse adc value {:?}", content.trim()))
    }
}
