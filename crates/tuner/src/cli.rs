use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::{TunerConfig, TunerSettings, Variant, resolve_settings};

#[derive(Parser, Debug)]
#[command(name = "radio-tuner", version = crate::VERSION)]
pub struct Args {
    /// Receiver variant preset
    #[arg(long, value_enum)]
    pub variant: Option<VariantArg>,

    /// Optional tuner config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP bind address, e.g. 127.0.0.1:8081 (overrides the preset)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    /// FM receiver (/fmtune, /fmstatus)
    Fm,
    /// HD Radio receiver (/tune, /status)
    Hd,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Fm => Variant::Fm,
            VariantArg::Hd => Variant::Hd,
        }
    }
}

impl Args {
    /// Load the config file if given and resolve the final settings.
    pub fn settings(&self) -> Result<TunerSettings> {
        let cfg = match self.config.as_ref() {
            Some(path) => TunerConfig::load(path)?,
            None => TunerConfig::default(),
        };
        resolve_settings(&cfg, self.variant.map(Variant::from), self.bind)
    }
}
