//! `ents-config` binary.
//!
//! `render` prints, writes or checks the composed configuration file;
//! `reconcile` converges the config secret of a manifest inside a state
//! directory. Both are thin layers over the `ents_config` library; errors
//! surface through `anyhow` with the failing file or object attached.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    cli::Cli::parse().execute()
}
