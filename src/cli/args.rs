//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `build`: Resolve the dependency closure and emit the ordered file list
//!   or a concatenated bundle
//! - `init`: Initialize an ngbuild configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve and emit the dependency-ordered build
    Build(BuildCommand),
    /// Write a default configuration file
    Init,
}

#[derive(Debug, Args)]
pub struct BuildCommand {
    /// Config file path (default: nearest .ngbuildrc.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Concatenate the ordered files into one bundle at this path
    #[arg(long)]
    pub bundle: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log every requirement decision (implies --verbose)
    #[arg(long)]
    pub debug: bool,
}
