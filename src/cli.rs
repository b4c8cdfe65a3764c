use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::shell::command::Command;

#[derive(Parser)]
#[command(name = "flatfs", version, about = "A flat virtual disk stored in a single file")]
pub struct Cli {
    /// Virtual disk image
    #[arg(long, short, env = "FLATFS_DISK", default_value = "vd.bin", global = true)]
    pub disk: PathBuf,

    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Subcommand)]
pub enum Action {
    /// Create a new empty disk image, overwriting any existing one
    Format {
        /// Disk size in MB
        #[arg(long, short)]
        size: u32,

        /// Do not ask before overwriting an existing image
        #[arg(long, short)]
        yes: bool,
    },
    /// Copy a host file into the disk
    Put { source: PathBuf },
    /// Copy a file out of the disk
    Get {
        name: String,

        /// Destination path, defaults to the file name
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete a file from the disk
    Rm { name: String },
    /// Show the indexes of occupied blocks
    Blocks,
    /// List files on the disk
    Ls {
        /// Include hidden files
        #[arg(long, short)]
        all: bool,
    },
    /// Show volume metadata
    Info,
    /// Verify block chains against the bitmaps
    Check,
    /// Start the interactive shell (default)
    Shell,
}

impl Cli {
    pub fn command(&self) -> Command {
        match &self.action {
            None | Some(Action::Shell) => Command::Shell,
            Some(Action::Format { size, yes }) => Command::Format {
                size_mb: *size,
                confirmed: *yes,
            },
            Some(Action::Put { source }) => Command::Put(source.clone()),
            Some(Action::Get { name, output }) => Command::Get(name.clone(), output.clone()),
            Some(Action::Rm { name }) => Command::Rm(name.clone()),
            Some(Action::Blocks) => Command::Blocks,
            Some(Action::Ls { all }) => Command::Ls { all: *all },
            Some(Action::Info) => Command::Info,
            Some(Action::Check) => Command::Check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["flatfs", "--disk", "img.bin", "get", "a.txt", "-o", "out"]);
        assert_eq!(cli.disk, PathBuf::from("img.bin"));
        assert!(matches!(
            cli.command(),
            Command::Get(name, Some(out)) if name == "a.txt" && out == PathBuf::from("out")
        ));
    }

    #[test]
    fn defaults_to_shell() {
        let cli = Cli::parse_from(["flatfs"]);
        assert!(matches!(cli.command(), Command::Shell));
    }
}
