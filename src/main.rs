use std::process::ExitCode;

use clap::Parser;
use colored::*;
use flatfs::FileSystemError;

use crate::{cli::Cli, shell::command::execute_command};

mod cli;
mod shell;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let command = cli.command();

    match execute_command(&command, &cli.disk) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{} {}", "❌ Error:".red().bold(), e);
            // 致命错误与被拒绝的操作用不同的退出码区分
            match e.downcast_ref::<FileSystemError>() {
                Some(fs_err) if !fs_err.is_fatal() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
