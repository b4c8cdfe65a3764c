use colored::*;
use dialoguer::Confirm;
use flatfs::{
    check_volume, copy_into_volume, copy_out_of_volume, delete_from_volume,
    disk::{perform_disk_initialization, FormatProgress},
    list_files, occupied_blocks, volume_info, FileSystemError, Layout,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

use crate::shell::start_shell;

#[derive(Debug)]
pub enum Command {
    Help,
    Format { size_mb: u32, confirmed: bool },
    Put(PathBuf),
    Get(String, Option<PathBuf>),
    Rm(String),
    Blocks,
    Ls { all: bool },
    Info,
    Check,
    Shell,
    Exit,
}

pub fn execute_command(cmd: &Command, disk: &Path) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Format { size_mb, confirmed } => {
            if disk.exists() && !confirmed {
                let overwrite = Confirm::new()
                    .with_prompt(format!("{} already exists. Overwrite it?", disk.display()))
                    .default(false)
                    .interact()?;
                if !overwrite {
                    println!("{}", "Format cancelled.".yellow());
                    return Ok(());
                }
            }
            let layout = format_with_progress(disk, *size_mb)?;
            println!(
                "Metadata: disk size = {} MB, number of blocks = {}",
                size_mb.to_string().cyan(),
                layout.num_blocks.to_string().cyan()
            );
            println!(
                "First data block starts at offset = {} bytes",
                layout.data_offset.to_string().cyan()
            );
        }
        Command::Put(source) => {
            let inode = copy_into_volume(disk, source)?;
            println!(
                "📝 File '{}' copied to virtual disk ({} bytes).",
                inode.name.green(),
                inode.size
            );
        }
        Command::Get(name, output) => {
            let written = copy_out_of_volume(disk, name, output.as_deref())?;
            let dest = output.as_deref().unwrap_or_else(|| Path::new(name));
            println!(
                "📖 File '{}' copied from virtual disk to {} ({} bytes).",
                name.cyan(),
                dest.display(),
                written
            );
        }
        Command::Rm(name) => {
            delete_from_volume(disk, name)?;
            println!("❌ File '{}' was removed from virtual disk.", name.red());
        }
        Command::Blocks => {
            println!("{}", "Indexes of occupied blocks:".bright_yellow());
            for block in occupied_blocks(disk)? {
                println!("Block {} is occupied", block);
            }
            println!("{}", "Other blocks are free.".bright_black());
        }
        Command::Ls { all } => {
            println!("{:<40} {:<10} {:<10}", "File name", "Size", "First block");
            println!("{}", "-".repeat(62));
            for entry in list_files(disk, *all)? {
                let first = entry
                    .first_block
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let name = if entry.hidden {
                    entry.name.bright_black()
                } else {
                    entry.name.normal()
                };
                println!("{:<40} {:<10} {:<10}", name, entry.size, first);
            }
        }
        Command::Info => {
            let info = volume_info(disk)?;
            let created = chrono::DateTime::from_timestamp(info.created_at as i64, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| info.created_at.to_string());

            println!("{}", "📊 Volume Info".bright_yellow().bold());
            println!("{}: {}", "ID".blue(), info.volume_id);
            println!("{}: {}", "Created".blue(), created);
            println!("{}: {} MB", "Size".blue(), info.disk_size_mb);
            println!("{}: {} bytes", "Block size".blue(), info.block_size);
            println!(
                "{}: {} used / {} free / {} total",
                "Blocks".blue(),
                info.used_blocks,
                info.free_blocks,
                info.num_blocks
            );
            println!("{}: {}", "Data offset".blue(), info.data_offset);
            println!(
                "{}: {} / {} ({} inodes free)",
                "Files".blue(),
                info.num_files,
                info.max_files,
                info.free_inodes
            );
        }
        Command::Check => {
            let report = check_volume(disk)?;
            if report.is_clean() {
                println!(
                    "✅ {} files, {} blocks: no problems found.",
                    report.files_checked, report.blocks_reachable
                );
            } else {
                for problem in &report.problems {
                    println!("{} {}", "⚠️ ".yellow(), problem);
                }
                return Err(FileSystemError::Corrupted(format!(
                    "{} problems found",
                    report.problems.len()
                ))
                .into());
            }
        }
        Command::Shell => start_shell(disk),
        Command::Exit => println!("{}", "👋 Exiting flatfs shell...".yellow().bold()),
    }

    Ok(())
}

// 在后台线程格式化，前台根据进度消息刷新进度条
fn format_with_progress(disk: &Path, size_mb: u32) -> Result<Layout, Box<dyn Error>> {
    let (tx, rx) = mpsc::channel();
    let path = disk.to_path_buf();
    let worker = thread::spawn(move || perform_disk_initialization(path, size_mb, Some(&tx)));

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.green/black}] {pos:>3}% {msg}")?
            .progress_chars("#>-"),
    );
    for progress in rx {
        match progress {
            FormatProgress::Step(step) => pb.set_message(step),
            FormatProgress::Zeroing { written, total } => {
                pb.set_position(written * 100 / total.max(1))
            }
        }
    }

    let layout = worker
        .join()
        .map_err(|_| "format worker panicked".to_string())?;
    match layout {
        Ok(layout) => {
            pb.finish_with_message("✅ Disk formatted successfully!");
            Ok(layout)
        }
        Err(e) => {
            pb.abandon();
            Err(e.into())
        }
    }
}

fn print_help() {
    println!("{}", "📘 flatfs Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  format <MB>          Create a new empty disk of the given size
  put <host file>      Copy a host file into the disk
  get <name> [dest]    Copy a file out of the disk
  rm <name>            Delete a file from the disk
  blocks               Show occupied blocks
  ls [-a]              List files (-a includes hidden files)
  info                 Show volume metadata
  check                Verify block chains and bitmaps
  help                 Show this help message
  exit                 Quit the shell
"
        .bright_black()
    );
}
