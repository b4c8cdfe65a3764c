use std::path::PathBuf;

use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    let (&cmd, args) = tokens.split_first()?;

    match cmd {
        "help" => Some(Command::Help),
        "format" => args.first()?.parse::<u32>().ok().map(|size_mb| Command::Format {
            size_mb,
            confirmed: false,
        }),
        "put" => args.first().map(|&src| Command::Put(PathBuf::from(src))),
        "get" => args
            .first()
            .map(|&name| Command::Get(name.to_string(), args.get(1).map(PathBuf::from))),
        "rm" => args.first().map(|&name| Command::Rm(name.to_string())),
        "blocks" => Some(Command::Blocks),
        "ls" => Some(Command::Ls {
            all: args.iter().any(|&a| a == "-a" || a == "--all"),
        }),
        "info" => Some(Command::Info),
        "check" => Some(Command::Check),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}
