//! `vcbridge quote` command

use anyhow::Result;

use crate::cli::QuoteArgs;
use vcbridge::builder::quote::{join_command_line, split_command_line};

pub fn execute(args: QuoteArgs) -> Result<()> {
    match args.split {
        Some(line) => {
            for arg in split_command_line(&line) {
                println!("{}", arg);
            }
        }
        None => println!("{}", join_command_line(&args.args)),
    }
    Ok(())
}
