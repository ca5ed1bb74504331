mod cache;
mod commands;
mod models;
mod store;

use clap::Parser;
use log::error;
use std::process;

use crate::commands::{run_command, SubCommand};


/// offline map file reader and tile cache
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
  #[clap(subcommand)]
  command: SubCommand,
}



fn main() {
  env_logger::init();
  let args = Args::parse();
  if let Err(e) = run_command(args.command) {
    error!("{}", e);
    process::exit(1);
  }
}
