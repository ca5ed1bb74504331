use clap::Subcommand;
use std::error::Error;

pub mod info;
pub mod purge;
pub mod serve;

#[derive(Subcommand)]
pub enum SubCommand {
  Info(info::InfoCommand),
  Serve(serve::ServeCommand),
  Purge(purge::PurgeCommand),
}

pub fn run_command(sub: SubCommand) -> Result<(), Box<dyn Error>> {
  match sub {
    SubCommand::Info(cmd) => cmd.execute(),
    SubCommand::Serve(cmd) => cmd.execute(),
    SubCommand::Purge(cmd) => cmd.execute(),
  }
}
