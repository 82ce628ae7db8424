use super::args::{Cli, Commands, FindArgs};
use super::handlers;
use crate::logging;
use anyhow::Result;
use revtrace_runtime::Config;

pub fn run(cli: Cli) -> Result<()> {
    logging::init_tracing(cli.log_level);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Find(FindArgs::default()));

    match command {
        Commands::Find(args) => {
            let config = Config::load(cli.config.as_deref())?.merge(args.overrides());
            let settings = config.resolve()?;
            handlers::find::handle(&settings, args.resume)
        }

        Commands::Show { path } => handlers::show::handle(&path),
    }
}
