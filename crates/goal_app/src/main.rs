use clap::Parser;
use goal_app::app::{run, Cli};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    run(cli.config(), cli.subcommand())
}
