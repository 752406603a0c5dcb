use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(version, about = "Schedules batches and jobs for a Radix job component")]
pub(crate) struct Cli {
    #[clap(
        short,
        long,
        default_value = "/etc/radix-job-scheduler/config.yaml"
    )]
    pub(crate) config: PathBuf,

    /// Overrides the port from the config file
    #[clap(short, long)]
    pub(crate) port: Option<u16>,
}
