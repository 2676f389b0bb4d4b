use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "livepoll-server", about = "Real-time poll and discussion server")]
pub struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "livepoll.toml")]
    pub config: String,
}
