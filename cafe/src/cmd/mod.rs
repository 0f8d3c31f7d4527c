//! Our subcommands.

use cafe_common::{prelude::*, url::Url};
use structopt::StructOpt;

pub mod task;

/// Options for finding the scheduler, shared by all subcommands.
#[derive(Debug, StructOpt)]
pub struct ServerOpt {
    /// Path to a JSON config file.
    #[structopt(long = "config", parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// URL of the scheduler server (overrides the config file).
    #[structopt(long = "server")]
    pub server: Option<Url>,
}

impl ServerOpt {
    /// Load our config, with any command-line overrides applied.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        Ok(config)
    }
}
