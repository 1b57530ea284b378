use crate::command;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub enum RunCmd {
    /// Start the stdio-based preview service.
    #[clap(name = "rpc")]
    Rpc(command::rpc::Rpc),
    /// Render a single file and print the preview HTML.
    #[clap(name = "render")]
    Render(command::render::Render),
}

/// MJML preview CLI arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Enable the logging system.
    #[clap(long)]
    pub log: Option<std::path::PathBuf>,

    /// Specify the path of the config file.
    #[clap(long)]
    pub config_file: Option<std::path::PathBuf>,
}

impl RunCmd {
    pub async fn run(self, args: Args) -> Result<()> {
        match self {
            Self::Render(render) => render.run(args).await,
            Self::Rpc(rpc) => rpc.run(args).await,
        }
    }
}
