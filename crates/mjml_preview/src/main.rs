use clap::Parser;
use cli::{Args, RunCmd};

const BUILD_TIME: &str = include!(concat!(env!("OUT_DIR"), "/compiled_at.txt"));

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser, Debug)]
pub enum Cmd {
    /// Display the current version.
    #[clap(name = "version")]
    Version,

    /// Run the preview server or a one-off render.
    #[clap(flatten)]
    Run(Box<RunCmd>),
}

#[derive(Parser, Debug)]
#[clap(name = "mjml-preview", disable_version_flag = true)]
pub struct MjmlPreview {
    #[clap(flatten)]
    pub args: Args,

    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mjml_preview = MjmlPreview::parse();

    match mjml_preview.cmd {
        Cmd::Version => {
            println!(
                "version {}, compiled at: {}, built for {} by {}.",
                built_info::PKG_VERSION,
                BUILD_TIME,
                built_info::TARGET,
                built_info::RUSTC_VERSION
            );
        }
        Cmd::Run(run_cmd) => {
            if let Err(e) = run_cmd.run(mjml_preview.args).await {
                eprintln!("error: {e:?}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
