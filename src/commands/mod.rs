use clap::Subcommand;

pub mod completions;
pub mod extract;
pub mod hide;
pub mod info;
#[cfg(feature = "fuse")]
pub mod mount;

pub use completions::cmd_completions;
pub use extract::cmd_extract;
pub use hide::cmd_hide;
pub use info::cmd_info;
#[cfg(feature = "fuse")]
pub use mount::cmd_mount;

#[derive(clap::Parser, Debug)]
#[command(name = "stego")]
pub struct Cli {
    #[command(subcommand)]
    pub subcommands: Subcommands,
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    #[command(visible_alias = "h")]
    Hide(hide::Cli),
    #[command(visible_alias = "e")]
    Extract(extract::Cli),
    #[command(visible_alias = "i")]
    Info(info::Cli),
    #[cfg(feature = "fuse")]
    #[command(visible_alias = "m")]
    Mount(mount::Cli),
    Completions(completions::Cli),
}
