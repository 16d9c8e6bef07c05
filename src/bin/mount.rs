//! CLI front-end: parses an image path and mountpoint, formats the image if
//! needed, and mounts it via FUSE until unmounted (§4.9, §6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use tinyfs::fs::Filesystem;
use tinyfs::fuse_adapter::FuseAdapter;

#[derive(Parser, Debug)]
#[command(name = "tinyfs-mount", about = "Mount a tinyfs image via FUSE")]
struct Cli {
    /// Backing file acting as the block device.
    #[arg(default_value = tinyfs::param::DEFAULT_IMAGE)]
    image: PathBuf,

    /// Directory to mount the file system at.
    mountpoint: PathBuf,

    /// Format the image even if it already exists.
    #[arg(long)]
    format: bool,

    /// Raise the default log level to `debug`.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let fs = if cli.format {
        info!("formatting {}", cli.image.display());
        Filesystem::mkfs(&cli.image)
    } else {
        Filesystem::init(&cli.image)
    };

    let fs = match fs {
        Ok(fs) => fs,
        Err(err) => {
            error!("failed to open {}: {err}", cli.image.display());
            return ExitCode::FAILURE;
        }
    };

    info!("mounting {} at {}", cli.image.display(), cli.mountpoint.display());
    let adapter = FuseAdapter::new(fs);
    let options = vec![fuser::MountOption::FSName("tinyfs".to_string())];
    if let Err(err) = fuser::mount2(adapter, &cli.mountpoint, &options) {
        error!("mount failed: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
