//! romfetch: resolve and download LineageOS artifacts from the terminal

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use fetcher::resolver::{self, ArtifactDescriptor};
use fetcher::{DownloadEvent, FetchConfig};

#[derive(Parser)]
#[command(name = "romfetch", version, about = "Locate and download LineageOS builds, images, and add-ons")]
struct Cli {
    /// Print the resolved URL instead of downloading
    #[arg(long, global = true)]
    url_only: bool,

    /// Destination directory for downloads
    #[arg(long, global = true, default_value = ".")]
    out: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Latest nightly ROM package for a device codename
    Rom { device: String },
    /// Latest recovery image, falling back to a boot image when none exists
    Recovery {
        device: String,
        /// Skip recovery and fetch the boot image directly (Pixel-style devices)
        #[arg(long)]
        boot_only: bool,
    },
    /// Latest vbmeta image (Samsung flashing flows)
    Vbmeta { device: String },
    /// Best archived build for a device no longer served by the nightly index
    Archive { device: String },
    /// Latest Magisk APK
    Magisk,
    /// Known devices: catalog brands/models, or the archive catalog's codenames
    Devices {
        /// Show models of one brand instead of the brand list
        brand: Option<String>,
        /// List device codenames present in the archive catalog
        #[arg(long)]
        archive: bool,
    },
    /// Resolve a brand and model to its device codename
    Codename { brand: String, model: String },
    /// Codename of the device currently connected over adb
    Detect,
    /// Reboot the connected device via adb
    Reboot {
        #[arg(value_enum, default_value_t = RebootMode::System)]
        target: RebootMode,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum RebootMode {
    System,
    Recovery,
    Bootloader,
    Download,
}

impl From<RebootMode> for fetcher::adb::RebootTarget {
    fn from(mode: RebootMode) -> Self {
        match mode {
            RebootMode::System => Self::System,
            RebootMode::Recovery => Self::Recovery,
            RebootMode::Bootloader => Self::Bootloader,
            RebootMode::Download => Self::Download,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = FetchConfig::default();

    match cli.command {
        Command::Rom { device } => {
            let artifact = resolver::latest_nightly(&config, &device).await?;
            deliver(&config, &artifact, &device, &cli.out, cli.url_only).await
        }
        Command::Recovery { device, boot_only } => {
            let artifact = resolver::latest_recovery_or_boot(
                &config,
                &device,
                boot_only,
                resolver::mirror::DEFAULT_MIRROR_TRIES,
            )
            .await?;
            deliver(&config, &artifact, &device, &cli.out, cli.url_only).await
        }
        Command::Vbmeta { device } => {
            let artifact = resolver::latest_vbmeta(&config, &device).await?;
            deliver(&config, &artifact, &device, &cli.out, cli.url_only).await
        }
        Command::Archive { device } => {
            let artifact = resolver::latest_archive_build(
                &config,
                &device,
                resolver::archive::DEFAULT_ARCHIVE_TRIES,
            )
            .await?;
            deliver(&config, &artifact, &device, &cli.out, cli.url_only).await
        }
        Command::Magisk => {
            let release = resolver::latest_magisk_apk(&config).await?;
            if cli.url_only {
                println!("{}", release.url);
                return Ok(());
            }
            println!("Magisk {} ({})", release.tag, release.release_page);
            let dest = cli.out.join(&release.filename);
            download(&config, &release.url, &dest).await
        }
        Command::Devices { brand, archive } => {
            if archive {
                for device in resolver::archive_devices(&config).await? {
                    println!("{device}");
                }
            } else if let Some(brand) = brand {
                let models = fetcher::catalog::catalog().models_for(&brand);
                if models.is_empty() {
                    bail!("unknown brand '{brand}'");
                }
                for model in models {
                    println!("{model}");
                }
            } else {
                for brand in fetcher::catalog::catalog().brands() {
                    println!("{brand}");
                }
            }
            Ok(())
        }
        Command::Codename { brand, model } => {
            let catalog = fetcher::catalog::catalog();
            match catalog.codename_for(&brand, &model) {
                Some(codename) => {
                    println!("{codename}");
                    Ok(())
                }
                None => {
                    let near = catalog.suggestions(&brand, &model);
                    if near.is_empty() {
                        bail!("no catalog entry for {brand} {model}");
                    }
                    bail!("no catalog entry for {brand} {model}; close matches: {}", near.join(", "))
                }
            }
        }
        Command::Detect => match fetcher::adb::connected_codename().await {
            Some(codename) => {
                println!("{codename}");
                Ok(())
            }
            None => bail!("no device detected over adb"),
        },
        Command::Reboot { target } => {
            let result = fetcher::adb::reboot(target.into()).await;
            for line in &result.lines {
                eprintln!("{line}");
            }
            if !result.success() {
                bail!("adb reboot exited with code {}", result.exit_code);
            }
            Ok(())
        }
    }
}

async fn deliver(
    config: &FetchConfig,
    artifact: &ArtifactDescriptor,
    device: &str,
    out: &Path,
    url_only: bool,
) -> Result<()> {
    if url_only {
        println!("{}", artifact.url);
        return Ok(());
    }
    println!("[{}] {}", artifact.source, artifact.url);
    let dest = out.join(artifact.default_save_name(device));
    download(config, &artifact.url, &dest).await
}

enum Terminal {
    Completed(PathBuf),
    Failed(String),
    Cancelled,
}

async fn download(config: &FetchConfig, url: &str, dest: &Path) -> Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .expect("static template"),
    );

    let terminal: Arc<Mutex<Option<Terminal>>> = Arc::new(Mutex::new(None));
    let sink = {
        let bar = bar.clone();
        let terminal = terminal.clone();
        move |event: DownloadEvent| match event {
            DownloadEvent::Progress(p) => {
                if let Some(total) = p.bytes_total {
                    bar.set_length(total);
                }
                bar.set_position(p.bytes_done);
            }
            DownloadEvent::Completed { path } => {
                *terminal.lock().unwrap() = Some(Terminal::Completed(path));
            }
            DownloadEvent::Failed { message } => {
                *terminal.lock().unwrap() = Some(Terminal::Failed(message));
            }
            DownloadEvent::Cancelled => {
                *terminal.lock().unwrap() = Some(Terminal::Cancelled);
            }
        }
    };

    fetcher::download_with_progress(config, url, dest, &cancel, &sink).await;
    bar.finish_and_clear();

    let outcome = terminal
        .lock()
        .unwrap()
        .take()
        .ok_or_else(|| anyhow!("download ended without a result"))?;
    match outcome {
        Terminal::Completed(path) => {
            println!("saved {}", path.display());
            Ok(())
        }
        Terminal::Cancelled => {
            eprintln!("cancelled");
            std::process::exit(130);
        }
        Terminal::Failed(message) => bail!("download failed: {message}"),
    }
}
