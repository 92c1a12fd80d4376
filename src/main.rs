//! Skycam - HTTP service for ZWO ASI cameras.
#![deny(unsafe_code)]

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::{info, warn};

use skycam::cli::{Cli, Commands, CompletionsArgs, SdkArgs, ServeArgs};
use skycam::config::{self, Overrides, ServiceConfig};
use skycam::device::mock::MockCameraBuilder;
use skycam::device::{AsiCamera, BoxedSdk, DeviceHandle, DeviceInfo};
use skycam::error::CamError;
use skycam::logging;
use skycam::session::{Session, SessionTimings};
use skycam::web::{self, AppState};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format, cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output_error(&cli, &e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        None => {
            print_quick_start();
            Ok(())
        }
        Some(Commands::Serve(args)) => cmd_serve(cli, args),
        Some(Commands::Probe(args)) => cmd_probe(cli, args),
        Some(Commands::Version) => {
            cmd_version(cli);
            Ok(())
        }
        Some(Commands::Completions(args)) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

fn print_quick_start() {
    println!(
        "{} {} - HTTP service for ZWO ASI cameras\n",
        style("skycam").bold().cyan(),
        build_info::VERSION
    );
    println!("{}", style("Commands:").bold());
    println!("  skycam serve             Run the camera service on 0.0.0.0:8080");
    println!("  skycam serve --mock      Run against a simulated camera");
    println!("  skycam probe             List attached cameras");
    println!("  skycam version           Show build information\n");
    println!("{}", style("Endpoints:").bold());
    println!("  GET  /status             Connection and stream state");
    println!("  POST /camera/connect     Open the camera");
    println!("  POST /camera/stream/start");
    println!("  GET  /camera/stream      MJPEG live view");
    println!("  GET  /camera/snapshot    Long-exposure JPEG");
    println!("  POST /camera/settings    {{gain, photo_exposure, video_exposure}}");
}

fn load_config(cli: &Cli, overrides: Overrides) -> anyhow::Result<ServiceConfig> {
    let mut config = config::load_or_default(cli.config.as_deref())?;
    config.apply(overrides);
    config.validate()?;
    Ok(config)
}

fn build_backend(sdk: &SdkArgs, config: &ServiceConfig) -> BoxedSdk {
    if sdk.mock {
        info!("Using simulated camera");
        return Box::new(
            MockCameraBuilder::new()
                .resolution(640, 480)
                .frame_delay(std::time::Duration::from_millis(33))
                .build(),
        );
    }
    let camera = AsiCamera::discover(&config.sdk_candidates());
    if !camera.is_loaded() {
        warn!("ASI SDK not loaded, camera operations will fail");
    }
    Box::new(camera)
}

fn cmd_serve(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    let config = load_config(
        cli,
        Overrides {
            bind: args.bind.clone(),
            port: args.port,
            no_connect: args.no_connect,
            sdk_libs: args.sdk.sdk_lib.clone(),
        },
    )?;
    let addr = config.bind_addr()?;

    let session = Arc::new(Session::new(
        build_backend(&args.sdk, &config),
        config.session_options(SessionTimings::default()),
    ));

    if config.camera.auto_connect {
        match session.connect() {
            Ok(device) => info!(name = %device.name, "Camera ready"),
            Err(e) => warn!(error = %e, "Camera not connected, POST /camera/connect to retry"),
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let state = AppState::new(Arc::clone(&session), config.mjpeg_interval());
    let shutdown_session = Arc::clone(&session);
    runtime.block_on(async move {
        let shutdown = async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            if let Err(e) = tokio::task::spawn_blocking(move || shutdown_session.close()).await {
                warn!(error = %e, "Session close task failed");
            }
        };
        web::serve(addr, state, shutdown).await
    })?;

    session.close();
    Ok(())
}

#[derive(Serialize)]
struct ProbeReport {
    backend: &'static str,
    cameras: Vec<DeviceInfo>,
}

fn cmd_probe(cli: &Cli, args: &SdkArgs) -> anyhow::Result<()> {
    let config = load_config(
        cli,
        Overrides {
            sdk_libs: args.sdk_lib.clone(),
            ..Overrides::default()
        },
    )?;
    let handle = DeviceHandle::new(build_backend(args, &config));
    let cameras = handle.enumerate()?;

    if cli.log_format.is_json() {
        let report = ProbeReport {
            backend: if args.mock { "mock" } else { "sdk" },
            cameras,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if cameras.is_empty() {
        println!("No cameras found");
        return Ok(());
    }
    for (index, camera) in cameras.iter().enumerate() {
        println!(
            "{} {} (id {}) {}x{} {}",
            style(format!("[{index}]")).dim(),
            style(&camera.name).bold(),
            camera.camera_id,
            camera.max_width,
            camera.max_height,
            if camera.is_color { "colour" } else { "mono" },
        );
    }
    Ok(())
}

fn cmd_version(cli: &Cli) {
    if cli.log_format.is_json() {
        let info = serde_json::json!({
            "version": build_info::VERSION,
            "git_sha": build_info::git_sha(),
            "git_dirty": build_info::git_dirty() == "true",
            "build_timestamp": build_info::build_timestamp(),
            "rustc_version": build_info::rustc_semver(),
            "target": build_info::target(),
        });
        println!("{info:#}");
    } else {
        println!("skycam {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
}

fn cmd_completions(args: &CompletionsArgs) {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "skycam", &mut io::stdout());
}

fn output_error(cli: &Cli, error: &anyhow::Error) {
    let cam = error.downcast_ref::<CamError>();
    let suggestion = cam.and_then(CamError::suggestion);
    if cli.log_format.is_json() {
        let json = serde_json::json!({
            "error": true,
            "message": format!("{error:#}"),
            "suggestion": suggestion,
            "recoverable": cam.is_some_and(CamError::is_user_recoverable),
        });
        eprintln!("{json:#}");
    } else {
        eprintln!("{}: {error:#}", style("Error").red().bold());
        if let Some(suggestion) = suggestion {
            eprintln!("{}: {suggestion}", style("Hint").yellow());
        }
    }
}
