//! clang-format installer CLI entrypoint.
//!
//! This binary lists, downloads, and installs verified clang-format release
//! binaries. It wires the production collaborators into the library's
//! pipeline operations and reports failures on stderr.

use clang_format_installer::artefact::extraction::XzTarExtractor;
use clang_format_installer::artefact::target::Platform;
use clang_format_installer::cli::{Cli, Command, DownloadArgs};
use clang_format_installer::config::Settings;
use clang_format_installer::error::Result;
use clang_format_installer::pipeline::{self, DownloadReport, PipelineContext};
use clang_format_installer::progress::BarProgress;
use clang_format_installer::scratch::ScratchSpace;
use clang_format_installer::transport::UreqTransport;
use clang_format_installer::verification::process::SystemCommandRunner;
use clang_format_installer::verification::{SchemeVerifierFactory, SignatureScheme};
use clap::Parser;
use log::info;
use std::error::Error;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .format_timestamp(None)
        .init();

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    if let Command::Install(args) = &cli.command {
        pipeline::install(
            &args.clang_format_version,
            &args.download_dir,
            &args.install_dir,
        )?;
        return Ok(());
    }

    let settings = Settings::from_env();
    let transport = UreqTransport::new(&settings);
    let runner = SystemCommandRunner;
    let keyrings = match &cli.command {
        Command::Download(args) => args.trusted_keyring.clone(),
        Command::ListAll | Command::Install(_) => Vec::new(),
    };
    let verifiers =
        SchemeVerifierFactory::new(SignatureScheme::from_keyrings(keyrings), &settings, &runner);
    let platform = Platform::current()?;
    let scratch = scratch_space(cli);
    let progress = BarProgress::new();

    let context = PipelineContext {
        transport: &transport,
        releases_url: settings.releases_url(),
        verifiers: &verifiers,
        extractor: &XzTarExtractor,
        platform: &platform,
        scratch: &scratch,
        progress: &progress,
    };

    match &cli.command {
        Command::ListAll => {
            let versions = pipeline::list_all(&context)?;
            writeln!(stdout, "{}", versions.join(" "))?;
        }
        Command::Download(args) => run_download(&context, args)?,
        Command::Install(_) => {}
    }

    Ok(())
}

fn run_download(context: &PipelineContext<'_>, args: &DownloadArgs) -> Result<()> {
    let report = pipeline::download(
        context,
        &args.clang_format_version,
        &args.download_dir,
        args.stop_after(),
    )?;
    match report {
        DownloadReport::Verified { version } => {
            info!("Verified the clang-format {version} archive");
        }
        DownloadReport::Extracted { binary } => info!("Downloaded {binary}"),
    }
    Ok(())
}

fn scratch_space(cli: &Cli) -> ScratchSpace {
    cli.temp_dir
        .clone()
        .map_or(ScratchSpace::Ephemeral, ScratchSpace::Persistent)
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            let mut source = err.source();
            while let Some(cause) = source {
                write_stderr_line(stderr, format!("  caused by: {cause}"));
                source = cause.source();
            }
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
