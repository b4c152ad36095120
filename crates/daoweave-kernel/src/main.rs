use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use daoweave_kernel::{hash_snippet, init_logging, run, LogFormat, RunOptions};

fn cli() -> Command {
    Command::new("daoweave")
        .version(daoweave_core::VERSION)
        .about("Keeps generated members of greenDAO entity sources up to date")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug level logging, unless RUST_LOG is set"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Format of log lines on stderr"),
        )
        .subcommand(
            Command::new("run")
                .about("Reconcile entity sources")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration file (default: ./daoweave.toml if present)"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report changes without writing them"),
                )
                .arg(
                    Arg::new("fail-fast")
                        .long("fail-fast")
                        .action(ArgAction::SetTrue)
                        .help("Stop at the first failing file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON"),
                )
                .arg(
                    Arg::new("paths")
                        .num_args(0..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Source roots or files, overriding the configured ones"),
                ),
        )
        .subcommand(
            Command::new("hash")
                .about("Print the @Generated hash of a member")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File holding the member, or - for stdin"),
                ),
        )
}

fn run_command(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let options = RunOptions {
        config: args.get_one::<PathBuf>("config").cloned(),
        paths: args.get_many::<PathBuf>("paths").map(|p| p.cloned().collect()).unwrap_or_default(),
        dry_run: args.get_flag("dry-run"),
        fail_fast: args.get_flag("fail-fast"),
        json: args.get_flag("json"),
    };
    let cwd = std::env::current_dir().context("reading working directory")?;
    let (report, rendered) = run(&options, &cwd)?;
    print!("{rendered}");
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn hash_command(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let Some(file) = args.get_one::<PathBuf>("file") else {
        return Ok(ExitCode::FAILURE);
    };
    let text = if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("reading stdin")?;
        text
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?
    };
    println!("{}", hash_snippet(&text));
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    let format = matches
        .get_one::<String>("log-format")
        .and_then(|f| LogFormat::parse(f))
        .unwrap_or_default();
    init_logging(matches.get_flag("verbose"), format);

    let result = match matches.subcommand() {
        Some(("run", args)) => run_command(args),
        Some(("hash", args)) => hash_command(args),
        _ => Ok(ExitCode::FAILURE),
    };
    match result {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(error = %error, "daoweave failed");
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}
