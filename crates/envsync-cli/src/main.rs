//! `envsync` binary: drives the environment managers over JSON environment files

use anyhow::Result;
use clap::{value_parser, Arg, ArgMatches, Command};
use envsync_cli::{
    add, delete, load_config, machines, parse_memory, read_environment, rename, set_memory,
    to_json, types, validate, STDIN_PATH,
};
use envsync_manager::EnvironmentRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn environment_arg() -> Arg {
    Arg::new("environment")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Environment JSON file, '-' for stdin")
}

fn cli() -> Command {
    Command::new("envsync")
        .version(envsync_cli::VERSION)
        .about("Keep workspace recipes and machine configuration in sync")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Manager configuration (TOML)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter, overrides RUST_LOG (e.g. debug, envsync_manager=trace)"),
        )
        .subcommand(
            Command::new("machines")
                .about("List machines of an environment")
                .arg(environment_arg()),
        )
        .subcommand(
            Command::new("rename")
                .about("Rename a machine")
                .arg(environment_arg())
                .arg(Arg::new("old").required(true).help("Current machine name"))
                .arg(Arg::new("new").required(true).help("New machine name")),
        )
        .subcommand(
            Command::new("set-memory")
                .about("Set the memory limit of a machine")
                .arg(environment_arg())
                .arg(Arg::new("machine").required(true).help("Machine name"))
                .arg(
                    Arg::new("limit")
                        .required(true)
                        .help("Bytes, or a limit such as 512Mi or 2Gi"),
                ),
        )
        .subcommand(
            Command::new("add")
                .about("Add a default machine")
                .arg(environment_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a machine")
                .arg(environment_arg())
                .arg(Arg::new("machine").required(true).help("Machine name")),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate an environment")
                .arg(environment_arg()),
        )
        .subcommand(Command::new("types").about("List supported recipe types"))
}

fn init_logging(level: Option<&String>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Global option value, whether given before or after the subcommand
fn global_value<'a, T>(matches: &'a ArgMatches, name: &str) -> Option<&'a T>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(name)
        .or_else(|| matches.subcommand().and_then(|(_, args)| args.get_one::<T>(name)))
}

fn string_arg<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name).map_or("", String::as_str)
}

fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let config = load_config(global_value::<PathBuf>(matches, "config").map(PathBuf::as_path))?;
    let registry = EnvironmentRegistry::with_defaults(&config);

    let Some((name, args)) = matches.subcommand() else {
        return Ok(ExitCode::FAILURE);
    };
    if name == "types" {
        println!("{}", to_json(&types(&registry))?);
        return Ok(ExitCode::SUCCESS);
    }

    let path = args
        .get_one::<PathBuf>("environment")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(STDIN_PATH));
    let environment = read_environment(&path)?;
    tracing::debug!(command = name, recipe_type = environment.recipe_type(), "running");

    let output = match name {
        "machines" => to_json(&machines(&registry, &environment)?)?,
        "rename" => to_json(&rename(
            &registry,
            &environment,
            string_arg(args, "old"),
            string_arg(args, "new"),
        )?)?,
        "set-memory" => {
            let bytes = parse_memory(string_arg(args, "limit"))?;
            to_json(&set_memory(&registry, &environment, string_arg(args, "machine"), bytes)?)?
        }
        "add" => to_json(&add(&registry, &environment)?)?,
        "delete" => to_json(&delete(&registry, &environment, string_arg(args, "machine"))?)?,
        "validate" => {
            let validation = validate(&registry, &environment);
            println!("{}", to_json(&validation)?);
            return Ok(if validation.is_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        other => anyhow::bail!("unknown command '{other}'"),
    };
    println!("{output}");
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(global_value::<String>(&matches, "log-level"));

    match run(&matches) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
