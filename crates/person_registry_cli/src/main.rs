//! Operator CLI for the person registry.
//!
//! # Responsibility
//! - Provide a minimal executable over `person_registry_core`.
//! - Resolve configuration from the environment and bootstrap logging/db.
//!
//! Exit codes: `0` success, `1` runtime error, `2` usage error.

use log::info;
use person_registry_core::db::open_db;
use person_registry_core::{
    core_version, init_logging, validate_cpf, PersonListQuery, PersonService, RegistryConfig,
    SqlitePersonRepository,
};
use std::process::ExitCode;

const USAGE: &str = "usage: person_registry_cli <validate CPF | list [SEARCH] | stats | version>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Validate(String),
    List(Option<String>),
    Stats,
    Version,
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [cmd, cpf] if cmd == "validate" => Some(Command::Validate(cpf.clone())),
        [cmd] if cmd == "list" => Some(Command::List(None)),
        [cmd, search] if cmd == "list" => Some(Command::List(Some(search.clone()))),
        [cmd] if cmd == "stats" => Some(Command::Stats),
        [cmd] if cmd == "version" => Some(Command::Version),
        _ => None,
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(1)
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    // Pure commands need neither configuration nor storage.
    match &command {
        Command::Version => {
            println!("person_registry_core version={}", core_version());
            return Ok(());
        }
        Command::Validate(raw) => {
            return match validate_cpf(raw) {
                Ok(digits) => {
                    println!("valid {digits}");
                    Ok(())
                }
                Err(err) => Err(format!("invalid cpf: {err}")),
            };
        }
        Command::List(_) | Command::Stats => {}
    }

    let config = RegistryConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }
    info!("event=cli_start module=cli status=ok");

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let repo = SqlitePersonRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = PersonService::new(repo);

    match command {
        Command::List(search) => {
            let query = PersonListQuery {
                search,
                ..PersonListQuery::default()
            };
            let persons = service.list(&query).map_err(|err| err.to_string())?;
            for person in &persons {
                println!(
                    "{}\t{}\t{}\t{}",
                    person.id,
                    person.identifier.formatted(),
                    person.birth_date,
                    person.name
                );
            }
        }
        Command::Stats => {
            let stats = service.stats().map_err(|err| err.to_string())?;
            println!(
                "total={} male={} female={} other={} with_email={}",
                stats.total, stats.male, stats.female, stats.other, stats.with_email
            );
        }
        Command::Version | Command::Validate(_) => {}
    }

    Ok(())
}
