// Copyright 2026 Sagres Navigator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sagres command-line client: entry point.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;

use sagres_navigator::model::DemandOffer;
use sagres_navigator::{InstitutionRegistry, Navigator, NavigatorConfig, OperationResult, SectionFilter};

#[derive(Parser)]
#[command(
    name = "sagres",
    about = "Command-line client for the Sagres academic portal",
    version
)]
struct Cli {
    /// Institution id (UEFS, UESC, UNEB, UESB). Overrides SAGRES_INSTITUTION.
    #[arg(short, long)]
    institution: Option<String>,

    /// Cookie file. Overrides SAGRES_COOKIE_FILE.
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Keep cookies in memory only.
    #[arg(long, conflicts_with = "cookies")]
    no_cookies: bool,

    /// Portal username. Falls back to SAGRES_USERNAME.
    #[arg(short, long)]
    username: Option<String>,

    /// Portal password. Falls back to SAGRES_PASSWORD.
    #[arg(short, long)]
    password: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and keep the session cookies.
    Login,

    /// Start page summary: student name, terms and notices.
    Start,

    /// The logged-in person, as seen by the API.
    Me,

    /// Messages sent to a person (the logged-in one by default).
    Messages {
        /// Person id.
        #[arg(long)]
        person: Option<i64>,

        /// Follow the pagination to the oldest message.
        #[arg(long)]
        all: bool,
    },

    /// Report card of the current term, or of `--semester`.
    Grades {
        /// Term id, e.g. 20191.
        #[arg(long)]
        semester: Option<i64>,
    },

    /// Class sections with their lectures and materials.
    Sections {
        /// Term label, e.g. 2019.1.
        #[arg(long)]
        semester: Option<String>,

        /// Discipline code, e.g. EXA801.
        #[arg(long)]
        code: Option<String>,

        /// Class group, e.g. T01.
        #[arg(long)]
        group: Option<String>,

        /// Stop at the first page of each section.
        #[arg(long)]
        partial: bool,

        /// Use the class selection listing, which includes past terms.
        #[arg(long)]
        all_classes: bool,
    },

    /// Download a report document.
    Download {
        kind: DocumentKind,

        /// Destination file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Requested academic services.
    Services,

    /// List enrollment demand offers, or change their selection.
    Demand {
        /// Codes to select.
        #[arg(long)]
        select: Vec<String>,

        /// Codes to unselect.
        #[arg(long)]
        unselect: Vec<String>,
    },

    /// Print the supported institutions.
    Institutions,
}

#[derive(Clone, Copy, ValueEnum)]
enum DocumentKind {
    History,
    Enrollment,
    Flowchart,
}

/// Print `result` as JSON and fail when it carries no payload.
fn emit<T: Serialize>(task: &str, result: &OperationResult<T>) -> anyhow::Result<()> {
    let payload = match result.payload() {
        Some(payload) => serde_json::to_value(payload)?,
        None => serde_json::Value::Null,
    };
    let output = json!({
        "status": result.status(),
        "code": result.code(),
        "message": result.message(),
        "payload": payload,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    if !result.is_ok() {
        bail!("{task} finished with {}", result.status());
    }
    Ok(())
}

fn config(cli: &Cli) -> anyhow::Result<NavigatorConfig> {
    let mut config = NavigatorConfig::from_env()?;
    if let Some(institution) = &cli.institution {
        config = config.with_institution(institution);
    }
    if cli.no_cookies {
        config = config.with_cookie_file(None);
    } else if let Some(path) = &cli.cookies {
        config = config.with_cookie_file(Some(path));
    }
    Ok(config)
}

fn credentials(cli: &Cli) -> Option<(String, String)> {
    let username = cli
        .username
        .clone()
        .or_else(|| std::env::var("SAGRES_USERNAME").ok())?;
    let password = cli
        .password
        .clone()
        .or_else(|| std::env::var("SAGRES_PASSWORD").ok())?;
    Some((username, password))
}

/// Log in when credentials were given; otherwise rely on persisted cookies.
async fn authenticate(cli: &Cli, navigator: &Navigator) -> anyhow::Result<()> {
    let Some((username, password)) = credentials(cli) else {
        tracing::debug!("No credentials given, using stored cookies");
        return Ok(());
    };
    let login = navigator.login(&username, &password).await;
    if !login.is_success() {
        emit("login", &login.map(|page| page.url))?;
    }
    Ok(())
}

fn list_institutions() -> anyhow::Result<()> {
    let registry = InstitutionRegistry::builtin();
    for id in registry.ids() {
        let institution = registry.get(&id)?;
        println!("{id}\t{}", institution.base_url);
    }
    Ok(())
}

fn revised_offers(select: &[String], unselect: &[String]) -> Vec<DemandOffer> {
    let wanted = |code: &String, selected: bool| DemandOffer {
        id: String::new(),
        code: code.trim().to_uppercase(),
        name: String::new(),
        hours: None,
        selected,
    };
    select
        .iter()
        .map(|code| wanted(code, true))
        .chain(unselect.iter().map(|code| wanted(code, false)))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let navigator = match cli.command {
        Commands::Institutions => return list_institutions(),
        _ => Navigator::new(config(&cli)?).context("cannot build navigator")?,
    };

    match &cli.command {
        Commands::Login => {
            let (username, password) =
                credentials(&cli).context("login needs --username and --password")?;
            let login = navigator.login(&username, &password).await;
            emit("login", &login.map(|page| page.url))?;
        }
        Commands::Start => {
            authenticate(&cli, &navigator).await?;
            emit("start", &navigator.start_page().await)?;
        }
        Commands::Me => {
            authenticate(&cli, &navigator).await?;
            emit("me", &navigator.me().await)?;
        }
        Commands::Messages { person, all } => {
            authenticate(&cli, &navigator).await?;
            let person = match person {
                Some(id) => *id,
                None => {
                    let me = navigator.me().await;
                    match me.payload() {
                        Some(person) => person.id,
                        None => return emit("me", &me),
                    }
                }
            };
            emit("messages", &navigator.messages(person, *all).await)?;
        }
        Commands::Grades { semester } => {
            authenticate(&cli, &navigator).await?;
            let result = match semester {
                Some(id) => navigator.grades_for_semester(*id).await,
                None => navigator.current_grades().await,
            };
            emit("grades", &result)?;
        }
        Commands::Sections {
            semester,
            code,
            group,
            partial,
            all_classes,
        } => {
            authenticate(&cli, &navigator).await?;
            let filter = SectionFilter {
                semester: semester.clone(),
                code: code.clone(),
                group: group.clone(),
            };
            let result = if *all_classes {
                navigator.disciplines(filter, *partial, true).await
            } else {
                navigator.discipline_details(filter, *partial).await
            };
            emit("sections", &result)?;
        }
        Commands::Download { kind, output } => {
            authenticate(&cli, &navigator).await?;
            let result = match kind {
                DocumentKind::History => navigator.download_history(output).await,
                DocumentKind::Enrollment => navigator.download_enrollment(output).await,
                DocumentKind::Flowchart => navigator.download_flowchart(output).await,
            };
            emit("download", &result)?;
        }
        Commands::Services => {
            authenticate(&cli, &navigator).await?;
            emit("services", &navigator.requested_services().await)?;
        }
        Commands::Demand { select, unselect } => {
            authenticate(&cli, &navigator).await?;
            if select.is_empty() && unselect.is_empty() {
                emit("demand", &navigator.load_demand_offers().await)?;
            } else {
                let revised = revised_offers(select, unselect);
                emit("demand", &navigator.create_demand_offer(revised).await)?;
            }
        }
        Commands::Institutions => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sections() {
        let cli = Cli::try_parse_from([
            "sagres", "--no-cookies", "sections", "--code", "exa801", "--partial",
        ])
        .unwrap();
        assert!(cli.no_cookies);
        match cli.command {
            Commands::Sections { code, partial, all_classes, .. } => {
                assert_eq!(code.as_deref(), Some("exa801"));
                assert!(partial);
                assert!(!all_classes);
            }
            _ => panic!("expected sections"),
        }
    }

    #[test]
    fn test_revised_offers() {
        let revised = revised_offers(&["exa802 ".to_string()], &["TEC402".to_string()]);
        assert_eq!(revised.len(), 2);
        assert_eq!(revised[0].code, "EXA802");
        assert!(revised[0].selected);
        assert!(!revised[1].selected);
    }
}
