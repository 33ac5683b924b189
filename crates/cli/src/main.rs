mod commands;
mod logging;

use clap::{ArgGroup, Parser, Subcommand};
use leafpress_content::StatusLevel;
use std::path::PathBuf;

use logging::LoggingConfig;

#[derive(Parser, Debug)]
#[command(name = "leafpress")]
#[command(about = "Resolve objects and folder paths from a leafpress content repository")]
#[command(group(ArgGroup::new("source").args(["fixture", "database_url"])))]
pub struct Cli {
    /// Loader configuration (YAML)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Repository fixture file (JSON or YAML)
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// PostgreSQL connection URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Translation language
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Visible statuses: on, draft or all
    #[arg(long, global = true, value_parser = parse_status_level)]
    pub status: Option<StatusLevel>,

    /// Log level filter
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Load one object by id or uname
    Object {
        /// Object id or uname
        id: String,

        /// Object type; the concrete type is looked up when omitted
        #[arg(long, short = 't')]
        object_type: Option<String>,

        /// Include spec overriding the type defaults, e.g. "poster|1,has_media"
        #[arg(long)]
        include: Option<String>,
    },

    /// List objects of a type
    Objects {
        /// Object type
        #[arg(default_value = "objects")]
        object_type: String,

        /// Filter as key=value, repeatable (e.g. --filter parent=3)
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,

        /// Page number, 1-based
        #[arg(long)]
        page: Option<usize>,

        /// Page size
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Print only the number of matching objects
        #[arg(long)]
        count: bool,
    },

    /// List objects related through an association
    Related {
        /// Object id or uname
        id: String,

        /// Association name, e.g. children or has_media
        association: String,

        /// Restrict related objects to a type
        #[arg(long, short = 't', default_value = "objects")]
        object_type: String,

        /// Filter as key=value, repeatable
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
    },

    /// Resolve a folder path to its chain of objects
    Path {
        /// Unames separated by "/"
        path: String,

        /// Resolve below this folder (id or uname)
        #[arg(long)]
        relative_to: Option<String>,
    },

    /// List every tree path reaching an object
    Paths {
        /// Object id or uname
        id: String,

        /// Only paths below this folder (id or uname)
        #[arg(long)]
        relative_to: Option<String>,

        /// Only paths through this folder (id or uname)
        #[arg(long)]
        via: Option<String>,

        /// Print only the canonical path
        #[arg(long)]
        canonical: bool,
    },
}

fn parse_status_level(value: &str) -> Result<StatusLevel, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" => Ok(StatusLevel::On),
        "draft" => Ok(StatusLevel::Draft),
        "all" => Ok(StatusLevel::All),
        other => Err(format!("unknown status level '{}' (expected on, draft or all)", other)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&LoggingConfig::new(&cli.log_level, cli.json_logs))?;

    let session = commands::Session::open(&cli).await?;
    let output = match &cli.command {
        Commands::Object {
            id,
            object_type,
            include,
        } => commands::object::run(&session, id, object_type.as_deref(), include.as_deref()).await?,
        Commands::Objects {
            object_type,
            filters,
            page,
            limit,
            count,
        } => commands::objects::list(&session, object_type, filters, *page, *limit, *count).await?,
        Commands::Related {
            id,
            association,
            object_type,
            filters,
        } => commands::objects::related(&session, id, association, object_type, filters).await?,
        Commands::Path { path, relative_to } => {
            commands::tree::path(&session, path, relative_to.as_deref()).await?
        }
        Commands::Paths {
            id,
            relative_to,
            via,
            canonical,
        } => commands::tree::paths(&session, id, relative_to.as_deref(), via.as_deref(), *canonical).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_command() {
        let cli = Cli::try_parse_from([
            "leafpress",
            "--fixture",
            "site.yaml",
            "object",
            "hello",
            "-t",
            "documents",
            "--lang",
            "it",
        ])
        .unwrap();

        assert_eq!(cli.fixture, Some(PathBuf::from("site.yaml")));
        assert_eq!(cli.lang.as_deref(), Some("it"));
        assert_eq!(
            cli.command,
            Commands::Object {
                id: "hello".to_string(),
                object_type: Some("documents".to_string()),
                include: None,
            }
        );
    }

    #[test]
    fn test_parse_objects_filters() {
        let cli = Cli::try_parse_from([
            "leafpress",
            "--database-url",
            "postgres://localhost/site",
            "objects",
            "documents",
            "-f",
            "parent=3",
            "--filter",
            "status=on,draft",
            "--page",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Objects {
                object_type,
                filters,
                page,
                limit,
                count,
            } => {
                assert_eq!(object_type, "documents");
                assert_eq!(filters, vec!["parent=3", "status=on,draft"]);
                assert_eq!(page, Some(2));
                assert_eq!(limit, 20);
                assert!(!count);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_paths_and_status() {
        let cli = Cli::try_parse_from([
            "leafpress",
            "paths",
            "hello",
            "--via",
            "about",
            "--fixture",
            "site.json",
            "--status",
            "draft",
        ])
        .unwrap();
        assert_eq!(cli.status, Some(StatusLevel::Draft));
        assert!(matches!(cli.command, Commands::Paths { canonical: false, .. }));
    }

    #[test]
    fn test_sources_are_exclusive() {
        assert!(Cli::try_parse_from([
            "leafpress",
            "--fixture",
            "a.yaml",
            "--database-url",
            "postgres://x",
            "object",
            "hello"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["leafpress", "--fixture", "a.yaml", "--status", "live", "object", "1"]).is_err());
    }

    #[tokio::test]
    async fn test_session_needs_a_source() {
        let cli = Cli::try_parse_from(["leafpress", "object", "hello"]).unwrap();
        let err = commands::Session::open(&cli).await.err().unwrap();
        assert!(err.to_string().contains("--fixture"));
    }
}
