use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for the `praxis` binary.
#[derive(Debug, Parser)]
#[command(name = "praxis", version, about = "Praxis - practice management backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read configuration from this TOML file instead of the default locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides `server.bind`)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Open the database and apply pending migrations
    Migrate,

    /// Manage doctor accounts
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommands {
    /// Create a doctor account
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// Public page slug (derived from the name when omitted)
        #[arg(long)]
        slug: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands, UserCommands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_bind_override() {
        let cli = Cli::try_parse_from(["praxis", "serve", "--bind", "0.0.0.0:8080"])
            .expect("cli should parse");
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.as_deref(), Some("0.0.0.0:8080")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["praxis", "migrate", "--verbose", "--config", "/tmp/p.toml"])
            .expect("cli should parse");
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::Migrate));
    }

    #[test]
    fn user_create_requires_credentials() {
        let parsed = Cli::try_parse_from(["praxis", "user", "create", "--email", "a@b.c"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from([
            "praxis",
            "user",
            "create",
            "--email",
            "ana@clinic.com",
            "--name",
            "Ana Souza",
            "--password",
            "s3cret-pass",
        ])
        .expect("cli should parse");
        let Commands::User {
            action: UserCommands::Create { email, slug, .. },
        } = cli.command
        else {
            panic!("expected user create");
        };
        assert_eq!(email, "ana@clinic.com");
        assert!(slug.is_none());
    }
}
