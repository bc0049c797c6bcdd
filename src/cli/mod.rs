pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use kindred::service::ServiceContext;

#[derive(Parser)]
#[command(name = "kindred")]
#[command(about = "Kindred - community member directory client")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Sign in, register and sign out")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Browse, search and manage directory members")]
    Members {
        #[command(subcommand)]
        cmd: commands::members::MemberCommands,
    },

    #[command(about = "Show or update your profile")]
    Profile {
        #[command(subcommand)]
        cmd: commands::profile::ProfileCommands,
    },

    #[command(about = "User oversight and member approval")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, ctx: &ServiceContext) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, ctx, output_format).await,
        Commands::Members { cmd } => commands::members::handle(cmd, ctx, output_format).await,
        Commands::Profile { cmd } => commands::profile::handle(cmd, ctx, output_format).await,
        Commands::Admin { cmd } => commands::admin::handle(cmd, ctx, output_format).await,
    }
}
