use std::path::PathBuf;

use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use kindred::{
    domain::{Category, UpdateUserRequest, User},
    service::ServiceContext,
    store::ListKey,
};

use super::read_photo;
use crate::cli::{output::print_json, OutputFormat};

#[derive(Subcommand)]
pub enum ProfileCommands {
    #[command(about = "Show your profile")]
    Show,

    #[command(about = "Update your profile once the backend confirms it")]
    Update {
        #[arg(long, help = "Short family description")]
        about_us: Option<String>,
        #[arg(long, help = "Locality, e.g. kolar or ashoka_garden")]
        category: Option<String>,
        #[arg(long, help = "Banner image file")]
        banner: Option<PathBuf>,
    },
}

fn print_profile(user: &User, members: usize, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json!({ "user": user, "members": members })),
        OutputFormat::Text => {
            println!("{}  {}", user.id, user.email);
            if let Some(category) = user.category {
                println!("  category: {}", category.label());
            }
            if !user.about_us.is_empty() {
                println!("  about:    {}", user.about_us);
            }
            if let Some(banner) = &user.banner {
                println!("  banner:   {}", banner);
            }
            println!("  members:  {}", members);
            Ok(())
        }
    }
}

pub async fn handle(cmd: ProfileCommands, ctx: &ServiceContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ProfileCommands::Show => {
            ctx.directory_service.load_profile().await?;
        }
        ProfileCommands::Update {
            about_us,
            category,
            banner,
        } => {
            let category = category
                .map(|c| Category::from_str(&c).ok_or_else(|| anyhow!("Unknown category: {}", c)))
                .transpose()?;
            let banner = match banner {
                Some(path) => Some(read_photo(&path).await?),
                None => None,
            };
            ctx.directory_service.load_profile().await?;
            ctx.directory_service
                .update_profile(UpdateUserRequest {
                    about_us,
                    category,
                    banner,
                })
                .await?;
        }
    }

    let store = ctx.store.read().await;
    let user = store.profile().ok_or_else(|| anyhow!("Profile not loaded"))?;
    print_profile(user, store.members(&ListKey::MyMembers).len(), output_format)
}
