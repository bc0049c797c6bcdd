use anyhow::anyhow;
use chrono::Utc;
use clap::Subcommand;
use futures_util::future::join_all;
use serde_json::json;

use kindred::{
    domain::{Category, MemberId, UserId},
    projection::{project_users, StatusFilter, UserQuery},
    service::{ServiceContext, ToggleOutcome},
    store::ListKey,
};

use super::members::projection_options;
use crate::cli::{
    output::{print_json, print_projection, user_line},
    OutputFormat,
};

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "List registered users")]
    Users {
        #[arg(long, help = "Filter by email or category text")]
        search: Option<String>,
        #[arg(long, help = "Only this category")]
        category: Option<String>,
        #[arg(long, help = "Sort such as email-asc or createdAt-desc")]
        sort: Option<String>,
    },

    #[command(about = "List members across all users, or of one user")]
    Members {
        #[arg(long, help = "Only members of this user id")]
        user: Option<String>,
        #[arg(long, help = "Filter text")]
        search: Option<String>,
        #[arg(long, default_value = "all", help = "all, approved or pending")]
        status: String,
        #[arg(long, help = "Sort such as name-asc or createdAt-desc")]
        sort: Option<String>,
        #[arg(long, help = "Group by first-name initial")]
        grouped: bool,
    },

    #[command(about = "Toggle approval of one or more members")]
    Approve {
        #[arg(required = true, help = "Member ids")]
        ids: Vec<String>,
    },

    #[command(about = "Approval and registration counts")]
    Stats,
}

pub async fn handle(cmd: AdminCommands, ctx: &ServiceContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Users { search, category, sort } => {
            let category = category
                .map(|c| Category::from_str(&c).ok_or_else(|| anyhow!("Unknown category: {}", c)))
                .transpose()?;
            let mut query = UserQuery {
                text: search.unwrap_or_default(),
                category,
                ..Default::default()
            };
            if let Some(sort) = sort {
                query = query.with_sort(&sort).ok_or_else(|| anyhow!("Unknown sort: {}", sort))?;
            }

            ctx.admin_service.load_users().await?;
            let store = ctx.store.read().await;
            let users = project_users(store.users(), &query);

            match output_format {
                OutputFormat::Json => print_json(&users),
                OutputFormat::Text => {
                    for user in &users {
                        println!("{}", user_line(user, store.member_count(&user.id)));
                    }
                    println!("{} user(s)", users.len());
                    Ok(())
                }
            }
        }
        AdminCommands::Members {
            user,
            search,
            status,
            sort,
            grouped,
        } => {
            let status = StatusFilter::from_str(&status).ok_or_else(|| anyhow!("Unknown status: {}", status))?;
            let options = projection_options(sort, grouped)?.with_status(status);

            let key = match user {
                Some(user) => {
                    let user_id = UserId::new(user);
                    ctx.admin_service.load_user_members(&user_id).await?;
                    ListKey::UserMembers(user_id)
                }
                None => {
                    ctx.admin_service.load_users().await?;
                    ListKey::AllMembers
                }
            };

            let store = ctx.store.read().await;
            let projection = store.project(&key, search.as_deref().unwrap_or_default(), &options);
            print_projection(&projection, output_format)
        }
        AdminCommands::Approve { ids } => {
            let ids: Vec<MemberId> = ids.into_iter().map(MemberId::new).collect();
            let results = join_all(ids.iter().map(|id| ctx.approval_service.toggle(id))).await;

            let mut failures = 0;
            for (id, result) in ids.iter().zip(results) {
                match result {
                    Ok(ToggleOutcome::Toggled { is_approved }) => {
                        println!("{}  {}", id, if is_approved { "approved" } else { "pending" });
                    }
                    Ok(ToggleOutcome::AlreadyInFlight) => {
                        println!("{}  skipped, already being toggled", id);
                    }
                    Err(e) if e.is_auth_failure() => return Err(e.into()),
                    Err(e) => {
                        eprintln!("{}", e);
                        failures += 1;
                    }
                }
            }

            if failures > 0 {
                return Err(anyhow!("{} approval toggle(s) failed", failures));
            }
            Ok(())
        }
        AdminCommands::Stats => {
            ctx.admin_service.load_users().await?;
            let now = Utc::now();
            let store = ctx.store.read().await;
            let members = store.approval_stats(&ListKey::AllMembers, now);
            let users = store.user_stats(now);

            match output_format {
                OutputFormat::Json => print_json(&json!({ "members": members, "users": users })),
                OutputFormat::Text => {
                    println!(
                        "members: {} total, {} approved, {} pending, {} new this month",
                        members.total, members.approved, members.pending, members.new_this_month
                    );
                    println!(
                        "users:   {} total, {} with members, {} new this month",
                        users.total, users.with_members, users.new_this_month
                    );
                    Ok(())
                }
            }
        }
    }
}
