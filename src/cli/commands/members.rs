use std::path::PathBuf;

use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use kindred::{
    domain::{parse_dob, CreateMemberRequest, MemberId},
    projection::{ProjectionOptions, SortSpec},
    query::Location,
    service::ServiceContext,
    store::ListKey,
};

use super::read_photo;
use crate::cli::{
    output::{member_line, print_json, print_member, print_projection},
    OutputFormat,
};

#[derive(Subcommand)]
pub enum MemberCommands {
    #[command(about = "List directory members, optionally searched")]
    List {
        #[arg(long, help = "Search text")]
        search: Option<String>,
        #[arg(long, help = "App location to restore, e.g. '/?search=jane'")]
        location: Option<String>,
        #[arg(long, help = "Sort such as name-asc or createdAt-desc")]
        sort: Option<String>,
        #[arg(long, help = "Group by first-name initial")]
        grouped: bool,
    },

    #[command(about = "Search interactively; each input line replaces the search text")]
    Search {
        #[arg(long, help = "Sort such as name-asc or createdAt-desc")]
        sort: Option<String>,
        #[arg(long, help = "Group by first-name initial")]
        grouped: bool,
    },

    #[command(about = "List your own members")]
    Mine {
        #[arg(long, help = "Filter text")]
        search: Option<String>,
        #[arg(long, help = "Sort such as name-asc or createdAt-desc")]
        sort: Option<String>,
        #[arg(long, help = "Group by first-name initial")]
        grouped: bool,
    },

    #[command(about = "Show a member with the rest of its family")]
    Show {
        #[arg(help = "Member id")]
        id: String,
    },

    #[command(about = "Add a member to your directory")]
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        address: String,
        #[arg(long, help = "Date of birth, YYYY-MM-DD")]
        dob: Option<String>,
        #[arg(long, help = "Profile picture file")]
        dp: Option<PathBuf>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    #[command(about = "Edit one of your members; only changed fields are sent")]
    Edit {
        #[arg(help = "Member id")]
        id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, help = "Date of birth, YYYY-MM-DD")]
        dob: Option<String>,
        #[arg(long, help = "New profile picture file")]
        dp: Option<PathBuf>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    #[command(about = "Ask an administrator to review your pending members")]
    RequestApproval,
}

pub(crate) fn projection_options(sort: Option<String>, grouped: bool) -> anyhow::Result<ProjectionOptions> {
    match (sort, grouped) {
        (Some(_), true) => Err(anyhow!("--sort and --grouped cannot be combined")),
        (None, true) => Ok(ProjectionOptions::grouped()),
        (Some(sort), false) => {
            let spec = SortSpec::parse(&sort).ok_or_else(|| anyhow!("Unknown sort: {}", sort))?;
            Ok(ProjectionOptions::flat(Some(spec)))
        }
        (None, false) => Ok(ProjectionOptions::default()),
    }
}

async fn print_directory(ctx: &ServiceContext, options: &ProjectionOptions, format: OutputFormat) -> anyhow::Result<()> {
    let text = ctx.search.text();
    let store = ctx.store.read().await;
    if let Some(e) = store.error(&ListKey::Directory) {
        eprintln!("Search failed: {}", e);
    }
    if format == OutputFormat::Text {
        println!("-- {} --", ctx.search.location());
    }
    print_projection(&store.project(&ListKey::Directory, &text, options), format)
}

pub async fn handle(cmd: MemberCommands, ctx: &ServiceContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MemberCommands::List {
            search,
            location,
            sort,
            grouped,
        } => {
            let options = projection_options(sort, grouped)?;
            let location = match (location, search) {
                (Some(location), _) => location,
                (None, Some(search)) => Location::parse("/").with_search(&search).to_string(),
                (None, None) => "/".to_string(),
            };
            ctx.search.initialize(&location).await?;
            print_directory(ctx, &options, output_format).await
        }
        MemberCommands::Search { sort, grouped } => {
            let options = projection_options(sort, grouped)?;
            ctx.search.initialize("/").await?;
            print_directory(ctx, &options, output_format).await?;

            let mut applied = ctx.search.subscribe();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut pending = None;

            loop {
                tokio::select! {
                    line = lines.next_line() => match line? {
                        Some(line) => pending = Some(ctx.search.set_query(line)),
                        None => break,
                    },
                    changed = applied.changed() => {
                        changed?;
                        print_directory(ctx, &options, output_format).await?;
                    }
                }
            }

            if let Some(pending) = pending {
                if pending.finished().await && applied.has_changed().unwrap_or(false) {
                    print_directory(ctx, &options, output_format).await?;
                }
            }
            Ok(())
        }
        MemberCommands::Mine { search, sort, grouped } => {
            let options = projection_options(sort, grouped)?;
            ctx.directory_service.load_profile().await?;
            let store = ctx.store.read().await;
            let projection = store.project(&ListKey::MyMembers, search.as_deref().unwrap_or_default(), &options);
            print_projection(&projection, output_format)?;
            if output_format == OutputFormat::Text && store.has_pending(&ListKey::MyMembers) {
                println!("Some members await approval; `kindred members request-approval` notifies an administrator.");
            }
            Ok(())
        }
        MemberCommands::Show { id } => {
            ctx.directory_service.open_member(&MemberId::new(id)).await?;
            let store = ctx.store.read().await;
            let member = store.focused().ok_or_else(|| anyhow!("Member not found"))?;
            let owner = store.focused_owner();
            let siblings = store.siblings();

            match output_format {
                OutputFormat::Json => print_json(&json!({
                    "member": member,
                    "owner": owner,
                    "siblings": siblings,
                })),
                OutputFormat::Text => {
                    print_member(member, output_format)?;
                    if let Some(owner) = owner {
                        println!("  family:  {}", owner.email);
                        if !owner.about_us.is_empty() {
                            println!("  about:   {}", owner.about_us);
                        }
                    }
                    if !siblings.is_empty() {
                        println!("Also in this family:");
                        for sibling in siblings {
                            println!("  {}", member_line(sibling));
                        }
                    }
                    Ok(())
                }
            }
        }
        MemberCommands::Add {
            first_name,
            last_name,
            address,
            dob,
            dp,
            email,
            phone,
        } => {
            let dob = dob.map(|d| parse_dob(&d)).transpose()?;
            let dp = match dp {
                Some(path) => Some(read_photo(&path).await?),
                None => None,
            };
            // Fills the owner of the new member.
            ctx.directory_service.load_profile().await?;

            let request = CreateMemberRequest {
                first_name,
                last_name,
                address,
                email,
                phone_number: phone,
                dob,
                dp,
            };
            let member = ctx.directory_service.create_member(request).await?;
            print_member(&member, output_format)
        }
        MemberCommands::Edit {
            id,
            first_name,
            last_name,
            address,
            dob,
            dp,
            email,
            phone,
        } => {
            let dob = dob.map(|d| parse_dob(&d)).transpose()?;
            let photo = match dp {
                Some(path) => Some(read_photo(&path).await?),
                None => None,
            };
            ctx.directory_service.load_profile().await?;

            let updated = ctx
                .directory_service
                .edit_member(&MemberId::new(id), photo, |member| {
                    if let Some(v) = first_name {
                        member.first_name = v;
                    }
                    if let Some(v) = last_name {
                        member.last_name = v;
                    }
                    if let Some(v) = address {
                        member.address = v;
                    }
                    if let Some(v) = email {
                        member.email = v;
                    }
                    if let Some(v) = phone {
                        member.phone_number = v;
                    }
                    if dob.is_some() {
                        member.dob = dob;
                    }
                })
                .await?;

            match updated {
                Some(member) => print_member(&member, output_format),
                None => {
                    println!("Nothing changed");
                    Ok(())
                }
            }
        }
        MemberCommands::RequestApproval => {
            ctx.directory_service.load_profile().await?;
            ctx.directory_service.request_approval().await?;
            println!("Approval requested");
            Ok(())
        }
    }
}
