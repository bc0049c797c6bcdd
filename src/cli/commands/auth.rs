use clap::Subcommand;
use serde_json::json;

use kindred::{
    auth::TokenScope,
    domain::{Category, Credentials, RegisterRequest},
    service::ServiceContext,
};

use crate::cli::{output::print_json, OutputFormat};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in and store the token")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
        #[arg(long, help = "Sign in to the admin surface")]
        admin: bool,
    },

    #[command(about = "Create an account and sign in")]
    Register {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
        #[arg(long, help = "Locality, e.g. kolar or ashoka_garden")]
        category: Option<String>,
        #[arg(long, help = "Short family description")]
        about_us: Option<String>,
        #[arg(long, help = "Register an administrator")]
        admin: bool,
    },

    #[command(about = "Forget the stored token")]
    Logout {
        #[arg(long, help = "Sign out of the admin surface")]
        admin: bool,
    },

    #[command(about = "Show which surfaces are signed in")]
    Status,
}

fn scope(admin: bool) -> TokenScope {
    if admin {
        TokenScope::Admin
    } else {
        TokenScope::User
    }
}

pub async fn handle(cmd: AuthCommands, ctx: &ServiceContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password, admin } => {
            let credentials = Credentials {
                email: email.trim().to_string(),
                password,
            };
            ctx.auth_service.login(scope(admin), &credentials).await?;
            println!("Signed in as {}", credentials.email);
            Ok(())
        }
        AuthCommands::Register {
            email,
            password,
            category,
            about_us,
            admin,
        } => {
            let category = category
                .map(|c| Category::from_str(&c).ok_or_else(|| anyhow::anyhow!("Unknown category: {}", c)))
                .transpose()?;
            let request = RegisterRequest {
                email: email.trim().to_string(),
                password,
                category,
                about_us,
            };
            ctx.auth_service.register(scope(admin), &request).await?;
            println!("Registered {}", request.email);
            Ok(())
        }
        AuthCommands::Logout { admin } => {
            ctx.auth_service.logout(scope(admin)).await?;
            println!("Signed out");
            Ok(())
        }
        AuthCommands::Status => {
            let user = ctx.auth_service.is_signed_in(TokenScope::User).await?;
            let admin = ctx.auth_service.is_signed_in(TokenScope::Admin).await?;
            match output_format {
                OutputFormat::Json => print_json(&json!({ "user": user, "admin": admin })),
                OutputFormat::Text => {
                    println!("user:  {}", if user { "signed in" } else { "signed out" });
                    println!("admin: {}", if admin { "signed in" } else { "signed out" });
                    Ok(())
                }
            }
        }
    }
}
