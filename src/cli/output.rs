use serde::Serialize;
use serde_json::{json, Value};

use kindred::{
    domain::{Member, User},
    projection::Projection,
};

use super::OutputFormat;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status(member: &Member) -> &'static str {
    if member.is_approved {
        "approved"
    } else {
        "pending"
    }
}

pub fn member_line(member: &Member) -> String {
    let mut line = format!("{}  {}", member.id, member.full_name());
    if !member.email.is_empty() {
        line.push_str(&format!("  <{}>", member.email));
    }
    format!("{}  [{}]", line, status(member))
}

pub fn print_member(member: &Member, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(member),
        OutputFormat::Text => {
            println!("{}", member_line(member));
            if !member.phone_number.is_empty() {
                println!("  phone:   {}", member.phone_number);
            }
            if !member.address.is_empty() {
                println!("  address: {}", member.address);
            }
            if let Some(dob) = member.dob {
                println!("  born:    {}", dob);
            }
            if let Some(dp) = &member.dp {
                println!("  photo:   {}", dp);
            }
            Ok(())
        }
    }
}

pub fn print_projection(projection: &Projection<'_>, format: OutputFormat) -> anyhow::Result<()> {
    match (format, projection) {
        (OutputFormat::Json, Projection::Flat(members)) => print_json(members),
        (OutputFormat::Json, Projection::Grouped(groups)) => {
            let groups: Vec<Value> = groups
                .iter()
                .map(|g| json!({ "key": g.key, "members": g.members }))
                .collect();
            print_json(&groups)
        }
        (OutputFormat::Text, Projection::Flat(members)) => {
            for member in members {
                println!("{}", member_line(member));
            }
            println!("{} member(s)", members.len());
            Ok(())
        }
        (OutputFormat::Text, Projection::Grouped(groups)) => {
            for group in groups {
                println!("{}", group.key);
                for member in &group.members {
                    println!("  {}", member_line(member));
                }
            }
            println!("{} member(s)", projection.len());
            Ok(())
        }
    }
}

pub fn user_line(user: &User, members: usize) -> String {
    let category = user.category.map(|c| c.label()).unwrap_or("-");
    format!("{}  {}  {}  {} member(s)", user.id, user.email, category, members)
}
