//! Categories command - category management.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use tally_client::{CategoryRequest, TallyClient};
use uuid::Uuid;

use super::{Context, Credentials, Session, print_json};

/// Arguments for the categories command.
#[derive(Args, Debug)]
pub struct CategoriesArgs {
    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: CategoriesCommand,
}

#[derive(Subcommand, Debug)]
pub enum CategoriesCommand {
    /// List all categories
    List,

    /// Create a category
    Add {
        /// Category name
        name: String,

        /// Display color
        #[arg(long, default_value = "#9e9e9e")]
        color: String,

        /// Icon name
        #[arg(long, default_value = "tag")]
        icon: String,

        /// Monthly budget
        #[arg(short, long)]
        budget: Option<f64>,
    },

    /// Delete a category
    Delete {
        /// Category ID
        id: Uuid,
    },
}

/// Run the categories command.
pub async fn run(args: CategoriesArgs, ctx: &Context) -> Result<()> {
    let session = Session::open(ctx, &args.credentials).await?;
    let result = execute(args.command, session.client(), ctx).await;
    session.close().await;
    result
}

async fn execute(command: CategoriesCommand, client: &TallyClient, ctx: &Context) -> Result<()> {
    let dim = Style::new().dim();
    let green = Style::new().green();

    match command {
        CategoriesCommand::List => {
            let categories = client.categories().list().await?;
            if ctx.json_output {
                return print_json(&categories);
            }

            println!("{}", style("Categories").bold());
            println!("{}", dim.apply_to("─".repeat(50)));

            if categories.is_empty() {
                println!("{}", dim.apply_to("No categories yet"));
            }
            for category in &categories {
                let budget = category
                    .budget_limit
                    .map(|b| format!("budget {:.2}", b))
                    .unwrap_or_default();
                println!(
                    "{} {:<20} {}",
                    dim.apply_to(format!("[{}]", &category.id.to_string()[..8])),
                    category.name,
                    dim.apply_to(budget)
                );
            }
        }
        CategoriesCommand::Add {
            name,
            color,
            icon,
            budget,
        } => {
            let request = CategoryRequest {
                name,
                color,
                icon,
                budget_limit: budget,
            };
            client.categories().create(&request).await?;
            if ctx.json_output {
                return print_json(&request);
            }
            println!("{} Category created: {}", green.apply_to("✓"), request.name);
        }
        CategoriesCommand::Delete { id } => {
            client.categories().delete(id).await?;
            if ctx.json_output {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            println!("{} Deleted {}", green.apply_to("✓"), dim.apply_to(id));
        }
    }

    Ok(())
}
