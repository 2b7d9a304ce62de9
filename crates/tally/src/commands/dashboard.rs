//! Dashboard command - spending overview.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use tally_client::{
    CategorySpend, DashboardQuery, DashboardResponse, DateRange, MerchantSpend, TallyClient,
};

use super::{Context, Credentials, Session, print_json, truncate};

/// Arguments for the dashboard command.
#[derive(Args, Debug)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub credentials: Credentials,

    /// First day (default: chosen by the server)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day (default: chosen by the server)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Number of top categories
    #[arg(long, default_value = "5")]
    pub top: u32,

    /// Also show spend per category and per merchant
    #[arg(short, long)]
    pub breakdown: bool,

    /// Merchants in the breakdown
    #[arg(long, default_value = "10")]
    pub merchants: u32,
}

#[derive(Debug, Serialize)]
struct DashboardOutput {
    overview: DashboardResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<CategorySpend>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchants: Option<Vec<MerchantSpend>>,
}

/// Run the dashboard command.
pub async fn run(args: DashboardArgs, ctx: &Context) -> Result<()> {
    let session = Session::open(ctx, &args.credentials).await?;
    let result = fetch(&args, session.client()).await;
    session.close().await;
    let output = result?;

    if ctx.json_output {
        return print_json(&output);
    }
    render(&output);
    Ok(())
}

async fn fetch(args: &DashboardArgs, client: &TallyClient) -> Result<DashboardOutput> {
    let range = DateRange {
        from: args.from,
        to: args.to,
    };
    let dashboard = client.dashboard();

    let overview = dashboard
        .overview(&DashboardQuery {
            range: range.clone(),
            top: args.top,
        })
        .await?;

    let (categories, merchants) = if args.breakdown {
        (
            Some(dashboard.spend_by_category(&range).await?),
            Some(dashboard.spend_by_merchant(&range, Some(args.merchants)).await?),
        )
    } else {
        (None, None)
    };

    Ok(DashboardOutput {
        overview,
        categories,
        merchants,
    })
}

fn render(output: &DashboardOutput) {
    let dim = Style::new().dim();
    let summary = &output.overview.summary;

    println!();
    println!("{}", style("Dashboard").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {:.2}", dim.apply_to("Spent:"), summary.total);
    println!("  {} {}", dim.apply_to("Expenses:"), summary.count);

    if !output.overview.top_categories.is_empty() {
        println!();
        println!("{}", style("Top categories").bold());
        for top in &output.overview.top_categories {
            println!("  {:<20} {:>10.2}", truncate(&top.category_name, 20), top.total);
        }
    }

    if !output.overview.monthly_series.is_empty() {
        println!();
        println!("{}", style("By month").bold());
        for month in &output.overview.monthly_series {
            println!("  {:<20} {:>10.2}", month.month, month.total);
        }
    }

    if let Some(categories) = &output.categories {
        println!();
        println!("{}", style("Spend by category").bold());
        for spend in categories {
            println!(
                "  {:<20} {:>10.2} {}",
                truncate(&spend.category_name, 20),
                spend.total,
                dim.apply_to(format!("({})", spend.count))
            );
        }
    }

    if let Some(merchants) = &output.merchants {
        println!();
        println!("{}", style("Spend by merchant").bold());
        for spend in merchants {
            println!(
                "  {:<20} {:>10.2} {}",
                truncate(&spend.merchant, 20),
                spend.total,
                dim.apply_to(format!("({})", spend.count))
            );
        }
    }

    println!();
}
