//! Expenses command - list, summarize, add and delete expenses.

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Subcommand};
use console::{Style, style};
use tally_client::{ExpenseQuery, ExpenseRequest, TallyClient};
use uuid::Uuid;

use super::{Context, Credentials, Session, print_json, truncate};

/// Arguments for the expenses command.
#[derive(Args, Debug)]
pub struct ExpensesArgs {
    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: ExpensesCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpensesCommand {
    /// List expenses in a date range
    List {
        /// First day (default: start of this month)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (default: today)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Only this category
        #[arg(short, long)]
        category: Option<Uuid>,

        /// Search merchant and note
        #[arg(short, long)]
        query: Option<String>,

        /// Page number, starting at 0
        #[arg(long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(long, default_value = "10")]
        size: u32,
    },

    /// Total spend and count in a date range
    Summary {
        /// First day (default: start of this month)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (default: today)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Record an expense
    Add {
        /// Amount spent
        amount: f64,

        /// Category ID
        #[arg(short, long)]
        category: Uuid,

        /// Day of the expense (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Merchant name
        #[arg(short, long)]
        merchant: Option<String>,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Delete an expense
    Delete {
        /// Expense ID
        id: Uuid,
    },
}

/// Run the expenses command.
pub async fn run(args: ExpensesArgs, ctx: &Context) -> Result<()> {
    let session = Session::open(ctx, &args.credentials).await?;
    let result = execute(args.command, session.client(), ctx).await;
    session.close().await;
    result
}

async fn execute(command: ExpensesCommand, client: &TallyClient, ctx: &Context) -> Result<()> {
    let dim = Style::new().dim();
    let green = Style::new().green();

    match command {
        ExpensesCommand::List {
            from,
            to,
            category,
            query,
            page,
            size,
        } => {
            let (from, to) = month_to_date(from, to);
            let mut search = ExpenseQuery::between(from, to);
            search.category_id = category;
            search.q = query;
            search.page = page;
            search.size = size;

            let page = client.expenses().search(&search).await?;
            if ctx.json_output {
                return print_json(&page);
            }

            println!("{}", style(format!("Expenses {} to {}", from, to)).bold());
            println!("{}", dim.apply_to("─".repeat(60)));

            if page.is_empty() {
                println!("{}", dim.apply_to("No expenses found"));
            } else {
                for expense in &page.content {
                    let merchant = expense.merchant.as_deref().unwrap_or("-");
                    println!(
                        "{} {:>10.2} {:<16} {}",
                        dim.apply_to(expense.expense_date),
                        expense.amount,
                        truncate(&expense.category_name, 16),
                        truncate(merchant, 24),
                    );
                    if ctx.verbose {
                        println!("  {}", dim.apply_to(expense.id));
                    }
                }
                println!();
                println!(
                    "{}",
                    dim.apply_to(page_label(page.page_number, page.total_pages, page.total_elements))
                );
            }
        }
        ExpensesCommand::Summary { from, to } => {
            let (from, to) = month_to_date(from, to);
            let summary = client.expenses().summary(from, to).await?;
            if ctx.json_output {
                return print_json(&summary);
            }

            println!("{}", style(format!("Summary {} to {}", from, to)).bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!("  {} {:.2}", dim.apply_to("Total:"), summary.total_amount);
            println!("  {} {}", dim.apply_to("Count:"), summary.total_count);
        }
        ExpensesCommand::Add {
            amount,
            category,
            date,
            merchant,
            note,
        } => {
            let request = ExpenseRequest {
                amount,
                expense_date: date.unwrap_or_else(today),
                category_id: category,
                merchant,
                note,
            };
            client.expenses().create(&request).await?;
            if ctx.json_output {
                return print_json(&request);
            }
            println!(
                "{} Recorded {:.2} on {}",
                green.apply_to("✓"),
                request.amount,
                request.expense_date
            );
        }
        ExpensesCommand::Delete { id } => {
            client.expenses().delete(id).await?;
            if ctx.json_output {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            println!("{} Deleted {}", green.apply_to("✓"), dim.apply_to(id));
        }
    }

    Ok(())
}

/// Footer under an expense listing. Server page numbers are zero-based.
fn page_label(page_number: u32, total_pages: u32, total_elements: u64) -> String {
    format!(
        "Page {} of {} ({} total)",
        page_number.saturating_add(1),
        total_pages.max(1),
        total_elements
    )
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Fill in a missing range as the first of the month up to today.
pub(crate) fn month_to_date(from: Option<NaiveDate>, to: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    let to = to.unwrap_or_else(today);
    let from = from.unwrap_or_else(|| to.with_day(1).unwrap_or(to));
    (from, to)
}
