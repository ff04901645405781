use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use spendsort::{load_config, Correction, Session};
use spendsort_core::{CategoryTotals, Transaction, TransactionBatch, TransactionId};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spendsort", version, about = "Categorize bank statement transactions by keyword")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Category dictionary to use instead of the configured one
    #[arg(long, global = true)]
    categories: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show categorized expenses, the expense summary and income for a statement
    Show {
        /// Statement CSV with Date, Details, Amount and Debit/Credit columns
        csv: PathBuf,
    },

    /// List categories and their keywords
    Categories,

    /// Add an empty category
    AddCategory { name: String },

    /// Recategorize rows and learn their details as keywords
    Correct {
        csv: PathBuf,

        /// ROW=CATEGORY, using the row number shown by `show`. Repeatable.
        #[arg(long = "set", value_name = "ROW=CATEGORY", required = true, value_parser = parse_correction)]
        corrections: Vec<Correction>,
    },
}

fn parse_correction(s: &str) -> Result<Correction, String> {
    let (row, category) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW=CATEGORY, got '{s}'"))?;
    let row: usize = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row number '{}'", row.trim()))?;
    let category = category.trim();
    if category.is_empty() {
        return Err("category must not be empty".to_string());
    }
    Ok(Correction::new(TransactionId(row), category))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(path) = cli.categories {
        config.categories_file = path;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Using categories at {}", config.categories_file.display());
    let mut session = Session::open(&config);

    match cli.command {
        Command::Show { csv } => {
            load(&mut session, &csv)?;
            print_statement(&session);
        }

        Command::Categories => {
            for (name, keywords) in session.store().categories().iter() {
                println!("{name} ({})", keywords.len());
                for kw in keywords {
                    println!("  - {kw}");
                }
            }
        }

        Command::AddCategory { name } => {
            if session.add_category(&name)? {
                println!("Added category '{name}'");
            } else {
                bail!("Category '{name}' is empty or already exists");
            }
        }

        Command::Correct { csv, corrections } => {
            load(&mut session, &csv)?;
            let report = session.apply_corrections(&corrections)?;
            for (id, err) in &report.failures {
                eprintln!("Row {id}: {err}");
            }
            println!(
                "{} recategorized, {} keyword(s) learned",
                report.recategorized, report.learned
            );
            if report.store_changed() {
                session.reclassify()?;
            }
            print_statement(&session);
        }
    }

    Ok(())
}

fn load(session: &mut Session, path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    session.load_statement(BufReader::new(file))?;
    Ok(())
}

fn print_statement(session: &Session) {
    let Some(batch) = session.batch() else {
        return;
    };

    println!("Expenses (Debits)");
    print_rows(batch.debits());

    if let Some(totals) = session.category_totals() {
        println!();
        println!("Expense Summary Total");
        print_totals(&totals);
    }

    println!();
    println!("Payments (Credits)");
    print_rows(batch.credits());
    println!("Total Payments: {}", batch.credit_total());
    print_uncategorized_hint(batch);
}

fn print_rows<'a>(rows: impl Iterator<Item = &'a Transaction>) {
    println!(
        "{:>5}  {:<10}  {:<36}  {:>12}  Category",
        "Row", "Date", "Details", "Amount"
    );
    for tx in rows {
        println!(
            "{:>5}  {:<10}  {:<36}  {:>12}  {}",
            tx.id,
            tx.date.format("%d/%m/%Y"),
            truncate(&tx.details, 36),
            tx.amount.to_string(),
            tx.category
        );
    }
}

fn print_totals(totals: &CategoryTotals) {
    for t in totals.iter() {
        let share = totals
            .share(&t.category)
            .map(|s| format!("{s}%"))
            .unwrap_or_default();
        println!("  {:<24}  {:>12}  {:>6}", t.category, t.amount.to_string(), share);
    }
    println!("  {:<24}  {:>12}", "Total", totals.total().to_string());
}

fn print_uncategorized_hint(batch: &TransactionBatch) {
    let pending = batch.debits().filter(|t| t.is_uncategorized()).count();
    if pending > 0 {
        println!();
        println!("{pending} expense(s) uncategorized; use `spendsort correct <csv> --set ROW=CATEGORY`");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
