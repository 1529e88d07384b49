use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dashboard::{
    Dashboard,
    chart::{ChartType, price_tooltip},
    config::resolve_config,
    logging::init_tracing,
    quandl_factory,
    storage::JsonFileStore,
};

#[derive(Parser)]
#[command(version, about = "Stock dashboard CLI")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Register an account, log in, and load ticker data.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        api_key: String,
    },
    /// Log in and load ticker data.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log out and discard saved ticker data.
    Logout,
    /// Current user, load progress and per-symbol state.
    Status,
    /// Print the chart for one symbol.
    Show {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, default_value = "ohlc")]
        chart_type: ChartType,
        /// Emit the full chart view as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Extend loaded series with synthetic bars.
    Simulate {
        #[arg(long, default_value_t = 1)]
        ticks: u32,
        /// Skip the randomized delay between ticks.
        #[arg(long)]
        no_wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = resolve_config(cli.config.as_deref())?;
    let store = JsonFileStore::open(&cfg.storage.path)
        .with_context(|| format!("open store {}", cfg.storage.path.display()))?;
    let factory = quandl_factory(cfg.feed.base_url.clone());
    let mut dash = Dashboard::new(cfg, store, factory)?;

    match cli.cmd {
        Cmd::Signup {
            username,
            password,
            api_key,
        } => {
            let summary = dash.sign_up(&username, &password, &api_key).await?;
            println!("signed up as {username}");
            print_summary(&summary.loaded, &summary.failed);
        }
        Cmd::Login { username, password } => {
            let summary = dash.login(&username, &password).await?;
            println!("logged in as {username}");
            print_summary(&summary.loaded, &summary.failed);
        }
        Cmd::Logout => {
            dash.logout()?;
            println!("logged out");
        }
        Cmd::Status => {
            dash.start().await?;
            match dash.auth().username() {
                Some(name) => println!("user: {name}"),
                None => println!("user: (not logged in)"),
            }
            println!("progress: {}%", dash.tickers().progress());
            println!("last updated: {}", dash.last_updated());
            for symbol in dash.tickers().symbols() {
                let record = dash.tickers().record(symbol);
                println!(
                    "  {symbol:<6} {:?} {} bars ({})",
                    dash.tickers().state(symbol),
                    record.series.len(),
                    record.series.name
                );
            }
        }
        Cmd::Show {
            symbol,
            chart_type,
            json,
        } => {
            dash.start().await?;
            let symbol = symbol
                .map(|s| s.trim().to_uppercase())
                .or_else(|| dash.config().tickers.first().cloned())
                .context("no ticker symbol configured")?;
            dash.chart_options_mut().set_chart_type(chart_type);
            let view = dash.chart_view(&symbol);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{} [{}]{}", view.title, view.y_axis_title, if view.loading { " (loading)" } else { "" });
                println!("last updated: {}", dash.last_updated());
                if let Some(bar) = dash.tickers().record(&symbol).series.bars.last() {
                    println!("{}", price_tooltip(&symbol, bar));
                }
                for ma in &view.moving_averages {
                    match ma.data.last() {
                        Some((_, v)) => println!("{}: {v}", ma.name),
                        None => println!("{}: -", ma.name),
                    }
                }
                for marker in &view.events.data {
                    println!("event {} on {}", marker.title, marker.timestamp.format("%m/%d/%y"));
                }
            }
        }
        Cmd::Simulate { ticks, no_wait } => {
            dash.start().await?;
            let schedule = dash.config().simulation.schedule();
            let mut rng = rand::rng();
            for tick in 1..=ticks {
                if !no_wait && tick > 1 {
                    tokio::time::sleep(schedule.next_delay(&mut rng)).await;
                }
                let appended = dash.simulate_tick(Utc::now(), &mut rng)?;
                println!("tick {tick}: {appended} bars appended, last updated {}", dash.last_updated());
            }
        }
    }

    Ok(())
}

fn print_summary(loaded: &[String], failed: &[String]) {
    println!("loaded: {}", loaded.join(", "));
    if !failed.is_empty() {
        println!("failed: {}", failed.join(", "));
    }
}
