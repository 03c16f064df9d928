use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use bed_occupancy::{
    AdminGate, BedCategory, Bootstrap, DateFilter, DateKey, FileStorage, OccupancyStore,
    PublicDataClient, Session, ShareScope, SharingCodec, StatusLevel, Storage,
    StoreMutationOutcome, SystemClock,
    analytics::{available_months, compare, filter_dates, tracked_statistics},
    bootstrap::{bootstrap, bootstrap_remote},
    chart::{build_series, status_cards},
    codec::{share_url, token_from_input},
    config::AppConfig,
    export::{HISTORY_STEM, comparison_stem, comparison_table, export_to_csv, history_table},
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "bed-occupancy")]
#[command(about = "Daily hospital bed occupancy: record, compare and share")]
struct Args {
    /// Load data from a share link (or bare token) instead of local storage
    #[arg(long, global = true)]
    link: Option<String>,

    /// Load data from the configured public document
    #[arg(long, global = true)]
    remote: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chart series and status cards for one date
    Show {
        /// Defaults to the most recent stored date, or today
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Record occupancy for a date
    Save {
        #[arg(long)]
        date: DateKey,
        /// Category count, e.g. `icu=7` (repeatable)
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        assignments: Vec<(BedCategory, u32)>,
        /// Replace existing data without asking
        #[arg(long)]
        yes: bool,
    },
    /// Delete a date (needs the admin secret)
    Delete {
        #[arg(long)]
        date: DateKey,
        #[arg(long)]
        secret: String,
    },
    /// Every stored date with column totals
    History,
    /// Per-category differences between two dates
    Compare { a: DateKey, b: DateKey },
    /// Highest and lowest days for the tracked categories
    Stats {
        /// `all` or `YYYY-MM`
        #[arg(long, value_parser = parse_filter, default_value = "all")]
        month: DateFilter,
    },
    /// Print a share link for all data or one date
    Share {
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Replace local data with the contents of a share link
    Import { link: String },
    /// Write the history (or a comparison) as CSV
    Export {
        #[arg(long)]
        output: PathBuf,
        /// History range: `all` or `YYYY-MM`
        #[arg(long, value_parser = parse_filter, default_value = "all")]
        month: DateFilter,
        #[arg(long, num_args = 2, value_names = ["A", "B"])]
        compare: Option<Vec<DateKey>>,
    },
    /// Replace local data with the configured public document
    Fetch,
}

fn parse_assignment(s: &str) -> Result<(BedCategory, u32), String> {
    let (category, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <category>=<count>, got {s:?}"))?;
    let category = category.parse::<BedCategory>()?;
    // Negative input clamps to zero like the entry form does.
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid count {value:?}: {e}"))?;
    Ok((category, u32::try_from(value.max(0)).unwrap_or(u32::MAX)))
}

fn parse_filter(s: &str) -> Result<DateFilter, String> {
    DateFilter::parse(s).ok_or_else(|| format!("expected `all` or YYYY-MM, got {s:?}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("bed_occupancy=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = Arc::new(config);

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&config.storage.data_dir));
    let codec: SharingCodec = SharingCodec::default();

    if let Command::Fetch = args.command {
        return run_fetch(&rt, &config, storage);
    }

    let token = args
        .link
        .as_deref()
        .map(|link| token_from_input(link).unwrap_or_default());

    let resolved = if args.remote {
        let client = remote_client(&config)?;
        rt.block_on(bootstrap_remote(
            storage.as_ref(),
            &codec,
            token.as_deref(),
            &client,
        ))
    } else {
        bootstrap(storage.as_ref(), &codec, token.as_deref())
    };

    let Bootstrap {
        data,
        origin,
        notice,
    } = resolved;
    if let Some(notice) = notice {
        eprintln!("warning: {notice}");
    }
    tracing::debug!("Using {} dates from {}", data.len(), origin);

    // Shared or remote data only reaches the local file through `import`
    let store = OccupancyStore::from_data(data);
    let store = if origin.is_local() || matches!(args.command, Command::Import { .. }) {
        store.with_storage(storage)
    } else {
        eprintln!("note: using data from the {origin}; changes will not be saved locally");
        store
    };
    let mut session = Session::new(store, config.capacity_config(), Arc::new(SystemClock));

    match args.command {
        Command::Show { date } => {
            if let Some(date) = date {
                session.select(date);
            }
            print_show(&session);
        }
        Command::Save {
            date,
            assignments,
            yes,
        } => run_save(&mut session, date, &assignments, yes)?,
        Command::Delete { date, secret } => {
            let gate = AdminGate::new(config.admin.secret.clone());
            match session.delete(&gate, &secret, &date) {
                None => anyhow::bail!("Wrong admin secret"),
                Some(true) => println!("Deleted {date}"),
                Some(false) => println!("No data stored for {date}"),
            }
        }
        Command::History => print_history(session.store()),
        Command::Compare { a, b } => print_comparison(session.store(), &a, &b)?,
        Command::Stats { month } => print_stats(session.store(), month),
        Command::Share { date } => {
            let scope = match date {
                Some(date) if !session.store().contains(&date) => {
                    anyhow::bail!("No data stored for {date}")
                }
                Some(date) => ShareScope::Date(date),
                None => ShareScope::All,
            };
            println!(
                "{}",
                share_url(&codec, &config.share.base_url, session.store(), scope)?
            );
        }
        Command::Import { link } => {
            let token = token_from_input(&link).context("No share data found in input")?;
            let data = codec.decode(&token).context("Failed to read share link")?;
            let count = data.len();
            session.import(data);
            println!("Imported {count} dates");
        }
        Command::Export {
            output,
            month,
            compare: dates,
        } => run_export(session.store(), &output, month, dates.as_deref())?,
        // Handled before bootstrap
        Command::Fetch => {}
    }

    Ok(())
}

fn remote_client(config: &AppConfig) -> Result<PublicDataClient> {
    let url = config
        .remote
        .public_data_url
        .clone()
        .context("remote.public_data_url is not configured")?;
    PublicDataClient::new(url, &config.network)
}

/// Download the public document and make it the local copy.
fn run_fetch(
    rt: &tokio::runtime::Runtime,
    config: &AppConfig,
    storage: Arc<dyn Storage>,
) -> Result<()> {
    let client = remote_client(config)?;
    tracing::info!("Fetching {}", client.url());
    let data = rt.block_on(client.fetch_store())?;
    let count = data.len();

    let mut store = OccupancyStore::new().with_storage(storage);
    store.replace_all(data);
    println!("Fetched {count} dates");
    Ok(())
}

fn run_save(
    session: &mut Session,
    date: DateKey,
    assignments: &[(BedCategory, u32)],
    yes: bool,
) -> Result<()> {
    session.select(date);
    let mut input = session.current_snapshot();
    for &(category, value) in assignments {
        input.set(category, value);
    }

    match session.submit(&input) {
        StoreMutationOutcome::Saved => println!("Saved {date}"),
        StoreMutationOutcome::OverwriteRequired { existing } => {
            println!("{date} already has data:");
            for (category, value) in existing.iter() {
                println!("  {:<28} {}", category.wire_name(), value);
            }
            if yes || confirm("Replace it?")? {
                session.confirm_overwrite();
                println!("Saved {date}");
            } else {
                session.cancel_overwrite();
                println!("Kept existing data for {date}");
            }
        }
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim"))
}

fn print_show(session: &Session) {
    let date = session.selected_date();
    let snapshot = session.current_snapshot();
    let capacity = session.capacity();

    println!("Occupancy on {}", date.display_br());
    if !session.store().contains(&date) {
        println!("(no data stored for this date)");
    }
    println!();

    for point in build_series(&snapshot, capacity) {
        let bar_len = (point.occupancy_percent / 5.0).round() as usize;
        let capacity_note = if point.show_capacity {
            format!("{}/{} ({} free)", point.value, point.capacity, point.available)
        } else {
            point.value.to_string()
        };
        println!(
            "{:<14} {:<20} {:>5.1}%  {}  {}",
            point.name,
            "#".repeat(bar_len),
            point.occupancy_percent,
            point.color,
            capacity_note
        );
    }

    println!();
    for card in status_cards(&snapshot, capacity) {
        match card.status {
            Some(status) => println!(
                "{:<28} {:>3} of {:<3} {:>6.1}%  {} ({})",
                card.title,
                card.value,
                card.capacity,
                card.percentage,
                status.label(),
                status.suggestion()
            ),
            None => println!("{:<28} {:>3}", card.title, card.value),
        }
    }

    println!();
    println!("Legend:");
    for level in StatusLevel::ALL {
        println!("  {:<8} {}", level.label(), level.suggestion());
    }
}

fn print_history(store: &OccupancyStore) {
    if store.is_empty() {
        println!("No history yet.");
        return;
    }
    let table = history_table(store, &store.list_dates());
    println!(
        "{}",
        table
            .headers
            .iter()
            .map(|h| format!("{h:>14}"))
            .collect::<String>()
    );
    for row in &table.rows {
        println!(
            "{}",
            row.iter().map(|c| format!("{c:>14}")).collect::<String>()
        );
    }
}

fn print_comparison(store: &OccupancyStore, a: &DateKey, b: &DateKey) -> Result<()> {
    let result = compare(store, Some(a), Some(b))
        .with_context(|| format!("Both {a} and {b} need stored data to compare"))?;

    println!(
        "{:<28} {:>10} {:>10} {:>10}",
        "Tipo de Leito",
        a.display_br(),
        b.display_br(),
        "Diferença"
    );
    for row in &result.rows {
        println!(
            "{:<28} {:>10} {:>10} {:>8} {}",
            row.category.wire_name(),
            row.value_a,
            row.value_b,
            row.delta,
            row.direction.arrow()
        );
    }
    println!(
        "{:<28} {:>10} {:>10} {:>8}",
        "Total", result.total_a, result.total_b, result.total_delta
    );
    Ok(())
}

fn print_stats(store: &OccupancyStore, filter: DateFilter) {
    let dates = filter_dates(store, filter);
    println!("Period: {}", filter.label());

    let stats = tracked_statistics(store, &dates);
    if stats.is_empty() {
        println!("No data for this period.");
    }
    for stat in stats {
        let list = |dates: &[DateKey]| {
            dates
                .iter()
                .map(DateKey::display_br)
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("{}", stat.category.wire_name());
        println!("  max {:>4}  on {}", stat.max_value, list(&stat.max_dates));
        println!("  min {:>4}  on {}", stat.min_value, list(&stat.min_dates));
    }

    let months = available_months(store);
    if !months.is_empty() {
        println!(
            "Months with data: {}",
            months
                .iter()
                .map(DateFilter::label)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

fn run_export(
    store: &OccupancyStore,
    output: &Path,
    month: DateFilter,
    dates: Option<&[DateKey]>,
) -> Result<()> {
    let clock = SystemClock;
    let path = match dates {
        Some([a, b]) => {
            let result = compare(store, Some(a), Some(b))
                .with_context(|| format!("Both {a} and {b} need stored data to compare"))?;
            export_to_csv(output, &comparison_table(&result), &comparison_stem(&result), &clock)?
        }
        Some(_) => anyhow::bail!("--compare takes exactly two dates"),
        None => {
            let range = filter_dates(store, month);
            if range.is_empty() {
                anyhow::bail!("No data for {}", month.label());
            }
            export_to_csv(output, &history_table(store, &range), HISTORY_STEM, &clock)?
        }
    };
    println!("Wrote {}", path.display());
    Ok(())
}
