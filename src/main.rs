use clap::Parser;
use color_eyre::Result;
use std::path::Path;
use tripsquad::{
    cli::{self, Cli, Commands},
    config::StorageBackend,
    Config, FileStorage, KeyValueStorage, Profile, SqliteStorage, TripStore, WikiLookup,
};

fn open_storage(config: &Config) -> Result<Box<dyn KeyValueStorage>> {
    let path = config.get_data_path();
    let storage: Box<dyn KeyValueStorage> = match config.storage_backend {
        StorageBackend::Sqlite => Box::new(SqliteStorage::new(
            path.to_str()
                .ok_or_else(|| color_eyre::eyre::eyre!("Data path contains invalid UTF-8"))?,
        )?),
        StorageBackend::File => Box::new(FileStorage::new(path)),
    };
    Ok(storage)
}

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config {
        Some(ref path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };
    tripsquad::logging::init_logging(&config.log_level);

    let mut store = TripStore::open(open_storage(&config)?, config.storage_key.clone());
    let currency = config.currency_symbol.as_str();

    match cli.command.unwrap_or(Commands::ListTrips { status: None }) {
        Commands::AddTrip {
            destination,
            start,
            end,
            budget,
            trip_type,
            travelers,
            origin,
            description,
        } => {
            cli::handle_add_trip(
                destination, start, end, budget, trip_type, travelers, origin, description,
                &mut store,
            )?;
        }
        Commands::ListTrips { status } => cli::handle_list_trips(status, &store)?,
        Commands::ShowTrip { id } => cli::handle_show_trip(&id, &store, currency)?,
        Commands::SetStatus { id, status } => cli::handle_set_status(&id, status, &mut store)?,
        Commands::DeleteTrip { id } => cli::handle_delete_trip(&id, &mut store)?,
        Commands::ClearAll { yes } => cli::handle_clear_all(yes, &mut store)?,
        Commands::AddActivity {
            trip_id,
            name,
            day,
            start,
            duration,
            cost,
            location,
            notes,
        } => {
            cli::handle_add_activity(
                trip_id, name, day, start, duration, cost, location, notes, &mut store,
            )?;
        }
        Commands::DeleteActivity { id } => cli::handle_delete_activity(&id, &mut store)?,
        Commands::AddExpense {
            trip_id,
            amount,
            description,
            category,
            date,
            paid_by,
        } => {
            cli::handle_add_expense(
                trip_id, amount, description, category, date, paid_by, &mut store,
            )?;
        }
        Commands::DeleteExpense { id } => cli::handle_delete_expense(&id, &mut store)?,
        Commands::AddMember {
            trip_id,
            name,
            email,
        } => cli::handle_add_member(trip_id, name, email, &mut store)?,
        Commands::RemoveMember { id } => cli::handle_remove_member(&id, &mut store)?,
        Commands::SetBudget {
            trip_id,
            allocations,
        } => cli::handle_set_budget(&trip_id, &allocations, &mut store)?,
        Commands::Budget => cli::handle_budget(&store, currency)?,
        Commands::Stats => cli::handle_stats(&store, currency)?,
        Commands::Estimate { days, people } => cli::handle_estimate(days, people, currency)?,
        Commands::Plan {
            name,
            country,
            days,
            people,
        } => {
            cli::handle_plan(name, country, days, people, &mut store, currency)?;
        }
        Commands::Search { query, limit } => {
            let lookup = WikiLookup::new(&config.lookup)?;
            cli::handle_search(&query, limit, &lookup, &config.lookup)?;
        }
        Commands::Place { name } => {
            let lookup = WikiLookup::new(&config.lookup)?;
            cli::handle_place(&name, &lookup)?;
        }
        Commands::Sights {
            lat,
            lon,
            radius,
            limit,
        } => {
            let lookup = WikiLookup::new(&config.lookup)?;
            cli::handle_sights(lat, lon, radius, limit, &lookup, &config.lookup)?;
        }
    }

    // Retry a failed save before exit
    store.flush()?;

    Ok(())
}
