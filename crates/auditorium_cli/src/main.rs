//! CLI smoke entry point.
//!
//! Usage: `auditorium_cli [config.toml] [starts_at|created_at] [asc|desc]`
//!
//! Loads configuration, starts logging, opens the database and prints the first
//! page of upcoming approved conferences.

use auditorium_core::model::now_epoch_ms;
use auditorium_core::{
    core_version, init_from_settings, open_target, ConferenceListQuery, ConferenceService,
    CoreConfig, OrderBy, SortDirection, SqliteConferenceRepository,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("auditorium_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let order_by = match args.next() {
        Some(value) => {
            OrderBy::parse(&value).ok_or_else(|| format!("unknown ordering `{value}`"))?
        }
        None => OrderBy::StartsAt,
    };
    let direction = match args.next() {
        Some(value) => {
            SortDirection::parse(&value).ok_or_else(|| format!("unknown direction `{value}`"))?
        }
        None => SortDirection::Asc,
    };

    let config = CoreConfig::load(config_path.as_deref())?;
    init_from_settings(&config.logging)?;

    let conn = open_target(&config.db_target())?;
    let service =
        ConferenceService::with_config(SqliteConferenceRepository::try_new(&conn)?, &config);
    let page = service.list_conferences(&ConferenceListQuery {
        order_by,
        direction,
        ..ConferenceListQuery::default()
    })?;

    let now = now_epoch_ms();
    println!("auditorium_core version={}", core_version());
    for conference in &page.items {
        let live = if conference.interval.contains_point(now) {
            " [live]"
        } else {
            ""
        };
        println!(
            "{} {} seats={}/{} {}{}",
            conference.id,
            conference.interval,
            conference.registration_count,
            conference.seats,
            conference.title,
            live
        );
    }
    if page.has_more {
        if let Some(cursor) = &page.last_cursor {
            println!("next_cursor={cursor}");
        }
    }

    info!(
        "event=cli_list module=cli status=ok order_by={} returned={} has_more={}",
        order_by.as_str(),
        page.items.len(),
        page.has_more
    );
    Ok(())
}
