//! `tbooth` - CLI for ticketbooth
//!
//! This binary is the presentation layer: it fills the ticket form from
//! command-line arguments, and lists, shows, verifies and deletes the
//! tickets held by the store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use ticketbooth::cli::{
    Cli, Command, ConfigCommand, DeleteCommand, IssueCommand, ListCommand, OutputFormat,
    ShowCommand, StatusCommand, VerifyCommand,
};
use ticketbooth::{
    init_logging, scan_png, Config, LoadOutcome, QrCodeEncoder, Storage, StoreEvent,
    TicketRecord, TicketStore,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Issue(cmd) => handle_issue(&config, &cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Show(cmd) => handle_show(&config, &cmd),
        Command::Verify(cmd) => handle_verify(&config, &cmd),
        Command::Delete(cmd) => handle_delete(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

/// Open the configured database and load the ticket list from it.
///
/// A list that could not be loaded is reported here, since the library
/// only logs it.
fn open_store(config: &Config) -> anyhow::Result<TicketStore<Storage>> {
    let path = config.database_path();
    let storage =
        Storage::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut store = TicketStore::open_slot(storage, config.storage.slot_key.clone());

    if let LoadOutcome::Recovered { reason } = store.load_outcome() {
        eprintln!("warning: saved tickets could not be loaded, starting empty ({reason})");
    }

    store.subscribe(log_change);
    Ok(store)
}

fn log_change(event: &StoreEvent, tickets: &[TicketRecord]) {
    info!(?event, count = tickets.len(), "ticket list changed");
}

fn ticket_at(store: &TicketStore<Storage>, index: usize) -> anyhow::Result<&TicketRecord> {
    store.get(index).with_context(|| {
        format!(
            "no ticket at position {index} (there are {} tickets)",
            store.len()
        )
    })
}

fn handle_issue(config: &Config, cmd: &IssueCommand) -> anyhow::Result<()> {
    let mut form = cmd.to_form();
    let ticket = if cmd.no_qr {
        form.submit_without_qr()?
    } else {
        form.submit(&QrCodeEncoder::new(config.qr.clone()))?
    };

    let mut store = open_store(config)?;
    let index = store.len();
    store.add(ticket.clone())?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&ticket)?);
    } else {
        print_ticket(index, &ticket);
    }
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let tickets = store.all();

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(tickets)?),
        OutputFormat::Plain => {
            for (index, ticket) in tickets.iter().enumerate() {
                print_ticket(index, ticket);
            }
        }
        OutputFormat::Table => print_table(tickets),
    }
    Ok(())
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let ticket = ticket_at(&store, cmd.index)?;

    print_ticket(cmd.index, ticket);
    println!();
    println!("{}", ticket.qr_payload());

    if let Some(path) = &cmd.png {
        let Some(png) = ticket.qr_image() else {
            bail!("ticket {} has no QR image", cmd.index);
        };
        std::fs::write(path, png).with_context(|| format!("writing {}", path.display()))?;
        println!();
        println!("QR image written to {}", path.display());
    }
    Ok(())
}

fn handle_verify(config: &Config, cmd: &VerifyCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let ticket = ticket_at(&store, cmd.index)?;

    let Some(png) = ticket.qr_image() else {
        bail!("ticket {} has no QR image", cmd.index);
    };
    let scanned = scan_png(png).context("scanning QR image")?;

    if scanned == ticket.qr_payload() {
        println!("ticket {}: QR image matches", cmd.index);
        Ok(())
    } else {
        bail!(
            "ticket {}: QR image does not match its fields\n  scanned:  {:?}\n  expected: {:?}",
            cmd.index,
            scanned,
            ticket.qr_payload()
        )
    }
}

fn handle_delete(config: &Config, cmd: &DeleteCommand) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let removed = store.delete_at(cmd.indices.iter().copied())?;

    for ticket in &removed {
        println!(
            "Deleted {} {} ({})",
            ticket.first_name(),
            ticket.last_name(),
            ticket.id()
        );
    }
    println!("{} tickets remain", store.len());
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.storage().stats(store.slot_key())?;
    let with_qr = store.all().iter().filter(|t| t.has_qr_image()).count();

    if cmd.json {
        let status = serde_json::json!({
            "tickets": store.len(),
            "tickets_with_qr": with_qr,
            "slot_key": store.slot_key(),
            "slot_bytes": stats.slot_bytes,
            "last_write": stats.last_write,
            "database_path": config.database_path(),
            "database_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("tbooth status");
        println!("-------------");
        println!("Tickets:       {} ({with_qr} with QR image)", store.len());
        println!("Slot:          {}", store.slot_key());
        println!("Slot size:     {} bytes", stats.slot_bytes);
        match stats.last_write {
            Some(at) => println!("Last saved:    {}", at.to_rfc3339()),
            None => println!("Last saved:    never"),
        }
        println!("Database:      {}", config.database_path().display());
        println!("Database size: {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Slot key:           {}", config.storage.slot_key);
                println!();
                println!("[QR]");
                println!("  Error correction:   {:?}", config.qr.error_correction);
                println!("  Quiet zone:         {}", config.qr.quiet_zone);
                println!("  Min dimension (px): {}", config.qr.min_dimension);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_ticket(index: usize, ticket: &TicketRecord) {
    println!(
        "#{index}  {} {} \"{}\" <{}>{}",
        ticket.first_name(),
        ticket.last_name(),
        ticket.nickname(),
        ticket.email(),
        if ticket.has_qr_image() { "" } else { "  (no QR)" }
    );
    println!("     id: {}", ticket.id());
}

fn print_table(tickets: &[TicketRecord]) {
    const HEADERS: [&str; 6] = ["#", "First Name", "Last Name", "Nickname", "Email", "QR"];

    let rows: Vec<[String; 6]> = tickets
        .iter()
        .enumerate()
        .map(|(i, t)| {
            [
                i.to_string(),
                t.first_name().to_string(),
                t.last_name().to_string(),
                t.nickname().to_string(),
                t.email().to_string(),
                if t.has_qr_image() { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 6]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", render(HEADERS));
    println!("{}", widths.map(|w| "-".repeat(w)).join("  "));
    for row in &rows {
        println!("{}", render(std::array::from_fn(|i| row[i].as_str())));
    }
}
