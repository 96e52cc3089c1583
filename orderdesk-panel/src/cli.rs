use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use orderdesk_model::prelude::DEFAULT_ORDER_LIST_URL;
use orderdesk_panel::ControlPanel;
use orderdesk_panel::common::OpStatus;

#[derive(Parser, Debug)]
#[command(
    name = "orderdesk-panel",
    about = "Control panel for the order scrape, convert and upload pipeline"
)]
pub struct Cli {
    /// Backend base URL, overrides ORDERDESK_SERVER_URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// API key, overrides ORDERDESK_API_KEY
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Talk to an in-memory backend instead of a server
    #[arg(long, global = true, hide = true)]
    pub stub: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check backend, database, Temporal and SFTP status
    Health,
    /// List orders, or act on one order
    Orders {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[command(subcommand)]
        action: Option<RecordAction>,
    },
    /// List calls, or act on one call
    Calls {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[command(subcommand)]
        action: Option<RecordAction>,
    },
    /// Scrape the order list and process new orders
    Scrape {
        /// Order list URL; the stored or default target when omitted
        #[arg(long)]
        url: Option<String>,
    },
    /// Convert one Hapodu export to Taifun format
    Convert { export_id: i64 },
    /// Convert every pending export
    ConvertAll,
    /// Upload one converted order over SFTP
    Upload { order_id: i64 },
    /// Upload every converted order
    UploadAll,
    /// Show pending conversion and upload counts
    Pending,
    /// Print the XML of one export
    ExportXml { export_id: i64 },
    /// Manage recurring scrape schedules
    Schedules {
        #[command(subcommand)]
        action: ScheduleAction,
    },
    /// Show or change the scrape target
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum RecordAction {
    Delete { id: i64 },
    /// List stored exports
    Exports { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum ScheduleAction {
    List,
    Add { hour: u8, minute: u8 },
    Remove { id: i64 },
    Toggle { id: i64 },
    /// Install the schedules in the external scheduler
    Sync,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,
    Set { url: String },
    /// Go back to the default order list
    Reset,
}

pub async fn run(panel: &ControlPanel, command: Command) -> Result<()> {
    match command {
        Command::Health => {
            let health = panel.health().await?;
            println!("status:   {}", health.status);
            println!("version:  {}", health.version);
            println!("database: {}", health.database);
            if let Some(temporal) = &health.temporal {
                println!("temporal: {temporal}");
            }
            if let Some(sftp) = &health.sftp {
                println!("sftp:     {sftp}");
            }
            if !health.is_healthy() {
                bail!("backend reports {}", health.status);
            }
        }
        Command::Orders { page, action } => match action {
            None => list_orders(panel, page).await?,
            Some(RecordAction::Delete { id }) => {
                panel.orders().delete(id).await?;
            }
            Some(RecordAction::Exports { id }) => {
                for export in panel.exports().order_exports(id).await? {
                    println!(
                        "{:>6}  {:<8}  {}  {}",
                        export.id,
                        export.export_type,
                        export.belnr,
                        export.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        },
        Command::Calls { page, action } => match action {
            None => list_calls(panel, page).await?,
            Some(RecordAction::Delete { id }) => {
                panel.calls().delete(id).await?;
            }
            Some(RecordAction::Exports { id }) => {
                for export in panel.exports().call_exports(id).await? {
                    println!(
                        "{:>6}  {:<8}  {}",
                        export.id,
                        export.export_type,
                        export.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        },
        Command::Scrape { url } => {
            let ticket = panel.scrape(url).await?;
            println!("Workflow {} started", ticket.workflow_id());
            ticket.wait().await?;
        }
        Command::Convert { export_id } => {
            panel.convert_export(export_id).await?;
        }
        Command::ConvertAll => {
            panel.exports().convert_all().await?;
        }
        Command::Upload { order_id } => {
            panel.upload_order(order_id).await?;
        }
        Command::UploadAll => {
            panel.exports().upload_all().await?;
        }
        Command::Pending => {
            let counters = panel.exports().refresh_counters().await?;
            println!("pending conversions: {}", counters.pending_conversions);
            println!("pending uploads:     {}", counters.pending_uploads);
        }
        Command::ExportXml { export_id } => {
            let xml = panel.exports().export_xml(export_id).await?;
            println!("{}", xml.xml_content);
        }
        Command::Schedules { action } => schedules(panel, action).await?,
        Command::Config { action } => config(panel, action).await?,
    }
    Ok(())
}

async fn list_orders(panel: &ControlPanel, page: u32) -> Result<()> {
    let store = panel.orders();
    store.go_to_page(page).await?;
    let snapshot = store.snapshot();

    for order in &snapshot.page.items {
        println!(
            "{:>6}  {:<14}  {:<10}  {:<10}  {}",
            order.id,
            order.order_id,
            order.status.as_str(),
            order.belnr.as_deref().unwrap_or("-"),
            order.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!(
        "page {}/{} ({} orders)",
        snapshot.page.index + 1,
        snapshot.page.page_count(),
        snapshot.page.total
    );
    let counters = snapshot.counters;
    println!(
        "on this page: {} awaiting conversion, {} awaiting upload, {} sent",
        counters.awaiting_conversion, counters.awaiting_upload, counters.delivered
    );
    Ok(())
}

async fn list_calls(panel: &ControlPanel, page: u32) -> Result<()> {
    let store = panel.calls();
    store.go_to_page(page).await?;
    let snapshot = store.snapshot();

    for call in &snapshot.page.items {
        println!(
            "{:>6}  {:<16}  {:<14} -> {:<14}  {:<10}  {}",
            call.id,
            call.call_id,
            call.from_number,
            call.to_number,
            call.status.as_str(),
            call.call_timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    println!(
        "page {}/{} ({} calls)",
        snapshot.page.index + 1,
        snapshot.page.page_count(),
        snapshot.page.total
    );
    Ok(())
}

async fn schedules(panel: &ControlPanel, action: ScheduleAction) -> Result<()> {
    let coordinator = panel.schedules();
    match action {
        ScheduleAction::List => coordinator.refresh().await?,
        ScheduleAction::Add { hour, minute } => {
            coordinator.add(hour, minute).await?;
        }
        ScheduleAction::Remove { id } => coordinator.remove(id).await?,
        ScheduleAction::Toggle { id } => {
            coordinator.toggle(id).await?;
        }
        ScheduleAction::Sync => coordinator.sync().await?,
    }

    let snapshot = coordinator.snapshot();
    for entry in &snapshot.entries {
        println!(
            "{:>4}  {}  {}",
            entry.id,
            entry.display_text(),
            if entry.enabled { "enabled" } else { "disabled" }
        );
    }
    if snapshot.needs_sync() {
        println!("configured, not installed (run `schedules sync`)");
    } else if snapshot.active {
        println!("installed");
    }
    Ok(())
}

async fn config(panel: &ControlPanel, action: ConfigAction) -> Result<()> {
    let sync = panel.scrape_config();
    sync.load_initial().await?;

    let value = match action {
        ConfigAction::Show => None,
        ConfigAction::Set { url } => Some(url),
        ConfigAction::Reset => Some(DEFAULT_ORDER_LIST_URL.to_string()),
    };
    if let Some(value) = value {
        sync.on_local_edit(value);
        sync.settled().await;
        if sync.status() == OpStatus::Error {
            bail!("scrape target was not saved");
        }
    }

    let stored = sync
        .persisted()
        .context("scrape config has not been loaded")?;
    println!("target:   {}", stored.effective_url());
    println!(
        "override: {}",
        stored.custom_order_list_url.as_deref().unwrap_or("(default)")
    );
    if let Some(updated_at) = stored.updated_at {
        println!("updated:  {}", updated_at.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}
