use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hrm_attendance::AttendanceClient;
use hrm_attendance::auth::{AuthSession, FileSessionStore, require_employee};
use hrm_attendance::config::Config;
use hrm_attendance::model::{Attendance, DateFilter};
use hrm_attendance::models::EmployeeId;
use hrm_attendance::utils::clock::{Clock, LocalClock};
use hrm_attendance::utils::datetime::{
    elapsed_hours, format_duration, format_server_timestamp, parse_server_timestamp,
};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hrm-attendance", about = "Clock in and out against the HR server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        db: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ODOO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show whether you are on the clock and this week's hours
    Status,
    CheckIn,
    /// Close the open attendance record
    CheckOut {
        /// Refuse if the record was already closed elsewhere
        #[arg(long)]
        verify: bool,
    },
    History {
        #[arg(long)]
        limit: Option<u32>,
        /// Inclusive lower bound, `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        from: Option<String>,
        /// Inclusive upper bound, `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        to: Option<String>,
    },
    Week,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(2);
        }
    };

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_target(false)
        .init();

    if let Err(e) = run(cli.command, &config).await {
        match e.downcast_ref::<hrm_attendance::Error>() {
            Some(err) => error!(code = err.code(), kind = %err.kind(), "{}", err),
            None => error!("{:#}", e),
        }
        // Messages are already phrased for the user.
        eprintln!("{:#}", e);
        drop(guard);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let store = Arc::new(FileSessionStore::new(&config.session_dir));
    let client = AttendanceClient::from_config(config, store)?;
    let attendance = &client.attendance;

    match command {
        Command::Login {
            url,
            db,
            email,
            password,
        } => {
            let url = url
                .or_else(|| config.server_url.clone())
                .context("--url or ODOO_URL is required")?;
            let db = db
                .or_else(|| config.database.clone())
                .context("--db or ODOO_DB is required")?;

            let session = client.auth.login(&url, &db, &email, &password).await?;
            println!("Logged in as {}", session.employee.name);
            if session.employee.user_only {
                println!("No employee is linked to this account; attendance is unavailable.");
            }
        }
        Command::Logout => {
            client.auth.logout().await;
            println!("Logged out");
        }
        Command::Status => {
            let (session, employee_id) = restore(&client).await?;
            let home = attendance.refresh(employee_id).await?;
            match &home.current {
                Some(open) => println!(
                    "{}: on the clock since {} ({})",
                    session.employee.name,
                    format_server_timestamp(open.check_in),
                    format_duration(elapsed_hours(open.check_in, LocalClock.now())),
                ),
                None => println!("{}: off the clock", session.employee.name),
            }
            println!(
                "Week of {}: {} over {} records",
                home.weekly.week_start,
                format_duration(home.weekly.total_hours),
                home.weekly.record_count
            );
        }
        Command::CheckIn => {
            let (_, employee_id) = restore(&client).await?;
            let id = attendance.check_in(employee_id).await?;
            println!("Checked in (record {})", id);
        }
        Command::CheckOut { verify } => {
            let (_, employee_id) = restore(&client).await?;
            let Some(open) = attendance.get_current_attendance(employee_id).await? else {
                bail!("No active check-in to close.");
            };
            if verify {
                attendance.check_out_open(open.id).await?;
            } else {
                attendance.check_out(open.id).await?;
            }
            println!("Checked out (record {})", open.id);
        }
        Command::History { limit, from, to } => {
            let (_, employee_id) = restore(&client).await?;
            let filter = DateFilter {
                from: from.as_deref().map(parse_bound).transpose()?,
                to: to.as_deref().map(parse_bound).transpose()?,
            };
            let records = attendance
                .get_attendance_history(
                    employee_id,
                    limit.unwrap_or(config.history_limit),
                    Some(filter),
                )
                .await?;
            for record in &records {
                print_record(record);
            }
            if records.is_empty() {
                println!("No attendance records.");
            }
        }
        Command::Week => {
            let (_, employee_id) = restore(&client).await?;
            let summary = attendance.get_weekly_summary(employee_id).await?;
            println!(
                "Week of {}: {} over {} records",
                summary.week_start,
                format_duration(summary.total_hours),
                summary.record_count
            );
            for record in &summary.records {
                print_record(record);
            }
        }
    }

    Ok(())
}

/// The stored session and the employee it clocks for.
async fn restore(client: &AttendanceClient) -> Result<(AuthSession, EmployeeId)> {
    let Some(session) = client.auth.restore_session().await else {
        bail!("Not logged in. Run `hrm-attendance login` first.");
    };
    info!(user_id = %session.user_id, "session restored for command");
    let employee_id = require_employee(&session.employee)?;
    Ok((session, employee_id))
}

fn parse_bound(raw: &str) -> Result<chrono::NaiveDateTime> {
    parse_server_timestamp(raw).with_context(|| format!("invalid timestamp {:?}", raw))
}

fn print_record(record: &Attendance) {
    let check_out = record
        .check_out
        .map(format_server_timestamp)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "#{:<6} {}  ->  {:<19}  {}",
        record.id,
        format_server_timestamp(record.check_in),
        check_out,
        format_duration(record.worked_hours.unwrap_or(0.0))
    );
}
