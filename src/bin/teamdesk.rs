use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "teamdesk", about = "Manager dashboard statistics service")]
struct Cli {
    /// Database path (default: ~/.teamdesk/teamdesk.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on
        #[arg(long, env = "TEAMDESK_BIND", default_value = teamdesk::server::DEFAULT_BIND)]
        bind: String,
        /// Number of reader connections
        #[arg(long, default_value_t = teamdesk::storage::DEFAULT_READERS)]
        readers: usize,
        /// Deployment environment (falls back to the `environment` config value, then production)
        #[arg(long, env = "TEAMDESK_ENV")]
        environment: Option<String>,
    },
    /// Compute the dashboard snapshot for a manager
    Stats {
        manager_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load records from a JSON document
    Import {
        file: std::path::PathBuf,
    },
    /// Manage session tokens
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show record counts
    Status,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Issue a token for a user
    Create {
        user_id: String,
        /// admin, manager, team_lead or employee
        #[arg(long)]
        role: String,
        #[arg(long, default_value_t = teamdesk::session::DEFAULT_TTL_HOURS)]
        ttl_hours: i64,
    },
    /// Revoke a token
    Revoke { token: String },
    /// Delete expired tokens
    Purge,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let readers = match &cli.command {
        Commands::Serve { readers, .. } => *readers,
        _ => teamdesk::storage::DEFAULT_READERS,
    };
    let db = match &cli.db {
        Some(path) => teamdesk::Database::open_with_readers(path, readers).await?,
        None => {
            teamdesk::Database::open_with_readers(teamdesk::Database::default_path()?, readers)
                .await?
        }
    };

    match cli.command {
        Commands::Serve {
            bind,
            readers: _,
            environment,
        } => {
            let environment = match environment {
                Some(env) => env,
                None => db
                    .reader()
                    .call(|c| teamdesk::storage::repository::get_config(c, "environment"))
                    .await?
                    .unwrap_or_else(|| teamdesk::server::api::PRODUCTION.to_string()),
            };
            teamdesk::serve(db, teamdesk::ServerConfig { bind, environment }).await?;
        }
        Commands::Stats { manager_id, json } => {
            let stats =
                teamdesk::compute_manager_stats(&db, &manager_id, chrono::Utc::now()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Commands::Import { file } => {
            let report = teamdesk::import::import_file(&db, &file).await?;
            print_import_report(&report);
        }
        Commands::Session { action } => {
            handle_session(&db, action).await?;
        }
        Commands::Config { action } => {
            handle_config(&db, action).await?;
        }
        Commands::Status => {
            print_status(&db).await?;
        }
    }

    Ok(())
}

async fn handle_session(db: &teamdesk::Database, action: SessionAction) -> anyhow::Result<()> {
    match action {
        SessionAction::Create {
            user_id,
            role,
            ttl_hours,
        } => {
            let role: teamdesk::Role = role.parse()?;
            let session = teamdesk::session::create_session(
                db,
                &user_id,
                role,
                chrono::Duration::hours(ttl_hours),
                chrono::Utc::now(),
            )
            .await?;
            println!("{}", session.token);
            eprintln!("Expires at {}", session.expires_at);
        }
        SessionAction::Revoke { token } => {
            if teamdesk::session::revoke_session(db, &token).await? {
                println!("Revoked.");
            } else {
                println!("Not found: {token}");
            }
        }
        SessionAction::Purge => {
            let purged =
                teamdesk::session::purge_expired_sessions(db, chrono::Utc::now()).await?;
            println!("Purged {purged} expired session(s).");
        }
    }
    Ok(())
}

async fn handle_config(db: &teamdesk::Database, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let val: Option<String> = db
                .reader()
                .call({
                    let key = key.clone();
                    move |conn| teamdesk::storage::repository::get_config(conn, &key)
                })
                .await?;
            match val {
                Some(v) => println!("{key} = {v}"),
                None => println!("{key} is not set"),
            }
        }
        ConfigAction::Set { key, value } => {
            db.writer()
                .call(move |conn| {
                    teamdesk::storage::repository::set_config(conn, &key, &value)?;
                    Ok::<(), rusqlite::Error>(())
                })
                .await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items: Vec<(String, String)> = db
                .reader()
                .call(|conn| teamdesk::storage::repository::list_config(conn))
                .await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

async fn print_status(db: &teamdesk::Database) -> anyhow::Result<()> {
    let counts = db
        .reader()
        .call(|conn| teamdesk::storage::repository::collection_counts(conn))
        .await?;

    println!("Store Status");
    for (label, n) in counts {
        println!("  {:<13}{n}", format!("{label}:"));
    }
    Ok(())
}

fn print_import_report(report: &teamdesk::ImportReport) {
    println!("Imported {} records", report.total());
    println!("  Departments: {}", report.departments);
    println!("  Managers:    {}", report.managers);
    println!("  Team leads:  {}", report.team_leads);
    println!("  Employees:   {}", report.employees);
    println!("  Forms:       {}", report.forms);
    println!("  Submissions: {}", report.submissions);
    println!("  Subtasks:    {}", report.subtasks);
    println!("  Admin tasks: {}", report.admin_tasks);
}

fn print_stats(s: &teamdesk::ManagerStats) {
    let departments: Vec<&str> = s.manager.departments.iter().map(|d| d.name.as_str()).collect();
    println!("Manager: {} <{}>", s.manager.name, s.manager.email);
    println!("  Departments: {}", departments.join(", "));

    let t = &s.totals;
    println!("  Totals:");
    println!("    Team leads:  {}", t.team_leads);
    println!("    Employees:   {}", t.employees);
    println!("    Forms:       {}", t.forms);
    println!("    Submissions: {}", t.submissions);
    println!("    Subtasks:    {}", t.subtasks);
    println!("    Admin tasks: {}", t.admin_tasks);

    println!("  Activity (submissions / subtasks, completed in parentheses):");
    for (label, w) in [("Today", &s.today), ("This week", &s.this_week), ("This month", &s.this_month)] {
        println!(
            "    {:<11}{} ({}) / {} ({})",
            format!("{label}:"),
            w.submissions,
            w.completed_submissions,
            w.subtasks,
            w.completed_subtasks
        );
    }

    let b = &s.breakdown;
    println!("  Submissions:");
    println!(
        "    Pending {}, in progress {}, completed {}, approved {}, rejected {} of {} ({:.1}%)",
        b.submissions.pending,
        b.submissions.in_progress,
        b.submissions.completed,
        b.submissions.approved,
        b.submissions.rejected,
        b.submissions.total,
        b.submissions.completion_rate
    );
    for (label, tb) in [("Subtasks", &b.subtasks), ("Admin tasks", &b.admin_tasks)] {
        println!("  {label}:");
        println!(
            "    Pending {}, in progress {}, completed {} of {} ({:.1}%)",
            tb.pending, tb.in_progress, tb.completed, tb.total, tb.completion_rate
        );
    }

    let p = &s.performance;
    println!("  Performance:");
    println!("    Avg submission time: {:.1} h", p.avg_submission_completion_time);
    println!("    Avg subtask time:    {:.1} h", p.avg_subtask_completion_time);
    println!("    Overall efficiency:  {:.1}%", p.overall_efficiency);
    println!("    Approval rate:       {:.1}%", p.approval_rate);

    println!("  Top team leads:");
    if s.insights.top_performing_team_leads.is_empty() {
        println!("    None");
    }
    for lead in &s.insights.top_performing_team_leads {
        println!(
            "    {} {}/{} ({:.1}%)",
            lead.name, lead.completed_subtasks, lead.total_subtasks, lead.completion_rate
        );
    }
    println!("  Pending approvals: {}", s.insights.pending_approvals);
}
