//! clap command tree and the handlers driving the dashboard controllers.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use vigie_client::api::{DataSource, FallbackApi, HttpApi};
use vigie_client::auth::{Authenticator, FileSessionStore};
use vigie_client::models::{
    AlertRule, ConnectorKind, ModelSettings, NotificationSettings, NotifyChannel, SensorMetric,
};
use vigie_client::views::{
    suggest_date, ConnectorForm, MaintenanceDraft, MonitorState, RiskLevel, UserProfile,
};
use vigie_client::{ClientConfig, Dashboard};

#[derive(Parser, Debug)]
#[command(name = "vigie")]
#[command(author, version, about = "Vigie - predictive maintenance dashboard (terminal)")]
pub struct Cli {
    /// Configuration file path (defaults to $VIGIE_CONFIG or vigie.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overrides config and $VIGIE_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Change the password of the logged-in user
    Passwd {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Update name or email of the logged-in user
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List equipment
    Equipment,
    /// Show one machine with its maintenance history
    Show { equipment_id: String },
    /// Recent sensor readings of a machine
    Readings {
        equipment_id: String,
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only summarize this metric
        #[arg(short, long)]
        metric: Option<String>,
    },
    /// Run a failure prediction
    Predict { equipment_id: String },
    /// Poll readings and prediction of a machine
    Monitor {
        equipment_id: String,
        /// Number of refreshes to print before exiting
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Alert rules
    Alerts {
        #[command(subcommand)]
        command: AlertCommands,
    },
    /// Data connectors
    Connectors {
        #[command(subcommand)]
        command: ConnectorCommands,
    },
    /// Schedule a maintenance
    Schedule(ScheduleArgs),
    /// Import historical readings (.csv or .json)
    Upload { file: PathBuf },
    /// Fleet analytics
    Analytics {
        #[arg(short, long, default_value = "temperature")]
        metric: String,
        /// Comma separated equipment ids
        #[arg(short, long, value_delimiter = ',')]
        equipment: Vec<String>,
        #[arg(short, long, default_value = vigie_client::views::analytics::DEFAULT_ROI_PERIOD)]
        period: String,
    },
    /// Retrain the prediction model
    Train {
        #[arg(short, long)]
        equipment: Option<String>,
        #[arg(long, default_value = "random_forest")]
        model_type: String,
    },
    /// Model and notification settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum AlertCommands {
    List,
    Add(AlertArgs),
    Toggle { id: String },
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct AlertArgs {
    /// Machine id, or "all"
    #[arg(short, long, default_value = vigie_client::models::ALL_EQUIPMENT)]
    pub equipment: String,
    #[arg(short, long)]
    pub parameter: String,
    /// One of > < >= <= ==
    #[arg(long)]
    pub condition: String,
    #[arg(short, long, allow_negative_numbers = true)]
    pub threshold: f64,
    #[arg(short, long, default_value = "warning")]
    pub severity: String,
    /// Comma separated: email, sms, dashboard
    #[arg(short, long, value_delimiter = ',', default_value = "dashboard")]
    pub notify: Vec<String>,
    #[arg(short, long, default_value = "")]
    pub message: String,
}

#[derive(Subcommand, Debug)]
pub enum ConnectorCommands {
    List,
    /// Show the fields of a connector type
    Schema { kind: String },
    Setup {
        #[arg(short, long = "type")]
        kind: String,
        #[arg(short, long)]
        equipment: String,
        /// field=value, repeatable
        #[arg(short = 's', long = "set", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
    Stop { equipment: String },
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[arg(short, long)]
    pub equipment: String,
    /// YYYY-MM-DD; suggested from the latest prediction when omitted
    #[arg(short, long)]
    pub date: Option<String>,
    #[arg(long = "type")]
    pub maintenance_type: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub technician: Option<String>,
    #[arg(long)]
    pub cost: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    Show,
    Set {
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        sensitivity: Option<f64>,
        #[arg(long)]
        retrain_days: Option<u32>,
    },
    /// Show notification settings, or change them when any option is given
    Notifications {
        #[arg(long)]
        email: Option<bool>,
        #[arg(long)]
        sms: Option<bool>,
        #[arg(long)]
        notify_email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Event toggle, e.g. --event systemUpdates=true (repeatable)
        #[arg(long = "event", value_parser = parse_key_value)]
        events: Vec<(String, String)>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))
}

type Api = HttpApi;

struct App {
    dashboard: Dashboard<Api>,
    auth: Authenticator<Api>,
    json: bool,
}

impl App {
    fn build(cli: &Cli, config: ClientConfig) -> Result<Self> {
        let http = HttpApi::new(&config).context("failed to build HTTP client")?;
        let api = Arc::new(FallbackApi::from_config(http, &config));
        let session_path = config.session_path().context("no location for the session file")?;
        debug!("[console] session file {}", session_path.display());
        let auth = Authenticator::new(api.clone(), Box::new(FileSessionStore::new(session_path)), config.fallback.mock_login)
            .context("failed to restore session")?;
        Ok(Self { dashboard: Dashboard::new(api, config), auth, json: cli.json })
    }

    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    fn require_session(&self) -> Result<()> {
        self.auth.require().context("this command needs a session, run `vigie login` first")?;
        Ok(())
    }
}

fn offline_note(source: &DataSource) -> &'static str {
    if source.is_synthetic() {
        "  [offline: simulated data]"
    } else {
        ""
    }
}

pub async fn run(cli: Cli, config: ClientConfig) -> Result<()> {
    let ctx = App::build(&cli, config)?;
    match cli.command {
        Commands::Login { email, password } => {
            let session = ctx.auth.login(&email, &password).await?;
            let note = if session.is_mock() { " (offline demo account)" } else { "" };
            ctx.print(&session.user, || format!("Logged in as {} <{}>{note}", session.user.name, session.user.email))
        }
        Commands::Logout => {
            ctx.auth.logout()?;
            ctx.print(&"logged out", || "Logged out".to_string())
        }
        Commands::Whoami => match ctx.auth.current() {
            Some(session) => ctx.print(&session.user, || {
                format!("{} <{}> - {}", session.user.name, session.user.email, session.user.role)
            }),
            None => bail!("not logged in"),
        },
        Commands::Register { name, email, password, confirm } => {
            let session = ctx.auth.register(&name, &email, &password, &confirm).await?;
            ctx.print(&session.user, || format!("Account created for {}", session.user.email))
        }
        Commands::Passwd { current, new, confirm } => {
            ctx.require_session()?;
            UserProfile::new(&ctx.auth).change_password(&current, &new, &confirm).await?;
            ctx.print(&"password changed", || "Password changed".to_string())
        }
        Commands::Profile { name, email } => {
            ctx.require_session()?;
            let session = UserProfile::new(&ctx.auth)
                .update_details(name.as_deref(), email.as_deref())
                .await?;
            ctx.print(&session.user, || format!("Profile updated: {} <{}>", session.user.name, session.user.email))
        }
        Commands::Equipment => equipment(&ctx).await,
        Commands::Show { equipment_id } => show(&ctx, &equipment_id).await,
        Commands::Readings { equipment_id, limit, metric } => readings(&ctx, &equipment_id, limit, metric).await,
        Commands::Predict { equipment_id } => {
            let (fetched, risk) = ctx.dashboard.predictions().run(&equipment_id, None).await?;
            let p = &fetched.data;
            ctx.print(p, || {
                format!(
                    "{}: failure probability {:.0}% ({:?} risk){}\n  remaining useful life: {}\n  action: {}",
                    p.equipment_id,
                    p.failure_probability * 100.0,
                    risk,
                    offline_note(&fetched.source),
                    p.remaining_useful_life.map(|d| format!("{d} days")).unwrap_or_else(|| "-".into()),
                    p.recommended_action.as_deref().unwrap_or("-"),
                )
            })
        }
        Commands::Monitor { equipment_id, count } => monitor(&ctx, &equipment_id, count).await,
        Commands::Alerts { command } => alerts(&ctx, command).await,
        Commands::Connectors { command } => connectors(&ctx, command).await,
        Commands::Schedule(args) => schedule(&ctx, args).await,
        Commands::Upload { file } => {
            ctx.require_session()?;
            let summary = ctx.dashboard.uploader().upload_file(&file).await?;
            ctx.print(&summary, || format!("{} ({} readings processed)", summary.message, summary.readings_processed))
        }
        Commands::Analytics { metric, equipment, period } => {
            let metric: SensorMetric = metric.parse()?;
            let report = ctx.dashboard.analytics().load(metric, &equipment, &period).await?;
            ctx.print(&report, || {
                let mut out = format!(
                    "ROI {:.0}%  savings {:.0}  downtime prevented {:.0}h{}\nAvailability {:.0}%  MTBF {:.0}h  MTTR {:.0}h\n",
                    report.roi.roi,
                    report.roi.cost_savings,
                    report.roi.downtime_prevented,
                    offline_note(&report.source),
                    report.reliability.availability,
                    report.reliability.mtbf,
                    report.reliability.mttr,
                );
                for f in &report.feature_importance {
                    out.push_str(&format!("  {:<12} {:.2}\n", f.name, f.value));
                }
                out
            })
        }
        Commands::Train { equipment, model_type } => {
            ctx.require_session()?;
            let resp = ctx.dashboard.analytics().train_model(equipment.as_deref(), &model_type).await?;
            ctx.print(&resp, || match resp.accuracy {
                Some(acc) => format!("{} (accuracy {:.1}%)", resp.message, acc * 100.0),
                None => resp.message.clone(),
            })
        }
        Commands::Settings { command } => settings(&ctx, command).await,
    }
}

async fn equipment(ctx: &App) -> Result<()> {
    ctx.dashboard.mount().await?;
    let state = ctx.dashboard.store().snapshot();
    ctx.print(&state.machines, || {
        let mut out = String::new();
        if let Some(banner) = &state.banner {
            out.push_str(&format!("! {}\n", banner.message));
        }
        for m in &state.machines {
            out.push_str(&format!(
                "{:<14} {:<20} {:<10} {}\n",
                m.equipment_id,
                m.display_name(),
                m.status,
                m.display_location()
            ));
        }
        out
    })
}

async fn show(ctx: &App, equipment_id: &str) -> Result<()> {
    ctx.dashboard.mount().await?;
    ctx.dashboard.select(Some(equipment_id))?;
    let fetched = ctx.dashboard.selected_details().await?;
    let d = &fetched.data;
    ctx.print(d, || {
        let mut out = format!(
            "{} - {} ({}){}\n  location: {}\n  last maintenance: {}\n",
            d.equipment.equipment_id,
            d.equipment.display_name(),
            d.equipment.status,
            offline_note(&fetched.source),
            d.equipment.display_location(),
            d.equipment.last_maintenance_date.map(|x| x.to_string()).unwrap_or_else(|| "-".into()),
        );
        for rec in &d.maintenance_history {
            out.push_str(&format!("  {} {}\n", rec.date, rec.maintenance_type));
        }
        out
    })
}

async fn readings(ctx: &App, equipment_id: &str, limit: Option<usize>, metric: Option<String>) -> Result<()> {
    let mut view = ctx.dashboard.sensors();
    if let Some(limit) = limit {
        view = vigie_client::views::SensorView::new(ctx.dashboard.api().clone(), limit);
    }
    let data = view.load(equipment_id).await?;
    let metrics = match metric {
        Some(m) => vec![m.parse::<SensorMetric>()?],
        None => data.available_metrics(),
    };
    let stats: Vec<_> = metrics.iter().filter_map(|m| data.stats(*m).map(|s| (m.as_str(), s))).collect();
    ctx.print(&data, || {
        let mut out = format!(
            "{}: {} readings, {} anomalies{}\n",
            data.equipment_id,
            data.readings.len(),
            data.anomaly_count(),
            offline_note(&data.source)
        );
        for (name, s) in &stats {
            out.push_str(&format!(
                "  {:<14} min {:>8.2}  max {:>8.2}  mean {:>8.2}  latest {:>8.2}\n",
                name, s.min, s.max, s.mean, s.latest
            ));
        }
        out
    })
}

async fn monitor(ctx: &App, equipment_id: &str, count: usize) -> Result<()> {
    let monitor = ctx.dashboard.monitor();
    let mut rx = monitor.subscribe();
    monitor.select(Some(equipment_id));

    let mut printed = 0;
    while printed < count.max(1) {
        rx.changed().await.context("monitor stopped")?;
        let snap = rx.borrow_and_update().clone();
        if snap.state == MonitorState::Loading {
            continue;
        }
        printed += 1;
        let latest = snap.latest().cloned();
        ctx.print(&snap, || {
            let mut line = format!("[{}] {} {:?}", Utc::now().format("%H:%M:%S"), equipment_id, snap.state);
            if let Some(r) = &latest {
                line.push_str(&format!(
                    "  temp {:.1}  vib {:.2}  press {:.1}",
                    r.temperature.unwrap_or_default(),
                    r.vibration.unwrap_or_default(),
                    r.pressure.unwrap_or_default()
                ));
            }
            if let Some(p) = &snap.prediction {
                line.push_str(&format!(
                    "  risk {:?} ({:.0}%)",
                    RiskLevel::from_probability(p.failure_probability),
                    p.failure_probability * 100.0
                ));
            }
            for err in [&snap.reading_error, &snap.prediction_error].into_iter().flatten() {
                line.push_str(&format!("  ! {err}"));
            }
            line.push_str(offline_note(&snap.source));
            line
        })?;
    }
    monitor.stop();
    Ok(())
}

async fn alerts(ctx: &App, command: AlertCommands) -> Result<()> {
    let mut editor = ctx.dashboard.alerts();
    editor.load().await?;
    match command {
        AlertCommands::List => {
            let note = offline_note(editor.source());
            ctx.print(&editor.rules(), || {
                let mut out = String::new();
                for r in editor.rules() {
                    out.push_str(&format!(
                        "{} {:<24} {} {} {} {} [{:?}]\n",
                        if r.enabled { "●" } else { "○" },
                        r.id,
                        r.equipment_id,
                        r.parameter,
                        r.condition.symbol(),
                        r.threshold,
                        r.severity
                    ));
                }
                out.push_str(note);
                out
            })
        }
        AlertCommands::Add(args) => {
            ctx.require_session()?;
            let rule = AlertRule {
                id: String::new(),
                equipment_id: args.equipment,
                parameter: args.parameter.parse()?,
                condition: args.condition.parse()?,
                threshold: args.threshold,
                severity: args.severity.parse()?,
                notify_via: args
                    .notify
                    .iter()
                    .map(|c| c.parse::<NotifyChannel>())
                    .collect::<Result<_, _>>()?,
                enabled: true,
                notification_message: args.message,
            };
            let id = editor.add(rule).await?;
            ctx.print(&id, || format!("Alert rule {id} added"))
        }
        AlertCommands::Toggle { id } => {
            ctx.require_session()?;
            let enabled = editor.toggle(&id).await?;
            ctx.print(&enabled, || format!("Alert rule {id} {}", if enabled { "enabled" } else { "disabled" }))
        }
        AlertCommands::Delete { id } => {
            ctx.require_session()?;
            editor.delete(&id).await?;
            ctx.print(&id, || format!("Alert rule {id} deleted"))
        }
    }
}

async fn connectors(ctx: &App, command: ConnectorCommands) -> Result<()> {
    let mut manager = ctx.dashboard.connectors();
    match command {
        ConnectorCommands::List => {
            let list = manager.refresh().await?.to_vec();
            ctx.print(&list, || {
                list.iter()
                    .map(|c| format!("{:<14} {:<20} {:?}", c.equipment_id, c.connector_type, c.status))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ConnectorCommands::Schema { kind } => {
            let kind: ConnectorKind = kind.parse()?;
            let fields = vigie_client::views::connector_schema(kind);
            let names: Vec<_> = fields.iter().map(|f| f.name).collect();
            ctx.print(&names, || {
                fields
                    .iter()
                    .map(|f| {
                        format!(
                            "{:<12} {:<24} {:?}{}",
                            f.name,
                            f.label,
                            f.kind,
                            f.default.map(|d| format!(" (default {d})")).unwrap_or_else(|| " (required)".into())
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ConnectorCommands::Setup { kind, equipment, fields } => {
            ctx.require_session()?;
            let mut form = ConnectorForm::new(kind.parse()?);
            for (name, value) in fields {
                form.set(&name, value)?;
            }
            let resp = manager.setup(&form, &equipment).await?;
            ctx.print(&resp, || resp.message.clone())
        }
        ConnectorCommands::Stop { equipment } => {
            ctx.require_session()?;
            let resp = manager.stop(&equipment).await?;
            ctx.print(&resp, || resp.message.clone())
        }
    }
}

async fn schedule(ctx: &App, args: ScheduleArgs) -> Result<()> {
    ctx.require_session()?;
    let date = match args.date {
        Some(date) => date,
        None => {
            let (fetched, _) = ctx.dashboard.predictions().run(&args.equipment, None).await?;
            let today = Utc::now().date_naive();
            suggest_date(Some(&fetched.data), today).to_string()
        }
    };
    let draft = MaintenanceDraft {
        equipment_id: args.equipment,
        date,
        maintenance_type: args.maintenance_type,
        description: args.description,
        technician: args.technician,
        cost: args.cost,
    };
    let resp = ctx.dashboard.scheduler().schedule(&draft).await?;
    ctx.print(&resp, || format!("{} ({} on {})", resp.message, draft.equipment_id, draft.date))
}

async fn settings(ctx: &App, command: SettingsCommands) -> Result<()> {
    if let SettingsCommands::Notifications { email, sms, notify_email, phone, events } = command {
        return notifications(ctx, NotificationChanges { email, sms, notify_email, phone, events }).await;
    }
    let fetched = ctx.dashboard.model_settings().await?;
    let note = offline_note(&fetched.source);
    let current = fetched.data;
    let settings = match command {
        SettingsCommands::Show | SettingsCommands::Notifications { .. } => current,
        SettingsCommands::Set { threshold, sensitivity, retrain_days } => {
            ctx.require_session()?;
            let updated = ModelSettings {
                prediction_threshold: threshold.unwrap_or(current.prediction_threshold),
                anomaly_sensitivity: sensitivity.unwrap_or(current.anomaly_sensitivity),
                retrain_interval_days: retrain_days.unwrap_or(current.retrain_interval_days),
            };
            ctx.dashboard.save_model_settings(updated.clone()).await?;
            updated
        }
    };
    ctx.print(&settings, || {
        format!(
            "prediction threshold {}\nanomaly sensitivity  {}\nretrain every        {} days{note}",
            settings.prediction_threshold, settings.anomaly_sensitivity, settings.retrain_interval_days
        )
    })
}

struct NotificationChanges {
    email: Option<bool>,
    sms: Option<bool>,
    notify_email: Option<String>,
    phone: Option<String>,
    events: Vec<(String, String)>,
}

impl NotificationChanges {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.sms.is_none()
            && self.notify_email.is_none()
            && self.phone.is_none()
            && self.events.is_empty()
    }

    fn apply(self, settings: &mut NotificationSettings) -> Result<()> {
        if let Some(email) = self.email {
            settings.email_notifications = email;
        }
        if let Some(sms) = self.sms {
            settings.sms_notifications = sms;
        }
        if let Some(address) = self.notify_email {
            settings.notification_email = address;
        }
        if let Some(phone) = self.phone {
            settings.notification_phone = phone;
        }
        for (event, raw) in self.events {
            let enabled: bool = raw.trim().parse().with_context(|| format!("--event {event}: expected true or false"))?;
            settings.notification_events.insert(event, enabled);
        }
        Ok(())
    }
}

async fn notifications(ctx: &App, changes: NotificationChanges) -> Result<()> {
    let fetched = ctx.dashboard.notification_settings().await?;
    let note = offline_note(&fetched.source);
    let mut settings = fetched.data;
    if !changes.is_empty() {
        ctx.require_session()?;
        changes.apply(&mut settings)?;
        ctx.dashboard.save_notification_settings(&settings).await?;
        debug!("[settings] notification settings saved");
    }
    ctx.print(&settings, || {
        let events = settings
            .notification_events
            .iter()
            .map(|(name, on)| format!("  {name:<20} {}", if *on { "on" } else { "off" }))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "email {} ({})\nsms   {} ({})\nevents:\n{events}{note}",
            if settings.email_notifications { "on" } else { "off" },
            settings.notification_email,
            if settings.sms_notifications { "on" } else { "off" },
            settings.notification_phone,
        )
    })
}
