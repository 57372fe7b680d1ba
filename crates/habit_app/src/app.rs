use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use habit_core::{
    filter::CategoryFilter,
    habit::{Habit, HabitDraft, HabitId},
    identity::{Credentials, IdentityProvider, LocalIdentityProvider, SignUpForm},
    insights::InsightsReport,
    merge,
    store::{HabitStore, LocalHabitStore},
    week::{CompletionDay, DateWindow},
    HabitError, HabitTracker, SessionContext,
};
use tracing::{debug, info};

use crate::cli::Command;
use crate::config::AppConfig;

const SHORT_ID_LEN: usize = 8;

pub struct HabitAppController {
    config: AppConfig,
    tracker: HabitTracker,
}

impl HabitAppController {
    pub async fn open(config: AppConfig) -> Result<Self> {
        let habits_path = config.habits_path();
        let identity_path = config.identity_path();
        let store: Arc<dyn HabitStore> = Arc::new(
            LocalHabitStore::open(&habits_path)
                .with_context(|| format!("failed to open {}", habits_path.display()))?,
        );
        let identity: Arc<dyn IdentityProvider> = Arc::new(
            LocalIdentityProvider::open(&identity_path)
                .with_context(|| format!("failed to open {}", identity_path.display()))?,
        );
        let session = SessionContext::attach(identity)
            .await
            .map_err(surface)
            .context("failed to restore session")?;
        let tracker = HabitTracker::builder(store, Arc::new(session))
            .with_window(DateWindow::new(config.week_anchor))
            .build();
        info!(data_dir = %config.data_dir.display(), "habit tracker ready");
        Ok(Self { config, tracker })
    }

    pub fn tracker(&self) -> &HabitTracker {
        &self.tracker
    }

    pub async fn execute(
        &self,
        command: Command,
        today: NaiveDate,
        out: &mut dyn Write,
    ) -> Result<()> {
        debug!(%today, "executing command");
        match command {
            Command::Signup {
                email,
                password,
                confirm,
            } => {
                let form = SignUpForm {
                    confirm_password: confirm.unwrap_or_else(|| password.clone()),
                    email,
                    password,
                };
                self.tracker.session().sign_up(&form).await.map_err(surface)?;
                writeln!(
                    out,
                    "Account created for {}. Sign in with `habits signin`.",
                    form.email.trim()
                )?;
            }
            Command::Signin { email, password } => {
                let session = self
                    .tracker
                    .session()
                    .sign_in(&Credentials::new(email, password))
                    .await
                    .map_err(surface)?;
                writeln!(out, "Signed in as {}.", session.email)?;
            }
            Command::Signout => {
                self.tracker.session().sign_out().await.map_err(surface)?;
                writeln!(out, "Signed out.")?;
            }
            Command::Whoami => match self.tracker.session().session() {
                Some(session) => writeln!(out, "Signed in as {}.", session.email)?,
                None => writeln!(out, "Not signed in.")?,
            },
            Command::List { category } => {
                self.reload().await?;
                let habits = self.tracker.habits();
                let text = render_home(&habits, category, self.tracker.window(), today);
                out.write_all(text.as_bytes())?;
            }
            Command::Add {
                title,
                description,
                category,
                days,
            } => {
                self.reload().await?;
                let draft = HabitDraft {
                    id: None,
                    title,
                    description: description.unwrap_or_default(),
                    category,
                    schedule: days,
                };
                let habit = self.tracker.save_habit(draft).await.map_err(surface)?;
                writeln!(
                    out,
                    "Created {} ({}, {}) {}",
                    habit.title,
                    habit.category,
                    habit.frequency,
                    short_id(&habit.id)
                )?;
            }
            Command::Edit {
                id,
                title,
                description,
                category,
                days,
            } => {
                self.reload().await?;
                let habit = self.resolve(&id)?;
                let mut draft = HabitDraft::editing(&habit);
                if let Some(title) = title {
                    draft.title = title;
                }
                if let Some(description) = description {
                    draft.description = description;
                }
                if let Some(category) = category {
                    draft.category = category;
                }
                if let Some(days) = days {
                    draft.schedule = days;
                }
                let habit = self.tracker.save_habit(draft).await.map_err(surface)?;
                writeln!(
                    out,
                    "Updated {} ({}, {})",
                    habit.title, habit.category, habit.frequency
                )?;
            }
            Command::Delete { id } => {
                self.reload().await?;
                let habit = self.resolve(&id)?;
                self.tracker.delete_habit(&habit.id).await.map_err(surface)?;
                writeln!(out, "Deleted {}.", habit.title)?;
            }
            Command::Toggle { id, date } => {
                self.reload().await?;
                let habit = self.resolve(&id)?;
                let date = date.unwrap_or(today);
                let outcome = self
                    .tracker
                    .toggle_completion(&habit.id, date, today)
                    .await
                    .map_err(surface)?;
                match outcome {
                    Some(true) => writeln!(out, "Marked {} done for {}.", habit.title, date)?,
                    Some(false) => writeln!(out, "Unmarked {} for {}.", habit.title, date)?,
                    None => writeln!(out, "{date} is in the future; nothing changed.")?,
                }
            }
            Command::Insights { period } => {
                self.reload().await?;
                let period = period.unwrap_or(self.config.report_period);
                let report = self.tracker.insights(period, today);
                out.write_all(render_insights(&report).as_bytes())?;
            }
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.tracker.reload().await.map_err(surface)
    }

    /// Matches a full id or an unambiguous prefix of one.
    fn resolve(&self, needle: &str) -> Result<Habit> {
        let needle = needle.trim();
        if needle.is_empty() {
            bail!("a habit id is required");
        }
        let habits = self.tracker.habits();
        if let Some(habit) = habits.iter().find(|h| h.id.as_str() == needle) {
            return Ok(habit.clone());
        }
        let mut matches = habits.iter().filter(|h| h.id.as_str().starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(habit), None) => Ok(habit.clone()),
            (Some(_), Some(_)) => bail!("`{needle}` matches more than one habit"),
            _ => Err(anyhow!("no habit matches `{needle}`")),
        }
    }
}

pub async fn run(config: AppConfig, command: Command) -> Result<()> {
    let app = HabitAppController::open(config).await?;
    let today = Local::now().date_naive();
    let mut buffer = Vec::new();
    app.execute(command, today, &mut buffer).await?;
    std::io::stdout().write_all(&buffer)?;
    Ok(())
}

fn surface(err: HabitError) -> anyhow::Error {
    debug!(%err, "command failed");
    anyhow!(err.user_message())
}

fn short_id(id: &HabitId) -> &str {
    id.as_str().get(..SHORT_ID_LEN).unwrap_or(id.as_str())
}

pub fn format_day_heading(today: NaiveDate) -> String {
    today.format("%A, %B %-d, %Y").to_string()
}

fn day_cell(habit: &Habit, day: &CompletionDay) -> char {
    if day.completed {
        'X'
    } else if day.is_future {
        '-'
    } else if habit.schedule.contains(day.day_of_week) {
        '.'
    } else {
        '_'
    }
}

/// One cell per window day; today is bracketed.
pub fn render_week_strip(habit: &Habit, days: &[CompletionDay]) -> String {
    let mut line = String::new();
    for day in days {
        let cell = format!(
            "{} {:>2} {}",
            day.weekday_label(),
            day.day_number,
            day_cell(habit, day)
        );
        if day.is_today {
            let _ = write!(line, "[{cell}]");
        } else {
            let _ = write!(line, " {cell} ");
        }
    }
    line.trim().to_string()
}

fn render_filter_strip(selected: CategoryFilter) -> String {
    CategoryFilter::STRIP
        .iter()
        .map(|filter| {
            if *filter == selected {
                format!("[{}]", filter.label())
            } else {
                filter.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_home(
    habits: &[Habit],
    filter: CategoryFilter,
    window: DateWindow,
    today: NaiveDate,
) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{}", format_day_heading(today));
    let _ = writeln!(text, "Filter: {}", render_filter_strip(filter));
    let _ = writeln!(text);

    if habits.is_empty() {
        let _ = writeln!(text, "No habits yet.");
        let _ = writeln!(text, "Create Your First Habit: habits add <title> --days mon,wed,fri");
        return text;
    }

    let visible = filter.apply(habits);
    if visible.is_empty() {
        let _ = writeln!(text, "No {} habits.", filter.label());
        return text;
    }

    let days = window.days(today);
    for habit in visible {
        let _ = writeln!(
            text,
            "{}  ({}, {})  {}",
            habit.title,
            habit.category,
            habit.frequency,
            short_id(&habit.id)
        );
        if let Some(description) = &habit.description {
            let _ = writeln!(text, "  {description}");
        }
        let merged = merge::merge(&habit.completion_history, &days);
        let _ = writeln!(text, "  {}", render_week_strip(habit, &merged));
    }
    text
}

pub fn render_insights(report: &InsightsReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Insights, {}", report.period.label());
    let _ = writeln!(text, "Completion Rate: {}%", report.overall_percentage);
    let _ = writeln!(text);
    let _ = writeln!(text, "Daily");
    for tally in &report.daily {
        let _ = writeln!(
            text,
            "  {}  {:>2}/{:<2} {:>3}%",
            tally.date.format("%a %b %d"),
            tally.completed,
            tally.total,
            tally.percentage()
        );
    }
    let _ = writeln!(text);
    let _ = writeln!(text, "Categories");
    if report.categories.is_empty() {
        let _ = writeln!(text, "  No habits yet");
    }
    for entry in &report.categories {
        let _ = writeln!(text, "  {:<10} {}", entry.category.label(), entry.count);
    }
    text
}
