use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use habit_core::{
    filter::CategoryFilter,
    habit::{Category, DayOfWeek},
    insights::ReportingPeriod,
};

#[derive(Debug, Parser)]
#[command(name = "habits", version, about = "Track weekly habits from the terminal")]
pub struct Cli {
    /// Directory holding habits.json and identity.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create an account
    Signup {
        #[arg(long, env = "HABITS_EMAIL")]
        email: String,
        #[arg(long, env = "HABITS_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the password; defaults to the password itself
        #[arg(long)]
        confirm: Option<String>,
    },
    Signin {
        #[arg(long, env = "HABITS_EMAIL")]
        email: String,
        #[arg(long, env = "HABITS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Signout,
    Whoami,
    /// Show habits with their week strip
    List {
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
    },
    Add {
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, default_value = "fitness")]
        category: Category,
        /// Comma separated weekdays, e.g. mon,wed,fri
        #[arg(long, value_delimiter = ',', default_value = "mon,tue,wed,thu,fri")]
        days: Vec<DayOfWeek>,
    },
    Edit {
        /// Habit id or a unique prefix of it
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<DayOfWeek>>,
    },
    Delete {
        id: String,
    },
    /// Mark or unmark a day; defaults to today
    Toggle {
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Insights {
        /// week or month
        #[arg(long)]
        period: Option<ReportingPeriod>,
    },
}
