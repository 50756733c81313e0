use cakeday_core::config::MAX_WINDOW_DAYS;
use cakeday_core::types::parse_birthday;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cakeday",
    version,
    about = "Birthday reminders for the people who care",
    long_about = "Watches employee birthdays and mails every subscribed user a few days ahead.\n\
                  Without a subcommand the notification scheduler runs until Ctrl-C."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path (default: $CAKEDAY_CONFIG, then ~/.cakeday/cakeday.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the notification scheduler until interrupted
    Serve,

    /// Run a single notification cycle and print its report
    RunOnce {
        /// First day of the window, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Days ahead to look, at most 366 (default: scheduler.window_days)
        #[arg(long, value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_WINDOW_DAYS)))]
        days: Option<u32>,
    },

    /// Show whose birthday falls in the window, without sending anything
    Upcoming {
        /// First day of the window, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Days ahead to look, at most 366 (default: scheduler.window_days)
        #[arg(long, value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_WINDOW_DAYS)))]
        days: Option<u32>,
    },

    /// Manage employees
    Employee {
        #[command(subcommand)]
        action: EmployeeAction,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Subscribe a user to an employee's birthday
    Subscribe {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        employee: i64,
    },

    /// Remove a subscription by id
    Unsubscribe { id: i64 },

    /// List every subscription
    Subscriptions {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List who is subscribed to an employee
    Subscribers { employee: i64 },
}

#[derive(Subcommand, Debug)]
pub enum EmployeeAction {
    Add {
        #[arg(long)]
        name: String,
        /// Date of birth, DD.MM.YYYY
        #[arg(long, value_parser = birthday_arg)]
        birthday: NaiveDate,
    },
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one employee by id
    Show { id: i64 },
    /// Look an employee up by exact name
    Find {
        #[arg(long)]
        name: String,
    },
    Remove { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    Add {
        #[arg(long)]
        email: String,
    },
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one user by id
    Show { id: i64 },
    /// Look a user up by email
    Find {
        #[arg(long)]
        email: String,
    },
    Remove { id: i64 },
}

fn birthday_arg(s: &str) -> Result<NaiveDate, String> {
    parse_birthday(s).map_err(|e| e.to_string())
}
