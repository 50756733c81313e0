//! Operator commands that read or write the store directly.

use anyhow::bail;
use cakeday_core::{recurrence, Employee, NotificationWindow, User};
use cakeday_store::{
    Database, EmployeeRepository, StoreError, SubscriptionRepository, UserRepository,
};

use crate::cli::{EmployeeAction, UserAction};

pub fn employee(db: &Database, action: EmployeeAction) -> anyhow::Result<()> {
    let repo = EmployeeRepository::new(db.clone());
    match action {
        EmployeeAction::Add { name, birthday } => {
            let e = repo.create(&name, birthday)?;
            println!("employee {} added: {} ({})", e.id, e.name, e.birthday_label());
        }
        EmployeeAction::List { json } => {
            let employees = repo.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&employees)?);
            } else {
                employees.iter().for_each(print_employee);
            }
        }
        EmployeeAction::Show { id } => match repo.get(id)? {
            Some(e) => print_employee(&e),
            None => {
                return Err(StoreError::NotFound {
                    entity: "employee",
                    id,
                }
                .into())
            }
        },
        EmployeeAction::Find { name } => match repo.find_by_name(&name)? {
            Some(e) => print_employee(&e),
            None => bail!("no employee named {name:?}"),
        },
        EmployeeAction::Remove { id } => {
            repo.delete(id)?;
            println!("employee {id} removed");
        }
    }
    Ok(())
}

pub fn user(db: &Database, action: UserAction) -> anyhow::Result<()> {
    let repo = UserRepository::new(db.clone());
    match action {
        UserAction::Add { email } => {
            let u = repo.create(&email)?;
            println!("user {} added: {}", u.id, u.email);
        }
        UserAction::List { json } => {
            let users = repo.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else {
                users.iter().for_each(print_user);
            }
        }
        UserAction::Show { id } => match repo.get(id)? {
            Some(u) => print_user(&u),
            None => return Err(StoreError::NotFound { entity: "user", id }.into()),
        },
        UserAction::Find { email } => match repo.find_by_email(&email)? {
            Some(u) => print_user(&u),
            None => bail!("no user with email {email}"),
        },
        UserAction::Remove { id } => {
            repo.delete(id)?;
            println!("user {id} removed");
        }
    }
    Ok(())
}

pub fn subscribe(db: &Database, user_id: i64, employee_id: i64) -> anyhow::Result<()> {
    let sub = SubscriptionRepository::new(db.clone()).create(user_id, employee_id)?;
    println!(
        "subscription {}: user {} follows employee {}",
        sub.id, sub.user_id, sub.employee_id
    );
    Ok(())
}

pub fn unsubscribe(db: &Database, id: i64) -> anyhow::Result<()> {
    SubscriptionRepository::new(db.clone()).delete(id)?;
    println!("subscription {id} removed");
    Ok(())
}

pub fn subscriptions(db: &Database, json: bool) -> anyhow::Result<()> {
    let subs = SubscriptionRepository::new(db.clone()).list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&subs)?);
    } else {
        for s in &subs {
            println!("{:>5}  user {:>5}  employee {:>5}", s.id, s.user_id, s.employee_id);
        }
    }
    Ok(())
}

pub fn subscribers(db: &Database, employee_id: i64) -> anyhow::Result<()> {
    for s in SubscriptionRepository::new(db.clone()).subscribers(employee_id)? {
        println!("{:>5}  {}", s.user_id, s.email);
    }
    Ok(())
}

/// Preview a window: who matches and how far away each birthday is.
pub fn upcoming(db: &Database, window: NotificationWindow) -> anyhow::Result<()> {
    let employees = EmployeeRepository::new(db.clone()).upcoming(window)?;
    println!("{window}: {} upcoming", employees.len());
    for e in &employees {
        let days = recurrence::days_until(e.birthday, window.start);
        println!("{:>5}  {:<30}  {}  (+{days}d)", e.id, e.name, e.birthday_label());
    }
    Ok(())
}

fn print_employee(e: &Employee) {
    println!("{:>5}  {:<30}  {}", e.id, e.name, e.birthday.format("%d.%m.%Y"));
}

fn print_user(u: &User) {
    println!("{:>5}  {}", u.id, u.email);
}
