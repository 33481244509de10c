// src/cli/employees.rs — Employee directory commands

use crate::cli::EmployeeAction;
use crate::store::Store;
use crate::timesheet::types::Employee;

pub fn run_employees(store: &Store, action: EmployeeAction) -> anyhow::Result<()> {
    match action {
        EmployeeAction::Add { external_id, name } => {
            let external_id = external_id.trim().to_string();
            let name = name.trim().to_string();
            if external_id.is_empty() || name.is_empty() {
                anyhow::bail!("employee id and name must not be empty");
            }
            store.upsert_employee(&Employee {
                external_id: external_id.clone(),
                name: name.clone(),
            })?;
            println!("Saved employee {name} ({external_id}).");
        }
        EmployeeAction::List => {
            let employees = store.list_employees()?;
            if employees.is_empty() {
                println!("No employees yet. Add one with `timesheet-bot employees add <id> <name>`.");
                return Ok(());
            }
            for employee in &employees {
                let reachable = store.load_reference(&employee.external_id)?.is_some();
                println!(
                    "  {:<40} {}{}",
                    employee.external_id,
                    employee.name,
                    if reachable { "" } else { "  (has not messaged the bot)" }
                );
            }
        }
    }
    Ok(())
}
