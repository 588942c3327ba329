//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::store::models::{AuditEntry, KeyInfo};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of key listings (masked values only).
pub fn print_keys_table(keys: &[KeyInfo]) {
    if keys.is_empty() {
        info("No API keys in the vault yet.");
        tip("Run `apivault store <name> --service <type>` to add your first key.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Name",
        "Service",
        "Value",
        "Created",
        "Modified",
        "Active",
        "Description",
    ]);

    for k in keys {
        table.add_row(vec![
            k.key_name.clone(),
            k.service_type.to_string(),
            k.masked_value.clone(),
            k.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            k.last_modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            if k.is_active { "yes".into() } else { "no".into() },
            k.description.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!("{table}");
}

/// Print audit entries in a formatted table.
pub fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Key", "Success", "Error"]);

    for entry in entries {
        let time = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let op = colorize_operation(&entry.operation);
        let key = entry.key_name.as_deref().unwrap_or("-");
        let outcome = if entry.success {
            style("ok").green().to_string()
        } else {
            style("failed").red().to_string()
        };
        let error = entry.error_message.as_deref().unwrap_or("-");

        table.add_row(vec![
            time,
            op,
            key.to_string(),
            outcome,
            error.to_string(),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

/// Colorize operation names for display.
fn colorize_operation(op: &str) -> String {
    match op {
        "store_key" => style(op).green().to_string(),
        "retrieve_key" | "retrieve_key_cached" => style(op).blue().to_string(),
        "update_key" => style(op).yellow().to_string(),
        "delete_key" => style(op).red().to_string(),
        "test_key" => style(op).cyan().to_string(),
        _ => op.to_string(),
    }
}
