pub mod demo;
pub mod simulate;

use broom_core::GameStore;
use broom_table::{Notice, TableEvent};
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

/// Print a batch of drained table events, indented under the current step.
fn print_events(events: &[TableEvent]) {
    for event in events {
        match event {
            TableEvent::Display(display) => {
                println!("    {} {display}", "table".dimmed());
            }
            TableEvent::Notice { user, notice } => {
                let tag = format!("to {user}").dimmed();
                match notice {
                    Notice::Info(text) => println!("    {tag} {text}"),
                    Notice::Warn(text) => println!("    {tag} {}", text.yellow()),
                }
            }
            TableEvent::Prompt(prompt) => {
                println!("    {} {prompt}", "prompt".magenta());
            }
        }
    }
}

/// Render every participant's token pool, sorted by name.
fn balances_table(store: &GameStore) -> Table {
    let mut rows: Vec<_> = store
        .participants()
        .map(|p| (p.name.clone(), p.ledger.balance()))
        .collect();
    rows.sort();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Participant", "Adversity Tokens"]);
    for (name, balance) in rows {
        table.add_row(vec![name, balance.to_string()]);
    }
    table
}
