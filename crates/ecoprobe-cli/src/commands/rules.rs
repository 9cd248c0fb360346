use crate::OutputFormat;
use anyhow::Result;
use ecoprobe_core::RuleId;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RuleEntry {
    id: RuleId,
    title: &'static str,
}

/// List the rule catalog
pub fn execute(format: OutputFormat) -> Result<()> {
    let catalog: Vec<RuleEntry> = RuleId::ALL
        .iter()
        .map(|id| RuleEntry {
            id: *id,
            title: id.title(),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&catalog)?),
        OutputFormat::Table => {
            println!("Rule,Title");
            for entry in &catalog {
                println!("{},{}", entry.id, entry.title);
            }
        }
        OutputFormat::Pretty => {
            use console::style;

            println!("{}", style("Best-practice rules").bold().cyan());
            for entry in &catalog {
                println!(
                    "  {} {}",
                    style(format!("{:<34}", entry.id.as_str())).yellow(),
                    entry.title
                );
            }
        }
    }

    Ok(())
}
