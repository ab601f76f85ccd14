use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn list_command(settings: &Path) -> Result<()> {
    let (registry, manager) = super::load_manager(settings)?;
    let reports = manager.report();

    println!("Modules:");

    if registry.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for descriptor in registry.descriptors() {
        let name = descriptor.name();
        match reports.iter().find(|r| r.name == name) {
            None => println!("  - {name} {}", "(disabled)".dimmed()),
            Some(report) => {
                let status = if report.connected {
                    report.status.green()
                } else if report.active {
                    report.status.yellow()
                } else {
                    report.status.red()
                };
                println!("  - {name} ({status})");
                if let Some(error) = &report.error {
                    println!("      {}", error.as_str().red());
                }
            }
        }
    }

    Ok(())
}
