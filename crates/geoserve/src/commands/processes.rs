//! Processes command - prints the process catalog.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::style;

use geoserve_process::ProcessRegistry;

use super::Context;

/// Arguments for the processes command.
#[derive(Args, Debug)]
pub struct ProcessesArgs {
    /// Path to config file (overrides default discovery)
    #[arg(long, env = "GEOSERVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Script root directory (can be specified multiple times)
    #[arg(long)]
    pub scripts: Vec<PathBuf>,
}

/// Run the processes command.
pub async fn run(args: ProcessesArgs, ctx: &Context) -> Result<()> {
    let loaded = super::load_config(args.config.as_deref(), ctx)?;
    let processes = loaded.config.processes();
    let script_roots = super::script_roots(&args.scripts, processes.script_roots);

    let registry = ProcessRegistry::standard(&processes.catalog_dirs, &script_roots)?;
    let offerings = registry.offerings();

    println!("{}", style("Processes").bold());
    println!();
    if offerings.is_empty() {
        println!("  {}", style("(none)").dim());
        return Ok(());
    }

    for descriptor in &offerings {
        println!("  {}", style(&descriptor.identifier).cyan());
        println!("    {}", descriptor.title);
        if ctx.verbose {
            for port in &descriptor.inputs {
                let marker = if port.is_mandatory() { "" } else { "?" };
                println!(
                    "    {} {}{}: {}",
                    style("in ").dim(),
                    port.name,
                    marker,
                    port.data_type
                );
            }
            for port in &descriptor.outputs {
                println!("    {} {}: {}", style("out").dim(), port.name, port.data_type);
            }
        }
    }
    println!();
    println!("  {} processes", style(offerings.len()).cyan());

    Ok(())
}
