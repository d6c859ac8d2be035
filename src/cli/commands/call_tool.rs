//! Tool listing and local tool execution.

use crate::cli::Output;
use crate::tools::{Arguments, ToolInvocationRequest, ToolRegistry};
use anyhow::{bail, Result};

/// List registered tools.
pub fn run_tools() -> Result<()> {
    let registry = ToolRegistry::with_defaults();
    Output::header(&format!("Tools ({})", registry.len()));
    for line in registry.describe().lines() {
        Output::list_item(line);
    }
    Ok(())
}

/// Execute a tool with `key=value` arguments.
pub fn run_call_tool(name: &str, args: &[String]) -> Result<()> {
    let registry = ToolRegistry::with_defaults();
    let request = ToolInvocationRequest::new(name, parse_args(args)?);
    let result = registry.execute(&request)?;
    println!("{}", result.output);
    Ok(())
}

fn parse_args(args: &[String]) -> Result<Arguments> {
    let mut parsed = Arguments::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Invalid argument '{}', expected key=value", arg);
        };
        parsed.insert(key.trim().to_string(), value.to_string());
    }
    Ok(parsed)
}
