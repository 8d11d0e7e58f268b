use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a success line, or the message merged with `data` as pretty JSON.
pub fn output_success<T: Serialize>(output_format: OutputFormat, message: &str, data: Option<&T>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "success": true, "message": message });
            if let Some(data) = data {
                response["data"] = serde_json::to_value(data)?;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

/// Print `label: value` pairs in text mode. JSON mode callers use
/// [`output_success`] instead.
pub fn output_fields(fields: &[(&str, String)]) {
    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in fields {
        println!("  {:width$}  {}", label, value, width = width);
    }
}

pub fn output_error(output_format: OutputFormat, message: &str) {
    match output_format {
        OutputFormat::Json => {
            let response: Value = json!({ "success": false, "error": message });
            println!("{}", response);
        }
        OutputFormat::Text => eprintln!("Error: {}", message),
    }
}
