use serde_json::json;

use super::build_registry;
use crate::cli::utils::output;
use crate::cli::OutputFormat;
use crate::config::RegistryConfig;

pub fn handle(config: RegistryConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let registry = build_registry(config);
    let kinds = registry.kinds();
    output(output_format, &kinds.join("\n"), json!(kinds))
}
