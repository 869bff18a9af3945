use serde_json::json;
use std::fmt::Write;

use super::build_registry;
use crate::cli::utils::output;
use crate::cli::OutputFormat;
use crate::config::RegistryConfig;
use crate::registry::Registry;

pub fn handle(config: RegistryConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let dir = config.definitions_dir.display().to_string();
    let registry = build_registry(config);

    let data = json!({ "directory": dir, "report": registry.report() });
    output(output_format, &render(&registry), data)?;

    let failures = registry.report().failures.len();
    if failures > 0 {
        anyhow::bail!("{} definition(s) failed to load", failures);
    }
    Ok(())
}

pub fn render(registry: &Registry) -> String {
    let report = registry.report();
    let mut text = String::new();

    for (kind, origin) in &report.loaded {
        let _ = writeln!(text, "✓ {} ({})", kind, origin);
    }
    for collision in &report.collisions {
        let _ = writeln!(
            text,
            "! {}: {} replaced {}",
            collision.kind, collision.winner, collision.replaced
        );
    }
    for failure in &report.failures {
        let _ = writeln!(text, "✗ {} [{}]: {}", failure.origin, failure.stage.as_str(), failure.error);
    }
    if report.fallback_used {
        let _ = writeln!(text, "! {} synthesized from the built-in account definition", registry.account_kind());
    }
    if !report.augmented_fields.is_empty() {
        let _ = writeln!(
            text,
            "! {} adjusted for authentication: {}",
            registry.account_kind(),
            report.augmented_fields.join(", ")
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_render_lists_kinds_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Task.json"), r#"{ "properties": { "title": { "type": "string" } } }"#).unwrap();
        fs::write(dir.path().join("Bad.json"), "{").unwrap();

        let config = RegistryConfig { definitions_dir: dir.path().to_path_buf(), ..Default::default() };
        let text = render(&build_registry(config));

        assert!(text.contains("✓ Task"));
        assert!(text.contains("✓ User (<built-in>)"));
        assert!(text.contains("Bad.json [load]"));
        assert!(text.contains("synthesized from the built-in account definition"));
    }
}
