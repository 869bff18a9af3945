mod common;

use anyhow::Result;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use taskbase_api::config::RegistryConfig;
use taskbase_api::database::MemoryStore;
use taskbase_api::registry::{FailureStage, RegistryBuilder};
use taskbase_api::schema::{ArrayItems, CompiledField, FieldType};

#[test]
fn missing_directory_yields_only_the_account_kind() -> Result<()> {
    let config = RegistryConfig {
        definitions_dir: "/definitely/not/here".into(),
        ..Default::default()
    };
    let registry = RegistryBuilder::new(config, Arc::new(MemoryStore::new())).discover().build();

    assert_eq!(registry.kinds(), vec!["User"]);
    assert!(registry.report().fallback_used);
    assert!(registry.accounts().is_some());
    Ok(())
}

#[test]
fn files_load_in_name_order_and_later_wins() -> Result<()> {
    let first = r#"{ "name": "Task", "properties": { "from_a": { "type": "string" } } }"#;
    let second = "name: Task\nproperties:\n  from_b:\n    type: boolean\n";
    let built = common::registry_with(&[("b_task.yaml", second), ("a_task.json", first)])?;

    let tasks = built.registry.resolve("Task").expect("Task registered");
    assert!(tasks.schema().field("from_b").is_some());
    assert!(tasks.schema().field("from_a").is_none());

    let report = built.registry.report();
    assert_eq!(report.collisions.len(), 1);
    assert!(report.collisions[0].replaced.ends_with("a_task.json"));
    assert!(report.collisions[0].winner.ends_with("b_task.yaml"));
    assert!(report.failures.is_empty());
    Ok(())
}

#[test]
fn malformed_account_file_still_resolves_user() -> Result<()> {
    let built = common::registry_with(&[("User.json", "{ \"properties\": "), ("Task.json", common::TASK_DEFINITION)])?;
    let registry = &built.registry;

    let users = registry.resolve("User").expect("fallback account kind");
    let shape = &users.schema().shape;
    assert!(shape.leaf("email").map(|f| f.unique).unwrap_or(false));
    assert!(shape.leaf("password").map(|f| f.write_only).unwrap_or(false));
    assert!(shape.leaf("role").and_then(|f| f.default.as_ref()).is_some());
    assert!(shape.leaf("tenant_id").is_some());

    assert!(registry.report().fallback_used);
    assert_eq!(registry.report().failures.len(), 1);
    assert_eq!(registry.report().failures[0].stage, FailureStage::Load);
    assert!(registry.resolve("Task").is_some());
    Ok(())
}

#[test]
fn unknown_kinds_resolve_to_none() -> Result<()> {
    let built = common::registry_with(&[("Task.json", common::TASK_DEFINITION)])?;
    assert!(built.registry.resolve("NonexistentKind").is_none());
    assert!(built.registry.resolve("task").is_none());
    Ok(())
}

#[test]
fn invalid_names_and_non_descriptor_files() -> Result<()> {
    let built = common::registry_with(&[
        ("README.md", "# not a descriptor"),
        ("bad name.json", "{ \"properties\": {} }"),
        ("Project.yml", "properties:\n  name:\n    type: string\n"),
    ])?;

    assert_eq!(built.registry.kinds(), vec!["Project", "User"]);
    assert_eq!(built.registry.report().failures.len(), 1);
    Ok(())
}

#[test]
fn compiled_task_shape() -> Result<()> {
    let built = common::registry_with(&[("Task.json", common::TASK_DEFINITION)])?;
    let tasks = built.registry.resolve("Task").expect("Task registered");
    let schema = tasks.schema();

    assert!(schema.shape.leaf("title").map(|f| f.required).unwrap_or(false));
    assert_eq!(schema.shape.leaf("points").map(|f| f.field_type.clone()), Some(FieldType::Number));
    assert_eq!(schema.shape.leaf("due").map(|f| f.field_type.clone()), Some(FieldType::Timestamp));
    assert_eq!(schema.unique_fields(), vec!["code"]);

    match schema.field("subtasks") {
        Some(CompiledField::Leaf(spec)) => match &spec.field_type {
            FieldType::Array { items: ArrayItems::Records { shape } } => {
                assert!(shape.leaf("name").is_some());
                assert!(shape.leaf("done").is_some());
            }
            other => panic!("unexpected subtasks type {:?}", other),
        },
        other => panic!("unexpected subtasks field {:?}", other),
    }
    Ok(())
}
