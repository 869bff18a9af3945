use serde_json::json;

use super::descriptor::EntityDefinition;

pub const LOGIN_FIELD: &str = "email";
pub const SECRET_FIELD: &str = "password";
pub const ROLE_FIELD: &str = "role";
pub const TENANT_FIELD: &str = "tenant_id";
pub const DEFAULT_ROLE: &str = "user";

/// Minimal account definition synthesized when no usable one was loaded.
/// The authentication handlers rely on every field declared here.
pub fn account_definition(kind: &str) -> EntityDefinition {
    let document = json!({
        "name": kind,
        "type": "object",
        "description": "Built-in account definition",
        "properties": {
            "email": { "type": "string", "unique": true, "description": "Login identifier" },
            "password": { "type": "string", "writeOnly": true, "description": "Salted credential hash" },
            "full_name": { "type": "string" },
            "role": { "type": "string", "enum": ["admin", "user"], "default": DEFAULT_ROLE },
            "tenant_id": { "type": "string", "description": "Owning tenant/organization" }
        },
        "required": ["email"]
    });

    // Static document; name is the configured reserved kind
    serde_json::from_value(document).unwrap_or_else(|_| EntityDefinition {
        name: kind.to_string(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::compiled::{DefaultValue, FieldType};
    use crate::schema::compiler::compile_definition;

    #[test]
    fn test_account_definition_compiles() {
        let schema = compile_definition(&account_definition("User"), 8).unwrap();
        assert_eq!(schema.name, "User");

        let login = schema.shape.leaf(LOGIN_FIELD).unwrap();
        assert!(login.unique);
        assert!(login.required);

        let secret = schema.shape.leaf(SECRET_FIELD).unwrap();
        assert!(secret.write_only);

        let role = schema.shape.leaf(ROLE_FIELD).unwrap();
        assert_eq!(role.default, Some(DefaultValue::Literal(json!(DEFAULT_ROLE))));

        assert!(schema.shape.leaf(TENANT_FIELD).is_some());
        let created = schema.shape.leaf("created_date").unwrap();
        assert_eq!(created.field_type, FieldType::Timestamp);
        assert_eq!(created.default, Some(DefaultValue::Now));
    }

    #[test]
    fn test_account_definition_uses_reserved_name() {
        assert_eq!(account_definition("Account").name, "Account");
    }
}
