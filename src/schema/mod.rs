pub mod builtin;
pub mod compiled;
pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod validate;

pub use compiled::{
    ArrayItems, CompiledField, CompiledSchema, DefaultValue, FieldSpec, FieldType, RecordShape,
    CREATED_DATE, IMPLICIT_FIELDS, UPDATED_DATE,
};
pub use compiler::{compile_definition, compile_field};
pub use descriptor::{EntityDefinition, RawDescriptor, TypeDescriptor};
pub use error::{CompileError, DescriptorError, ValidationError};
pub use validate::values_equal;
