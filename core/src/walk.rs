//! Recursive schema introspection.
//!
//! [`walk`] turns a [`CommandSchema`] into a [`WalkResult`] tree: the option
//! fields of each node, its nested groups, and whether any node needs the
//! ambient context. All validation happens here, once per schema type.

use std::any::TypeId;

use tracing::{debug, trace};

use crate::context::Context;
use crate::schema::{CommandSchema, FieldDecl, Fields};
use crate::types::OptionField;
use crate::validate::{CONTEXT_FIELD, RegistrationError, validate_option, validate_unique};

/// Introspection result for one schema node.
#[derive(Debug, Clone)]
pub struct WalkResult {
    /// Rust type name of the schema.
    pub schema: &'static str,
    /// Fields read from parsed arguments: options and the context field,
    /// in declaration order.
    pub kwarg_names: Vec<String>,
    /// Option fields owned directly by this node.
    pub options: Vec<OptionField>,
    /// Nested groups by field name, in declaration order.
    pub nested: Vec<(String, WalkResult)>,
    /// Whether this node or any descendant declares a context field.
    pub needs_context: bool,
}

impl WalkResult {
    fn new(schema: &'static str) -> Self {
        Self {
            schema,
            kwarg_names: Vec::new(),
            options: Vec::new(),
            nested: Vec::new(),
            needs_context: false,
        }
    }

    /// Every option of the tree: this node's own first, then each nested
    /// group's, depth first.
    pub fn flatten(&self) -> Vec<&OptionField> {
        let mut options: Vec<&OptionField> = self.options.iter().collect();
        for (_, nested) in &self.nested {
            options.extend(nested.flatten());
        }
        options
    }

    /// Finds an option anywhere in the tree by destination name.
    pub fn find_option(&self, name: &str) -> Option<&OptionField> {
        self.flatten().into_iter().find(|field| field.name == name)
    }

    /// Returns the nested group stored under `field`.
    pub fn nested(&self, field: &str) -> Option<&WalkResult> {
        self.nested
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, result)| result)
    }
}

/// Walks and validates a schema tree.
///
/// # Errors
///
/// Returns the first [`RegistrationError`] found, depth first in
/// declaration order, followed by tree-wide duplicate checks.
///
/// # Examples
///
/// ```
/// use typed_command_core::{command_schema, option, walk};
///
/// command_schema! {
///     pub struct Show {
///         option some_option: i64 = option(["-o", "--some-option"]).required(),
///     }
/// }
///
/// let result = walk::<Show>().unwrap();
/// assert_eq!(result.kwarg_names, vec!["some_option"]);
/// assert!(!result.needs_context);
/// ```
pub fn walk<S: CommandSchema>() -> Result<WalkResult, RegistrationError> {
    let result = walk_node::<S>()?;
    validate_unique(&result.flatten())?;
    debug!(
        schema = result.schema,
        options = result.flatten().len(),
        needs_context = result.needs_context,
        "Walked command schema"
    );
    Ok(result)
}

pub(crate) fn walk_node<S: CommandSchema>() -> Result<WalkResult, RegistrationError> {
    let schema = std::any::type_name::<S>();
    let mut fields = Fields::default();
    S::declare(&mut fields);

    let mut result = WalkResult::new(schema);
    for decl in fields.into_decls() {
        match decl {
            FieldDecl::Group { name, walk } => {
                if name == CONTEXT_FIELD {
                    return Err(RegistrationError::ReservedContextName { schema });
                }
                let nested = walk()?;
                result.needs_context |= nested.needs_context;
                result.nested.push((name, nested));
            }
            FieldDecl::Context {
                name,
                type_id,
                type_name,
            } => {
                if type_id != TypeId::of::<Context>() {
                    return Err(RegistrationError::InvalidContextType {
                        schema,
                        field: name,
                        found: type_name,
                    });
                }
                result.needs_context = true;
                result.kwarg_names.push(name);
            }
            FieldDecl::Plain { name } => {
                if name == CONTEXT_FIELD {
                    return Err(RegistrationError::ReservedContextName { schema });
                }
                trace!(schema, field = %name, "Skipping field without option metadata");
            }
            FieldDecl::Option(field) => {
                validate_option(schema, &field)?;
                result.kwarg_names.push(field.name.clone());
                result.options.push(field);
            }
        }
    }

    Ok(result)
}
