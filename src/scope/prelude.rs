use super::{Scope, ScopeBuilder, builtins};
use crate::error::DefinitionError;
use std::sync::Arc;

/// Definitions every scope inherits from the root.
const PRELUDE_SOURCE: &str = r#"
enum bool { true, false }

# Non-negative integers.
let uint = int(0..);
"#;

/// Creates the root scope holding the native built-ins and the prelude definitions.
///
/// The returned scope is meant to be created once and shared with every
/// consumer through the `Arc`.
pub fn prelude() -> Result<Arc<Scope>, DefinitionError> {
    let mut builder = ScopeBuilder::new("prelude");
    for builtin in builtins::default_builtins() {
        builder = builder.with_builtin(builtin);
    }
    builder.add_source(PRELUDE_SOURCE)?;
    builder.create_scope()
}
