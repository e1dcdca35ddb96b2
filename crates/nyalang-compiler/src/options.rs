//! Compiler configuration.

/// Options for one compilation.
///
/// # Example
///
/// ```
/// use nyalang_compiler::CompileOptions;
///
/// let options = CompileOptions::default()
///     .with_assembly_name("Zoo")
///     .with_using("Zoo.Animals")
///     .verify_stack(false);
/// assert_eq!(options.assembly_name, "Zoo");
/// assert_eq!(options.usings.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Image name used when the source has no `Title` build-info.
    pub assembly_name: String,
    /// Namespaces searched for unqualified type names.
    pub usings: Vec<String>,
    /// Check that every method leaves the operand stack balanced.
    pub verify_stack: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            assembly_name: String::from("NyaProgram"),
            usings: vec![
                String::from("System"),
                String::from("System.Collections.Generic"),
                String::from("System.Text.RegularExpressions"),
            ],
            verify_stack: true,
        }
    }
}

impl CompileOptions {
    pub fn with_assembly_name(mut self, name: impl Into<String>) -> Self {
        self.assembly_name = name.into();
        self
    }

    pub fn with_using(mut self, namespace: impl Into<String>) -> Self {
        self.usings.push(namespace.into());
        self
    }

    pub fn verify_stack(mut self, verify: bool) -> Self {
        self.verify_stack = verify;
        self
    }
}
