//! Compilation unit API.
//!
//! Users register source files, build the unit, and execute the result.
//!
//! # Example
//!
//! ```ignore
//! use nyalang::Unit;
//!
//! let mut unit = Unit::new();
//! unit.add_source("main.nya", r#"
//!     class Program {
//!         @public !@entry Main(): double { a = 12; return a + 0.5d; }
//!     }
//! "#)?;
//! unit.build()?;
//! let result = unit.run(&[])?;
//! ```

use std::path::Path;

use bumpalo::Bump;
use nyalang_compiler::{CompileOptions, Compiler, ProgramImage};
use nyalang_core::NyaError;
use nyalang_parser::Parser;
use thiserror::Error;
use tracing::debug;

use crate::vm::{Value, Vm};

/// Errors from the unit lifecycle.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unit has already been built")]
    AlreadyBuilt,

    #[error("unit has no sources")]
    NoSources,

    #[error("unit has not been built")]
    NotBuilt,

    #[error(transparent)]
    Nya(#[from] NyaError),
}

impl UnitError {
    /// The underlying pipeline error, if any.
    pub fn as_nya(&self) -> Option<&NyaError> {
        match self {
            UnitError::Nya(err) => Some(err),
            _ => None,
        }
    }
}

/// A set of sources compiled into one program image.
///
/// 1. Create a unit with [`Unit::new`] or [`Unit::with_options`]
/// 2. Add source files with [`Unit::add_source`]
/// 3. Build with [`Unit::build`]
/// 4. Execute with [`Unit::run`], [`Unit::call`] or a [`Vm`] from [`Unit::vm`]
#[derive(Debug, Default)]
pub struct Unit {
    options: CompileOptions,
    /// Sources in the order they were added.
    sources: Vec<(String, String)>,
    image: Option<ProgramImage>,
}

impl Unit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Add a source file. Sources are compiled together, in order, as one
    /// script.
    pub fn add_source(&mut self, filename: impl Into<String>, source: impl Into<String>) -> Result<(), UnitError> {
        if self.is_built() {
            return Err(UnitError::AlreadyBuilt);
        }
        self.sources.push((filename.into(), source.into()));
        Ok(())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Parse and compile every source into a program image.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&mut self) -> Result<&ProgramImage, UnitError> {
        if self.is_built() {
            return Err(UnitError::AlreadyBuilt);
        }
        if self.sources.is_empty() {
            return Err(UnitError::NoSources);
        }

        let text = self
            .sources
            .iter()
            .map(|(_, source)| source.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let arena = Bump::new();
        let script = Parser::parse(&text, &arena).map_err(NyaError::from)?;
        let image = Compiler::compile(&script, &self.options).map_err(NyaError::from)?;
        debug!(
            sources = self.sources.len(),
            types = image.types().len(),
            methods = image.methods().len(),
            "unit built"
        );

        Ok(self.image.insert(image))
    }

    pub fn is_built(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&ProgramImage> {
        self.image.as_ref()
    }

    pub fn into_image(self) -> Option<ProgramImage> {
        self.image
    }

    fn built(&self) -> Result<&ProgramImage, UnitError> {
        self.image.as_ref().ok_or(UnitError::NotBuilt)
    }

    /// A machine for the built image, printing console output to stdout.
    pub fn vm(&self) -> Result<Vm<'_>, UnitError> {
        Ok(Vm::new(self.built()?))
    }

    /// Run the entry point with `args`.
    pub fn run(&self, args: &[String]) -> Result<Option<Value>, UnitError> {
        let mut vm = self.vm()?;
        vm.run_entry(args).map_err(|err| UnitError::Nya(err.into()))
    }

    /// Call a static method by name.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Option<Value>, UnitError> {
        let mut vm = self.vm()?;
        vm.call(name, args).map_err(|err| UnitError::Nya(err.into()))
    }

    /// Write the built image to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), UnitError> {
        self.built()?.save(path).map_err(|err| UnitError::Nya(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut unit = Unit::new();
        assert!(matches!(unit.build(), Err(UnitError::NoSources)));
        assert!(matches!(unit.run(&[]), Err(UnitError::NotBuilt)));

        unit.add_source("a.nya", "Twice(x: int): int { return x * 2; }").unwrap();
        unit.add_source("b.nya", "Run(): int { return Twice(21); }").unwrap();
        unit.build().unwrap();
        assert!(unit.is_built());
        assert!(matches!(unit.add_source("c.nya", ""), Err(UnitError::AlreadyBuilt)));
        assert_eq!(unit.call("Run", vec![]).unwrap(), Some(Value::I32(42)));
    }

    #[test]
    fn options_name_the_image() {
        let mut unit = Unit::with_options(CompileOptions::default().with_assembly_name("Zoo"));
        unit.add_source("main.nya", "F() { }").unwrap();
        assert_eq!(unit.build().unwrap().name(), "Zoo");
    }

    #[test]
    fn errors_keep_their_phase() {
        let mut unit = Unit::new();
        unit.add_source("bad.nya", "class { }").unwrap();
        let err = unit.build().unwrap_err();
        assert!(err.as_nya().is_some_and(NyaError::is_parse));

        let mut unit = Unit::new();
        unit.add_source("bad.nya", "F(): int { return \"x\"; }").unwrap();
        let err = unit.build().unwrap_err();
        assert!(err.as_nya().is_some_and(NyaError::is_compilation));
    }
}
