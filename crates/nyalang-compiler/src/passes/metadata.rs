//! Stage 0 - build-info metadata.
//!
//! Maps top-level `Key = literal;` declarations to image metadata:
//!
//! - `Title` names the image
//! - `Version` is a dotted version of one to four 16-bit parts
//! - a fixed set of known assembly attributes is type-checked and stored
//! - anything else is stored as custom metadata with a warning

use nyalang_core::CompilationError;
use nyalang_parser::ast::{BuildInfoDecl, Item, Script};
use tracing::{info, warn};

use crate::image::{ImageMetadata, MetadataValue};
use crate::literal::{self, LiteralValue};
use crate::options::CompileOptions;

type Result<T> = std::result::Result<T, CompilationError>;

const STRING_ATTRIBUTES: [&str; 10] = [
    "FileVersion",
    "InformationalVersion",
    "Company",
    "Copyright",
    "Trademark",
    "Configuration",
    "Culture",
    "Description",
    "Product",
    "Guid",
];

const BOOL_ATTRIBUTES: [&str; 1] = ["ComVisible"];

/// Stage 0: collect build metadata.
pub struct MetadataPass<'a> {
    options: &'a CompileOptions,
    metadata: ImageMetadata,
    title_seen: bool,
}

impl<'a> MetadataPass<'a> {
    pub fn new(options: &'a CompileOptions) -> Self {
        Self {
            options,
            metadata: ImageMetadata {
                name: options.assembly_name.clone(),
                ..ImageMetadata::default()
            },
            title_seen: false,
        }
    }

    pub fn run(mut self, script: &Script<'_>) -> Result<ImageMetadata> {
        for item in script.items() {
            if let Item::BuildInfo(decl) = item {
                self.visit(decl)?;
            }
        }
        info!(
            name = %self.metadata.name,
            attributes = self.metadata.attributes.len(),
            "stage 0: metadata collected"
        );
        Ok(self.metadata)
    }

    fn visit(&mut self, decl: &BuildInfoDecl<'_>) -> Result<()> {
        let key = decl.key.name;
        let value = literal::evaluate(&decl.value)?;
        let invalid = |reason: &str| CompilationError::InvalidBuildInfo {
            key: key.to_string(),
            reason: reason.to_string(),
            span: decl.span,
        };

        match key {
            "Title" => {
                let LiteralValue::String(title) = value else {
                    return Err(invalid("expected a string"));
                };
                if self.title_seen {
                    return Err(invalid("specified more than once"));
                }
                self.title_seen = true;
                self.metadata.name = if title.is_empty() {
                    self.options.assembly_name.clone()
                } else {
                    title
                };
            }
            "Version" => {
                let LiteralValue::String(version) = value else {
                    return Err(invalid("expected a string"));
                };
                self.metadata.version = parse_version(&version).ok_or_else(|| invalid("expected 1 to 4 dotted numbers"))?;
            }
            _ if STRING_ATTRIBUTES.contains(&key) => {
                let LiteralValue::String(s) = value else {
                    return Err(invalid("expected a string"));
                };
                self.metadata.set_attribute(key, MetadataValue::String(s));
            }
            _ if BOOL_ATTRIBUTES.contains(&key) => {
                let LiteralValue::Bool(b) = value else {
                    return Err(invalid("expected true or false"));
                };
                self.metadata.set_attribute(key, MetadataValue::Bool(b));
            }
            _ => {
                warn!(key, "unknown build-info key stored as custom metadata");
                let stored = match value {
                    LiteralValue::Bool(b) => MetadataValue::Bool(b),
                    LiteralValue::String(s) => MetadataValue::String(s),
                    other => match other.as_i64() {
                        Some(v) => MetadataValue::Int(v),
                        None => MetadataValue::String(decl.value.text.to_string()),
                    },
                };
                self.metadata.set_attribute(key, stored);
            }
        }
        Ok(())
    }
}

/// Parse `major[.minor[.build[.revision]]]`; missing parts are 0.
fn parse_version(text: &str) -> Option<[u16; 4]> {
    let mut version = [0u16; 4];
    let parts: Vec<&str> = text.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return None;
    }
    for (slot, part) in version.iter_mut().zip(&parts) {
        *slot = part.trim().parse().ok()?;
    }
    Some(version)
}
