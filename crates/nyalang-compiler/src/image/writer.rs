//! Binary serialization of a program image.
//!
//! Layout, all integers big-endian, strings as `u32` length + UTF-8:
//!
//! ```text
//! "NYAI" u16:format
//! metadata   name, version[4], attributes
//! types      count, (name, namespace, kind, flags, base, interfaces)*
//! fields     count, (owner, name, type, flags, literal?)*
//! methods    count, (owner, name, kind, attributes, params, return, host?, body?)*
//! constants  count, (tag, payload)*
//! entry      method id or u32::MAX
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use nyalang_core::TypeId;

use super::{MetadataValue, MethodKind, ProgramImage, TypeKind};
use crate::bytecode::Constant;

pub const MAGIC: &[u8; 4] = b"NYAI";
pub const FORMAT_VERSION: u16 = 1;

const NONE: u32 = u32::MAX;

struct ImageWriter<W: Write> {
    out: W,
}

impl<W: Write> ImageWriter<W> {
    fn u8(&mut self, v: u8) -> io::Result<()> {
        self.out.write_all(&[v])
    }

    fn u16(&mut self, v: u16) -> io::Result<()> {
        self.out.write_all(&v.to_be_bytes())
    }

    fn u32(&mut self, v: u32) -> io::Result<()> {
        self.out.write_all(&v.to_be_bytes())
    }

    fn len(&mut self, n: usize) -> io::Result<()> {
        let n = u32::try_from(n).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "table too large"))?;
        self.u32(n)
    }

    fn str(&mut self, s: &str) -> io::Result<()> {
        self.len(s.len())?;
        self.out.write_all(s.as_bytes())
    }

    fn ty(&mut self, id: Option<TypeId>) -> io::Result<()> {
        self.u32(id.map_or(NONE, TypeId::as_u32))
    }

    fn type_kind(&mut self, kind: &TypeKind) -> io::Result<()> {
        match kind {
            TypeKind::Void => self.u8(0),
            TypeKind::Primitive(p) => {
                self.u8(1)?;
                self.u8(*p as u8)
            }
            TypeKind::Class => self.u8(2),
            TypeKind::Interface => self.u8(3),
            TypeKind::Enum => self.u8(4),
            TypeKind::Array { element } => {
                self.u8(5)?;
                self.ty(Some(*element))
            }
            TypeKind::GenericDefinition { arity } => {
                self.u8(6)?;
                self.u32(*arity)
            }
            TypeKind::GenericInstance { definition, args } => {
                self.u8(7)?;
                self.ty(Some(*definition))?;
                self.len(args.len())?;
                args.iter().try_for_each(|&a| self.ty(Some(a)))
            }
        }
    }

    fn constant(&mut self, constant: &Constant) -> io::Result<()> {
        self.u8(constant.tag())?;
        match constant {
            Constant::Int32(v) => self.out.write_all(&v.to_be_bytes()),
            Constant::Int64(v) => self.out.write_all(&v.to_be_bytes()),
            Constant::Float32(v) => self.out.write_all(&v.0.to_be_bytes()),
            Constant::Float64(v) => self.out.write_all(&v.0.to_be_bytes()),
            Constant::String(s) => self.str(s),
        }
    }

    fn image(&mut self, image: &ProgramImage) -> io::Result<()> {
        self.out.write_all(MAGIC)?;
        self.u16(FORMAT_VERSION)?;

        let metadata = image.metadata();
        self.str(&metadata.name)?;
        metadata.version.iter().try_for_each(|&part| self.u16(part))?;
        self.len(metadata.attributes.len())?;
        for (key, value) in &metadata.attributes {
            self.str(key)?;
            match value {
                MetadataValue::String(s) => {
                    self.u8(1)?;
                    self.str(s)?;
                }
                MetadataValue::Bool(b) => {
                    self.u8(2)?;
                    self.u8(u8::from(*b))?;
                }
                MetadataValue::Int(v) => {
                    self.u8(3)?;
                    self.out.write_all(&v.to_be_bytes())?;
                }
            }
        }

        self.len(image.types().len())?;
        for ty in image.types() {
            self.str(&ty.name)?;
            self.str(&ty.namespace)?;
            self.type_kind(&ty.kind)?;
            self.u16(ty.flags.bits())?;
            self.ty(ty.base)?;
            self.len(ty.interfaces.len())?;
            ty.interfaces.iter().try_for_each(|&i| self.ty(Some(i)))?;
        }

        self.len(image.fields().len())?;
        for field in image.fields() {
            self.ty(Some(field.owner))?;
            self.str(&field.name)?;
            self.ty(Some(field.ty))?;
            self.u8(field.flags.bits())?;
            match field.literal {
                Some(v) => {
                    self.u8(1)?;
                    self.out.write_all(&v.to_be_bytes())?;
                }
                None => self.u8(0)?,
            }
        }

        self.len(image.methods().len())?;
        for method in image.methods() {
            self.ty(method.owner)?;
            self.str(&method.name)?;
            self.u8(match method.kind {
                MethodKind::Normal => 0,
                MethodKind::Constructor => 1,
                MethodKind::StaticConstructor => 2,
            })?;
            self.u16(method.attributes.bits())?;
            self.len(method.params.len())?;
            for param in &method.params {
                self.str(&param.name)?;
                self.ty(Some(param.ty))?;
                self.u8(u8::from(param.optional))?;
            }
            self.ty(Some(method.return_type))?;
            self.len(method.overrides.len())?;
            method.overrides.iter().try_for_each(|m| self.u32(m.as_u32()))?;

            let (tag, payload) = method.host.map_or((0, 0), |op| op.encode());
            self.u8(tag)?;
            self.u8(payload)?;

            match &method.body {
                Some(body) => {
                    self.u8(1)?;
                    self.u16(body.max_stack)?;
                    self.len(body.locals.len())?;
                    body.locals.iter().try_for_each(|&l| self.ty(Some(l)))?;
                    self.len(body.code.len())?;
                    self.out.write_all(body.code.code())?;
                }
                None => self.u8(0)?,
            }
        }

        let constants = image.constants().constants();
        self.len(constants.len())?;
        constants.iter().try_for_each(|c| self.constant(c))?;

        self.u32(image.entry_point().map_or(NONE, |m| m.as_u32()))?;
        self.out.flush()
    }
}

impl ProgramImage {
    /// Serialize the image.
    pub fn write_to<W: Write>(&self, out: W) -> io::Result<()> {
        ImageWriter { out }.image(self)
    }

    /// Serialize the image to a file, replacing it if it exists.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Serialize the image into memory.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageMetadata, host};

    #[test]
    fn header_and_trailer() {
        let image = ProgramImage::new();
        let bytes = image.to_bytes();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(&bytes[4..6], &FORMAT_VERSION.to_be_bytes());
        assert_eq!(&bytes[bytes.len() - 4..], &u32::MAX.to_be_bytes());
    }

    #[test]
    fn metadata_is_written() {
        let mut image = ProgramImage::new();
        image.set_metadata(ImageMetadata {
            name: "NyaTest".into(),
            version: [1, 2, 0, 0],
            attributes: vec![("Company".into(), MetadataValue::String("Nya".into()))],
        });
        let bytes = image.to_bytes();
        assert_eq!(&bytes[6..10], &7u32.to_be_bytes());
        assert_eq!(&bytes[10..17], b"NyaTest");
        assert_eq!(&bytes[17..25], &[0, 1, 0, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn int_metadata_is_tagged() {
        let mut image = ProgramImage::new();
        image.set_metadata(ImageMetadata {
            name: "N".into(),
            version: [0; 4],
            attributes: vec![("Build".into(), MetadataValue::Int(42))],
        });
        let bytes = image.to_bytes();
        // magic, format, name, version, attribute count, key
        let value = 4 + 2 + 4 + 1 + 8 + 4 + 4 + 5;
        assert_eq!(&bytes[value - 5..value], b"Build");
        assert_eq!(bytes[value], 3);
        assert_eq!(&bytes[value + 1..value + 9], &42i64.to_be_bytes());
    }

    #[test]
    fn output_is_deterministic() {
        let mut a = ProgramImage::new();
        let mut b = ProgramImage::new();
        a.array_of(host::INT32);
        b.array_of(host::INT32);
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn save_writes_file() {
        let path = std::env::temp_dir().join(format!("nyalang-writer-{}.nyx", std::process::id()));
        let image = ProgramImage::new();
        image.save(&path).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, image.to_bytes());
        let _ = std::fs::remove_file(&path);
    }
}
