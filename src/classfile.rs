//! Minimal class-file reader: enough of the format to build binary type,
//! field and method bodies.

use crate::error::ModelError;
use crate::modifiers::Modifiers;

const MAGIC: u32 = 0xCAFE_BABE;

const ACC_SUPER_OR_SYNCHRONIZED: u16 = 0x0020;
const ACC_BRIDGE_OR_VOLATILE: u16 = 0x0040;
const ACC_VARARGS_OR_TRANSIENT: u16 = 0x0080;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassFileError {
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("class file truncated at offset {0}")]
    Truncated(usize),

    #[error("invalid constant pool index {0}")]
    BadIndex(u16),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("malformed modified UTF-8 in constant pool")]
    BadUtf8,
}

impl From<ClassFileError> for ModelError {
    fn from(err: ClassFileError) -> Self {
        ModelError::invalid_contents("class file", err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Constant {
    Unusable,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub constant: Option<String>,
    pub signature: Option<String>,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub exceptions: Vec<String>,
    pub signature: Option<String>,
    pub deprecated: bool,
}

impl MethodEntry {
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_class_initializer(&self) -> bool {
        self.name == "<clinit>"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal name, `java/util/Map$Entry`.
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
    pub signature: Option<String>,
    pub deprecated: bool,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClassFileError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, ClassFileError> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok(hi << 32 | lo)
    }
}

struct ConstantPool(Vec<Constant>);

impl ConstantPool {
    fn read(reader: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u16()?;
        let mut entries = vec![Constant::Unusable];
        let mut index = 1u16;
        while index < count {
            let tag = reader.u8()?;
            let (constant, slots) = match tag {
                1 => {
                    let len = reader.u16()? as usize;
                    (Constant::Utf8(decode_modified_utf8(reader.take(len)?)?), 1)
                }
                3 => (Constant::Integer(reader.u32()? as i32), 1),
                4 => (Constant::Float(f32::from_bits(reader.u32()?)), 1),
                5 => (Constant::Long(reader.u64()? as i64), 2),
                6 => (Constant::Double(f64::from_bits(reader.u64()?)), 2),
                7 => (Constant::Class(reader.u16()?), 1),
                8 => (Constant::String(reader.u16()?), 1),
                9..=12 | 17 | 18 => {
                    reader.take(4)?;
                    (Constant::Other, 1)
                }
                15 => {
                    reader.take(3)?;
                    (Constant::Other, 1)
                }
                16 | 19 | 20 => {
                    reader.take(2)?;
                    (Constant::Other, 1)
                }
                _ => return Err(ClassFileError::UnknownTag { tag, index }),
            };
            entries.push(constant);
            if slots == 2 {
                entries.push(Constant::Unusable);
            }
            index += slots;
        }
        Ok(Self(entries))
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        self.0
            .get(index as usize)
            .filter(|c| **c != Constant::Unusable)
            .ok_or(ClassFileError::BadIndex(index))
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(ClassFileError::BadIndex(index)),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(ClassFileError::BadIndex(index)),
        }
    }

    fn constant_value(&self, index: u16) -> Result<String, ClassFileError> {
        Ok(match self.get(index)? {
            Constant::Integer(v) => v.to_string(),
            Constant::Float(v) => v.to_string(),
            Constant::Long(v) => v.to_string(),
            Constant::Double(v) => v.to_string(),
            Constant::String(s) => format!("{:?}", self.utf8(*s)?),
            _ => return Err(ClassFileError::BadIndex(index)),
        })
    }
}

fn decode_modified_utf8(bytes: &[u8]) -> Result<String, ClassFileError> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(s.to_string());
    }
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        let (unit, width) = if b0 & 0x80 == 0 {
            (b0, 1)
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *bytes.get(i + 1).ok_or(ClassFileError::BadUtf8)? as u16;
            (((b0 & 0x1F) << 6) | (b1 & 0x3F), 2)
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *bytes.get(i + 1).ok_or(ClassFileError::BadUtf8)? as u16;
            let b2 = *bytes.get(i + 2).ok_or(ClassFileError::BadUtf8)? as u16;
            (((b0 & 0x0F) << 12) | ((b1 & 0x3F) << 6) | (b2 & 0x3F), 3)
        } else {
            return Err(ClassFileError::BadUtf8);
        };
        units.push(unit);
        i += width;
    }
    String::from_utf16(&units).map_err(|_| ClassFileError::BadUtf8)
}

#[derive(Default)]
struct Attributes {
    constant: Option<String>,
    exceptions: Vec<String>,
    signature: Option<String>,
    deprecated: bool,
}

fn read_attributes(
    reader: &mut Reader<'_>,
    pool: &ConstantPool,
) -> Result<Attributes, ClassFileError> {
    let mut attributes = Attributes::default();
    let count = reader.u16()?;
    for _ in 0..count {
        let name = pool.utf8(reader.u16()?)?.to_string();
        let len = reader.u32()? as usize;
        let body = reader.take(len)?;
        let mut body = Reader { bytes: body, pos: 0 };
        match name.as_str() {
            "ConstantValue" => attributes.constant = Some(pool.constant_value(body.u16()?)?),
            "Exceptions" => {
                let n = body.u16()?;
                for _ in 0..n {
                    attributes
                        .exceptions
                        .push(pool.class_name(body.u16()?)?.to_string());
                }
            }
            "Signature" => attributes.signature = Some(pool.utf8(body.u16()?)?.to_string()),
            "Deprecated" => attributes.deprecated = true,
            _ => {}
        }
    }
    Ok(attributes)
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = Reader { bytes, pos: 0 };
        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        let pool = ConstantPool::read(&mut reader)?;

        let access_flags = reader.u16()?;
        let this_class = pool.class_name(reader.u16()?)?.to_string();
        let super_index = reader.u16()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index)?.to_string())
        };
        let interface_count = reader.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(reader.u16()?)?.to_string());
        }

        let field_count = reader.u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let access_flags = reader.u16()?;
            let name = pool.utf8(reader.u16()?)?.to_string();
            let descriptor = pool.utf8(reader.u16()?)?.to_string();
            let attributes = read_attributes(&mut reader, &pool)?;
            fields.push(FieldEntry {
                access_flags,
                name,
                descriptor,
                constant: attributes.constant,
                signature: attributes.signature,
                deprecated: attributes.deprecated,
            });
        }

        let method_count = reader.u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let access_flags = reader.u16()?;
            let name = pool.utf8(reader.u16()?)?.to_string();
            let descriptor = pool.utf8(reader.u16()?)?.to_string();
            let attributes = read_attributes(&mut reader, &pool)?;
            methods.push(MethodEntry {
                access_flags,
                name,
                descriptor,
                exceptions: attributes.exceptions,
                signature: attributes.signature,
                deprecated: attributes.deprecated,
            });
        }

        let attributes = read_attributes(&mut reader, &pool)?;
        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: attributes.signature,
            deprecated: attributes.deprecated,
        })
    }

    /// `Entry` for `java/util/Map$Entry`.
    pub fn simple_name(&self) -> &str {
        simple_type_name(&self.this_class)
    }
}

/// Simple name of an internal or class-file name: the part after the last
/// `/` and, for member types, after the last `$`.
pub fn simple_type_name(name: &str) -> &str {
    let name = name.strip_suffix(".class").unwrap_or(name);
    let name = name.rsplit('/').next().unwrap_or(name);
    match name.rsplit_once('$') {
        Some((_, member)) if member.chars().next().is_some_and(|c| !c.is_ascii_digit()) => member,
        _ => name,
    }
}

pub fn internal_to_dotted(name: &str) -> String {
    name.replace('/', ".")
}

pub fn type_modifiers(access_flags: u16, deprecated: bool) -> Modifiers {
    let mut modifiers = Modifiers::from_bits_truncate(
        (access_flags & !ACC_SUPER_OR_SYNCHRONIZED) as u32,
    );
    if deprecated {
        modifiers |= Modifiers::DEPRECATED;
    }
    modifiers
}

pub fn field_modifiers(access_flags: u16, deprecated: bool) -> Modifiers {
    let mut modifiers = Modifiers::from_bits_truncate(access_flags as u32);
    if deprecated {
        modifiers |= Modifiers::DEPRECATED;
    }
    modifiers
}

pub fn method_modifiers(access_flags: u16, deprecated: bool) -> Modifiers {
    let mut modifiers = Modifiers::from_bits_truncate(
        (access_flags & !(ACC_BRIDGE_OR_VOLATILE | ACC_VARARGS_OR_TRANSIENT)) as u32,
    );
    if deprecated {
        modifiers |= Modifiers::DEPRECATED;
    }
    modifiers
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Assembles a class file byte by byte.
    pub(crate) struct ClassBuilder {
        pool: Vec<Vec<u8>>,
        body: Vec<u8>,
    }

    impl ClassBuilder {
        pub(crate) fn new() -> Self {
            Self {
                pool: Vec::new(),
                body: Vec::new(),
            }
        }

        pub(crate) fn utf8(&mut self, s: &str) -> u16 {
            let mut entry = vec![1];
            entry.extend((s.len() as u16).to_be_bytes());
            entry.extend(s.as_bytes());
            self.pool.push(entry);
            self.pool.len() as u16
        }

        pub(crate) fn class(&mut self, name: &str) -> u16 {
            let name = self.utf8(name);
            let mut entry = vec![7];
            entry.extend(name.to_be_bytes());
            self.pool.push(entry);
            self.pool.len() as u16
        }

        pub(crate) fn integer(&mut self, value: i32) -> u16 {
            let mut entry = vec![3];
            entry.extend(value.to_be_bytes());
            self.pool.push(entry);
            self.pool.len() as u16
        }

        pub(crate) fn u16(&mut self, v: u16) -> &mut Self {
            self.body.extend(v.to_be_bytes());
            self
        }

        pub(crate) fn u32(&mut self, v: u32) -> &mut Self {
            self.body.extend(v.to_be_bytes());
            self
        }

        pub(crate) fn finish(&self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend(MAGIC.to_be_bytes());
            out.extend(0u16.to_be_bytes());
            out.extend(61u16.to_be_bytes());
            out.extend((self.pool.len() as u16 + 1).to_be_bytes());
            for entry in &self.pool {
                out.extend(entry);
            }
            out.extend(&self.body);
            out
        }
    }

    /// `public class p/Sample extends java/lang/Object implements java/io/Serializable`
    /// with `public static final int MAX = 7`, a constructor and
    /// `public String name(int, String[]) throws java/io/IOException`.
    pub(crate) fn sample_class() -> Vec<u8> {
        let mut b = ClassBuilder::new();
        let this = b.class("p/Sample");
        let sup = b.class("java/lang/Object");
        let iface = b.class("java/io/Serializable");
        let max = b.utf8("MAX");
        let int_desc = b.utf8("I");
        let constant_value = b.utf8("ConstantValue");
        let seven = b.integer(7);
        let init = b.utf8("<init>");
        let init_desc = b.utf8("()V");
        let name = b.utf8("name");
        let name_desc = b.utf8("(I[Ljava/lang/String;)Ljava/lang/String;");
        let exceptions = b.utf8("Exceptions");
        let io = b.class("java/io/IOException");
        let deprecated = b.utf8("Deprecated");

        b.u16(0x0021).u16(this).u16(sup).u16(1).u16(iface);
        b.u16(1)
            .u16(0x0019)
            .u16(max)
            .u16(int_desc)
            .u16(1)
            .u16(constant_value)
            .u32(2)
            .u16(seven);
        b.u16(2);
        b.u16(0x0001).u16(init).u16(init_desc).u16(0);
        b.u16(0x0081)
            .u16(name)
            .u16(name_desc)
            .u16(2)
            .u16(exceptions)
            .u32(4)
            .u16(1)
            .u16(io)
            .u16(deprecated)
            .u32(0);
        b.u16(0);
        b.finish()
    }

    #[test]
    fn parses_members_and_attributes() {
        let class = ClassFile::parse(&sample_class()).unwrap();
        assert_eq!(class.this_class, "p/Sample");
        assert_eq!(class.simple_name(), "Sample");
        assert_eq!(class.super_class.as_deref(), Some("java/lang/Object"));
        assert_eq!(class.interfaces, ["java/io/Serializable"]);
        assert_eq!(class.fields[0].constant.as_deref(), Some("7"));
        assert!(class.methods[0].is_constructor());
        let name = &class.methods[1];
        assert_eq!(name.exceptions, ["java/io/IOException"]);
        assert!(name.deprecated);
        let modifiers = method_modifiers(name.access_flags, name.deprecated);
        assert_eq!(modifiers, Modifiers::PUBLIC | Modifiers::DEPRECATED);
        assert_eq!(
            type_modifiers(class.access_flags, false),
            Modifiers::PUBLIC
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            ClassFile::parse(&[0, 1, 2, 3]),
            Err(ClassFileError::BadMagic(0x0001_0203))
        );
        let mut bytes = sample_class();
        bytes.truncate(20);
        assert!(matches!(
            ClassFile::parse(&bytes),
            Err(ClassFileError::Truncated(_))
        ));
    }

    #[test]
    fn member_type_names_drop_outer_prefix() {
        assert_eq!(simple_type_name("java/util/Map$Entry"), "Entry");
        assert_eq!(simple_type_name("A$1.class"), "A$1");
        assert_eq!(simple_type_name("Top.class"), "Top");
    }

    #[test]
    fn decodes_modified_utf8_nul() {
        assert_eq!(decode_modified_utf8(&[0xC0, 0x80, b'a']).unwrap(), "\0a");
    }
}
