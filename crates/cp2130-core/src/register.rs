//! Register codec
//!
//! A [`RegisterDef`] is a static, ordered bit pattern of [`Field`]s and
//! padding with a fixed byte length. A [`Register`] is one live value of
//! such a definition: the raw contents of every field, kept in the form
//! they take on the wire so that [`Register::pack`] is exact.
//!
//! Bits are packed most-significant-bit first in declaration order. Fields
//! may straddle byte boundaries.

use std::fmt;

use crate::error::{Error, Result};
use crate::field::{Field, FieldError, FieldKind, FieldValue, Raw, Value};

/// One element of a register's bit pattern
#[derive(Debug, Clone, Copy)]
pub enum Segment {
    Field(Field),
    /// Unnamed filler bits, written as zero
    Pad(u32),
}

/// Total width in bits of a bit pattern
pub const fn layout_bits(layout: &[Segment]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < layout.len() {
        total += match &layout[i] {
            Segment::Field(f) => f.bits as usize,
            Segment::Pad(bits) => *bits as usize,
        };
        i += 1;
    }
    total
}

/// Static description of a register type
#[derive(Debug)]
pub struct RegisterDef {
    pub name: &'static str,
    /// Byte length on the wire
    pub len: usize,
    pub layout: &'static [Segment],
    /// `(field, flag)` pairs: setting `field` also sets boolean `flag`
    pub write_flags: &'static [(&'static str, &'static str)],
}

impl RegisterDef {
    /// Named fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.layout.iter().filter_map(|segment| match segment {
            Segment::Field(f) => Some(f),
            Segment::Pad(_) => None,
        })
    }

    fn position(&self, name: &str) -> Result<(usize, &Field)> {
        self.fields()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .ok_or_else(|| Error::UnknownField {
                register: self.name,
                field: name.to_string(),
            })
    }

    /// Build a register with every field at its default value
    pub fn defaults(&'static self) -> Register {
        let raw = self.fields().map(Field::default_raw).collect();
        Register { def: self, raw }
    }

    /// Build a register from defaults overridden by explicit values
    ///
    /// Every value is validated through its field's encoder.
    pub fn make(&'static self, values: &[(&str, Value)]) -> Result<Register> {
        let mut reg = self.defaults();
        for (name, value) in values {
            reg.set(name, value.clone())?;
        }
        Ok(reg)
    }

    /// Decode a raw buffer received from the device
    pub fn unpack(&'static self, data: &[u8]) -> Result<Register> {
        if data.len() != self.len {
            return Err(Error::LengthMismatch {
                register: self.name,
                expected: self.len,
                actual: data.len(),
            });
        }

        let mut reader = BitReader::new(data);
        let mut raw = Vec::new();
        for segment in self.layout {
            let field = match segment {
                Segment::Pad(bits) => {
                    reader.skip(*bits as usize);
                    continue;
                }
                Segment::Field(f) => f,
            };

            let value = match field.kind {
                FieldKind::Bytes => Raw::Bytes(reader.read_bytes(field.bits as usize / 8)),
                _ => Raw::Bits(reader.read(field.bits)),
            };

            match field.decode(&value) {
                Ok(_) => {}
                Err(FieldError::ConstantMismatch { expected, actual }) => {
                    return Err(Error::ProtocolViolation {
                        register: self.name,
                        field: field.name,
                        expected,
                        actual,
                    })
                }
                Err(source) => {
                    return Err(Error::FieldValue {
                        field: field.name,
                        source,
                    })
                }
            }
            raw.push(value);
        }

        Ok(Register { def: self, raw })
    }

    /// Check the description for internal consistency
    pub fn check(&self) -> std::result::Result<(), String> {
        let bits = layout_bits(self.layout);
        if bits != self.len * 8 {
            return Err(format!(
                "{}: layout is {} bits, register is {} bytes",
                self.name, bits, self.len
            ));
        }

        let fields: Vec<&Field> = self.fields().collect();
        for (i, f) in fields.iter().enumerate() {
            f.check().map_err(|e| format!("{}.{}", self.name, e))?;
            if fields[i + 1..].iter().any(|other| other.name == f.name) {
                return Err(format!("{}: duplicate field {}", self.name, f.name));
            }
        }

        for (field, flag) in self.write_flags {
            if !fields.iter().any(|f| f.name == *field) {
                return Err(format!("{}: write flag for unknown field {}", self.name, field));
            }
            match fields.iter().find(|f| f.name == *flag) {
                Some(f) if matches!(f.kind, FieldKind::Bool) => {}
                _ => return Err(format!("{}: {} is not a boolean flag", self.name, flag)),
            }
        }
        Ok(())
    }
}

/// Live value of a register
#[derive(Debug, Clone)]
pub struct Register {
    def: &'static RegisterDef,
    /// Raw contents, one entry per named field
    raw: Vec<Raw>,
}

impl Register {
    pub fn def(&self) -> &'static RegisterDef {
        self.def
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    /// Read a field as a dynamic value
    pub fn value(&self, name: &str) -> Result<Value> {
        let (i, field) = self.def.position(name)?;
        field.decode(&self.raw[i]).map_err(|source| Error::FieldValue {
            field: field.name,
            source,
        })
    }

    /// Read a field as a typed value
    pub fn get<T: FieldValue>(&self, name: &str) -> Result<T> {
        let (_, field) = self.def.position(name)?;
        T::from_value(self.value(name)?).ok_or(Error::FieldValue {
            field: field.name,
            source: FieldError::WrongType {
                expected: T::TYPE_NAME,
            },
        })
    }

    /// Write a field
    ///
    /// The value is encoded first; on failure the register is unchanged.
    pub fn set<T: FieldValue>(&mut self, name: &str, value: T) -> Result<()> {
        let def = self.def;
        let (i, field) = def.position(name)?;
        let raw = field
            .encode(&value.into_value())
            .map_err(|source| Error::FieldValue {
                field: field.name,
                source,
            })?;
        self.raw[i] = raw;

        if let Some(&(_, flag)) = def.write_flags.iter().find(|(f, _)| *f == name) {
            let (j, _) = def.position(flag)?;
            self.raw[j] = Raw::Bits(1);
        }
        Ok(())
    }

    /// All fields with their decoded values, in declaration order
    pub fn values(&self) -> Result<Vec<(&'static str, Value)>> {
        self.def
            .fields()
            .map(|f| Ok((f.name, self.value(f.name)?)))
            .collect()
    }

    /// Serialize to exactly `def().len` bytes
    pub fn pack(&self) -> Vec<u8> {
        let mut writer = BitWriter::with_capacity(self.def.len);
        let mut raw = self.raw.iter();
        for segment in self.def.layout {
            match segment {
                Segment::Pad(bits) => writer.skip(*bits as usize),
                Segment::Field(f) => match raw.next() {
                    Some(Raw::Bits(v)) => writer.write(*v, f.bits),
                    Some(Raw::Bytes(bytes)) => writer.write_bytes(bytes),
                    None => writer.skip(f.bits as usize),
                },
            }
        }
        writer.finish()
    }
}

impl PartialEq for Register {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.def, other.def) && self.raw == other.raw
    }
}

impl Eq for Register {}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.def.name)?;
        for (i, field) in self.def.fields().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match field.decode(&self.raw[i]) {
                Ok(v) => write!(f, "{}{}: {}", sep, field.name, v)?,
                Err(_) => write!(f, "{}{}: ?", sep, field.name)?,
            }
        }
        write!(f, " }}")
    }
}

/// MSB-first bit reader over a byte slice
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bit(&mut self) -> u32 {
        let byte = self.data.get(self.pos / 8).copied().unwrap_or(0);
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        bit as u32
    }

    fn read(&mut self, bits: u32) -> u32 {
        (0..bits).fold(0, |acc, _| (acc << 1) | self.bit())
    }

    fn read_bytes(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| self.read(8) as u8).collect()
    }

    fn skip(&mut self, bits: usize) {
        self.pos += bits;
    }
}

/// MSB-first bit writer into a zeroed buffer
struct BitWriter {
    data: Vec<u8>,
    pos: usize,
}

impl BitWriter {
    fn with_capacity(len: usize) -> Self {
        Self {
            data: vec![0; len],
            pos: 0,
        }
    }

    fn write(&mut self, value: u32, bits: u32) {
        for i in (0..bits).rev() {
            if (value >> i) & 1 == 1 {
                if let Some(byte) = self.data.get_mut(self.pos / 8) {
                    *byte |= 0x80 >> (self.pos % 8);
                }
            }
            self.pos += 1;
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write(b as u32, 8);
        }
    }

    fn skip(&mut self, bits: usize) {
        self.pos += bits;
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LogicLevel;
    use crate::field::Symbol;

    static LEVELS: [(Symbol, u32); 2] = [
        (Symbol::Level(LogicLevel::Low), 0),
        (Symbol::Level(LogicLevel::High), 1),
    ];

    // 3-bit field straddling the first byte boundary, then a constant,
    // then a little-endian word.
    static MIXED: RegisterDef = RegisterDef {
        name: "mixed",
        len: 4,
        layout: &[
            Segment::Pad(6),
            Segment::Field(Field::int("straddle", 3)),
            Segment::Field(Field::enumeration("level", 1, &LEVELS)),
            Segment::Pad(2),
            Segment::Field(Field::constant("tag", 2, 0b10)),
            Segment::Pad(2),
            Segment::Field(Field::int_le("word", 16)),
        ],
        write_flags: &[],
    };

    static FLAGGED: RegisterDef = RegisterDef {
        name: "flagged",
        len: 1,
        layout: &[
            Segment::Field(Field::int("value", 6)),
            Segment::Field(Field::boolean("other")),
            Segment::Field(Field::boolean("write_value")),
        ],
        write_flags: &[("value", "write_value")],
    };

    static BYTES: RegisterDef = RegisterDef {
        name: "bytes",
        len: 3,
        layout: &[
            Segment::Pad(4),
            Segment::Field(Field::bytes("run", 2)),
            Segment::Pad(4),
        ],
        write_flags: &[],
    };

    #[test]
    fn test_defs_are_consistent() {
        MIXED.check().unwrap();
        FLAGGED.check().unwrap();
        BYTES.check().unwrap();
    }

    #[test]
    fn test_pack_straddling_fields() {
        let mut reg = MIXED.defaults();
        reg.set("straddle", 0b101u32).unwrap();
        reg.set("level", LogicLevel::High).unwrap();
        reg.set("word", 0x1234u32).unwrap();

        // 000000 10 | 1 1 00 10 00 | 0x34 | 0x12
        assert_eq!(reg.pack(), vec![0b0000_0010, 0b1100_1000, 0x34, 0x12]);
    }

    #[test]
    fn test_unpack_inverse_of_pack() {
        let reg = MIXED
            .make(&[
                ("straddle", Value::Int(6)),
                ("word", Value::Int(0xBEEF)),
            ])
            .unwrap();
        let packed = reg.pack();
        assert_eq!(packed.len(), 4);
        let back = MIXED.unpack(&packed).unwrap();
        assert_eq!(back, reg);
        assert_eq!(back.get::<u32>("straddle").unwrap(), 6);
        assert_eq!(back.get::<u16>("word").unwrap(), 0xBEEF);
    }

    #[test]
    fn test_unpack_length_mismatch() {
        assert!(matches!(
            MIXED.unpack(&[0, 0, 0]),
            Err(Error::LengthMismatch {
                register: "mixed",
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_unpack_constant_violation() {
        // tag bits are 0b00 instead of 0b10
        assert!(matches!(
            MIXED.unpack(&[0, 0, 0, 0]),
            Err(Error::ProtocolViolation {
                field: "tag",
                expected: 2,
                actual: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_set_rejects_without_mutation() {
        let mut reg = MIXED.defaults();
        reg.set("straddle", 3u32).unwrap();
        assert!(matches!(
            reg.set("straddle", 8u32),
            Err(Error::FieldValue { field: "straddle", .. })
        ));
        assert_eq!(reg.get::<u32>("straddle").unwrap(), 3);
    }

    #[test]
    fn test_unknown_field_and_wrong_type() {
        let reg = MIXED.defaults();
        assert!(matches!(
            reg.get::<u32>("nope"),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            reg.get::<bool>("straddle"),
            Err(Error::FieldValue {
                source: FieldError::WrongType { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_write_flag_follows_field() {
        let mut reg = FLAGGED.defaults();
        assert!(!reg.get::<bool>("write_value").unwrap());
        reg.set("other", true).unwrap();
        assert!(!reg.get::<bool>("write_value").unwrap());
        reg.set("value", 5u32).unwrap();
        assert!(reg.get::<bool>("write_value").unwrap());
        // value | other | write_value
        assert_eq!(reg.pack(), vec![(5 << 2) | 0b11]);
    }

    #[test]
    fn test_unaligned_byte_run() {
        let mut reg = BYTES.defaults();
        reg.set("run", vec![0xAB, 0xCD]).unwrap();
        assert_eq!(reg.pack(), vec![0x0A, 0xBC, 0xD0]);
        let back = BYTES.unpack(&[0x0A, 0xBC, 0xD0]).unwrap();
        assert_eq!(back.get::<Vec<u8>>("run").unwrap(), vec![0xAB, 0xCD]);
    }

    #[test]
    fn test_display() {
        let reg = FLAGGED.make(&[("value", Value::Int(7))]).unwrap();
        assert_eq!(
            reg.to_string(),
            "flagged { value: 7, other: false, write_value: true }"
        );
    }
}
