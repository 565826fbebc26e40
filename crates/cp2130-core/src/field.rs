//! Field codec
//!
//! A [`Field`] is a named run of bits inside a register together with the
//! conversion between the raw bits ([`Raw`]) and the domain value
//! ([`Value`]) callers work with. The conversion is picked by [`FieldKind`].
//!
//! Typed access goes through [`FieldValue`], which is implemented for the
//! integer types, `bool`, `Vec<u8>` and every enumeration in [`crate::data`].

use std::fmt;

use thiserror::Error;

use crate::data::{
    ChipSelectControl, ClockPhase, ClockPolarity, EventCounterMode, GpioMode, LockState,
    LogicLevel, OutputMode, PinFunction, PowerMode, TransferPriority,
};

/// Reasons a value is rejected by a field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// No mapping exists for the value (enumeration or threshold range)
    #[error("{0} is not a mapped value")]
    Unmapped(String),

    /// Integer does not fit the field
    #[error("{value} is out of range (max {max})")]
    OutOfRange { value: u32, max: u32 },

    /// Raw byte is not two decimal digits
    #[error("0x{0:02X} is not a valid BCD byte")]
    InvalidBcd(u8),

    /// Byte run of the wrong length
    #[error("expected {expected} bytes, got {actual}")]
    BytesLength { expected: usize, actual: usize },

    /// Constant field given something other than its fixed value
    #[error("expected constant 0x{expected:02X}, got 0x{actual:02X}")]
    ConstantMismatch { expected: u32, actual: u32 },

    /// Value of the wrong kind for the field
    #[error("expected a value of type {expected}")]
    WrongType { expected: &'static str },
}

/// Enumerated domain value stored in an enumeration field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Level(LogicLevel),
    OutputMode(OutputMode),
    GpioMode(GpioMode),
    PinFunction(PinFunction),
    ChipSelect(ChipSelectControl),
    ClockPhase(ClockPhase),
    ClockPolarity(ClockPolarity),
    EventCounter(EventCounterMode),
    Lock(LockState),
    PowerMode(PowerMode),
    TransferPriority(TransferPriority),
}

/// Domain value of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(u32),
    Bool(bool),
    Bytes(Vec<u8>),
    Symbol(Symbol),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Value::Symbol(Symbol::Level(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::OutputMode(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::GpioMode(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::PinFunction(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::ChipSelect(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::ClockPhase(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::ClockPolarity(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::EventCounter(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::Lock(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::PowerMode(v)) => write!(f, "{:?}", v),
            Value::Symbol(Symbol::TransferPriority(v)) => write!(f, "{:?}", v),
        }
    }
}

/// Conversion between a Rust type and a field [`Value`]
pub trait FieldValue: Sized {
    /// Name used in type mismatch errors
    const TYPE_NAME: &'static str;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl FieldValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FieldValue for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldValue for u16 {
    const TYPE_NAME: &'static str = "u16";

    fn into_value(self) -> Value {
        Value::Int(self as u32)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => u16::try_from(v).ok(),
            _ => None,
        }
    }
}

impl FieldValue for u8 {
    const TYPE_NAME: &'static str = "u8";

    fn into_value(self) -> Value {
        Value::Int(self as u32)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => u8::try_from(v).ok(),
            _ => None,
        }
    }
}

impl FieldValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldValue for Vec<u8> {
    const TYPE_NAME: &'static str = "bytes";

    fn into_value(self) -> Value {
        Value::Bytes(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! symbol_values {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Symbol {
                fn from(v: $ty) -> Self {
                    Symbol::$variant(v)
                }
            }

            impl FieldValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn into_value(self) -> Value {
                    Value::Symbol(Symbol::$variant(self))
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Symbol(Symbol::$variant(v)) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

symbol_values! {
    LogicLevel => Level,
    OutputMode => OutputMode,
    GpioMode => GpioMode,
    PinFunction => PinFunction,
    ChipSelectControl => ChipSelect,
    ClockPhase => ClockPhase,
    ClockPolarity => ClockPolarity,
    EventCounterMode => EventCounter,
    LockState => Lock,
    PowerMode => PowerMode,
    TransferPriority => TransferPriority,
}

/// Raw contents of a field as it sits in the register
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raw {
    /// Up to 32 bits, in stream order
    Bits(u32),
    /// Whole bytes, for byte-run fields
    Bytes(Vec<u8>),
}

/// Byte order of a multi-byte integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Ordered list of domain values selected by a small raw index
///
/// Encoding scans the list and takes the first entry for which
/// `matches(requested, entry)` holds.
#[derive(Debug)]
pub struct Threshold {
    pub values: &'static [u32],
    pub matches: fn(u32, u32) -> bool,
}

impl Threshold {
    /// Index of the first entry accepted for `requested`
    pub fn select(&self, requested: u32) -> Option<usize> {
        self.values
            .iter()
            .position(|&candidate| (self.matches)(requested, candidate))
    }
}

/// Conversion rule of a field
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Unsigned integer, identity conversion
    Int(Endian),
    /// Fixed raw value
    Constant(u32),
    /// Bijective table between symbols and raw codes
    Enum(&'static [(Symbol, u32)]),
    /// Two packed decimal digits
    Bcd,
    /// 0 = false, 1 = true
    Bool,
    /// Opaque byte run
    Bytes,
    /// Index into a monotonic list of values
    Range(&'static Threshold),
}

/// Named bit range of a register with its conversion
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub bits: u32,
    pub kind: FieldKind,
}

impl Field {
    pub const fn int(name: &'static str, bits: u32) -> Self {
        Self {
            name,
            bits,
            kind: FieldKind::Int(Endian::Big),
        }
    }

    pub const fn int_le(name: &'static str, bits: u32) -> Self {
        Self {
            name,
            bits,
            kind: FieldKind::Int(Endian::Little),
        }
    }

    pub const fn constant(name: &'static str, bits: u32, value: u32) -> Self {
        Self {
            name,
            bits,
            kind: FieldKind::Constant(value),
        }
    }

    pub const fn enumeration(name: &'static str, bits: u32, table: &'static [(Symbol, u32)]) -> Self {
        Self {
            name,
            bits,
            kind: FieldKind::Enum(table),
        }
    }

    pub const fn bcd(name: &'static str) -> Self {
        Self {
            name,
            bits: 8,
            kind: FieldKind::Bcd,
        }
    }

    /// Single-bit boolean
    pub const fn boolean(name: &'static str) -> Self {
        Self::flag(name, 1)
    }

    /// Boolean occupying `bits` bits
    pub const fn flag(name: &'static str, bits: u32) -> Self {
        Self {
            name,
            bits,
            kind: FieldKind::Bool,
        }
    }

    pub const fn bytes(name: &'static str, len: usize) -> Self {
        Self {
            name,
            bits: (len * 8) as u32,
            kind: FieldKind::Bytes,
        }
    }

    pub const fn range(name: &'static str, bits: u32, threshold: &'static Threshold) -> Self {
        Self {
            name,
            bits,
            kind: FieldKind::Range(threshold),
        }
    }

    /// Largest raw integer the field can hold
    pub fn max_raw(&self) -> u32 {
        if self.bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bits) - 1
        }
    }

    /// Value used when a register is built from defaults
    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Int(_) | FieldKind::Bcd => Value::Int(0),
            FieldKind::Constant(c) => Value::Int(c),
            FieldKind::Enum(table) => table
                .first()
                .map(|&(symbol, _)| Value::Symbol(symbol))
                .unwrap_or(Value::Int(0)),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Bytes => Value::Bytes(vec![0; self.bits as usize / 8]),
            FieldKind::Range(t) => Value::Int(t.values.first().copied().unwrap_or(0)),
        }
    }

    /// Raw contents of the default value, as `defaults` stores them
    pub fn default_raw(&self) -> Raw {
        match self.kind {
            FieldKind::Int(_) | FieldKind::Bcd | FieldKind::Bool | FieldKind::Range(_) => {
                Raw::Bits(0)
            }
            FieldKind::Constant(c) => Raw::Bits(c),
            FieldKind::Enum(table) => Raw::Bits(table.first().map_or(0, |&(_, code)| code)),
            FieldKind::Bytes => Raw::Bytes(vec![0; self.bits as usize / 8]),
        }
    }

    /// Convert raw bits to the domain value
    pub fn decode(&self, raw: &Raw) -> Result<Value, FieldError> {
        let bits = match (self.kind, raw) {
            (FieldKind::Bytes, Raw::Bytes(bytes)) => {
                let expected = self.bits as usize / 8;
                if bytes.len() != expected {
                    return Err(FieldError::BytesLength {
                        expected,
                        actual: bytes.len(),
                    });
                }
                return Ok(Value::Bytes(bytes.clone()));
            }
            (FieldKind::Bytes, Raw::Bits(_)) => {
                return Err(FieldError::WrongType { expected: "bytes" })
            }
            (_, Raw::Bytes(_)) => return Err(FieldError::WrongType { expected: "bits" }),
            (_, Raw::Bits(bits)) => *bits,
        };

        match self.kind {
            FieldKind::Int(Endian::Big) => Ok(Value::Int(bits)),
            FieldKind::Int(Endian::Little) => Ok(Value::Int(swap_bytes(bits, self.bits))),
            FieldKind::Constant(expected) => {
                if bits == expected {
                    Ok(Value::Int(bits))
                } else {
                    Err(FieldError::ConstantMismatch {
                        expected,
                        actual: bits,
                    })
                }
            }
            FieldKind::Enum(table) => table
                .iter()
                .find(|&&(_, code)| code == bits)
                .map(|&(symbol, _)| Value::Symbol(symbol))
                .ok_or_else(|| FieldError::Unmapped(format!("raw code 0x{:02X}", bits))),
            FieldKind::Bcd => bcd_to_int(bits as u8).map(Value::Int),
            FieldKind::Bool => match bits {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(FieldError::Unmapped(format!("raw code 0x{:02X}", other))),
            },
            FieldKind::Range(t) => t
                .values
                .get(bits as usize)
                .map(|&v| Value::Int(v))
                .ok_or_else(|| FieldError::Unmapped(format!("index {}", bits))),
            FieldKind::Bytes => Err(FieldError::WrongType { expected: "bytes" }),
        }
    }

    /// Convert a domain value to raw bits
    pub fn encode(&self, value: &Value) -> Result<Raw, FieldError> {
        match (self.kind, value) {
            (FieldKind::Int(endian), Value::Int(v)) => {
                let max = self.max_raw();
                if *v > max {
                    return Err(FieldError::OutOfRange { value: *v, max });
                }
                Ok(Raw::Bits(match endian {
                    Endian::Big => *v,
                    Endian::Little => swap_bytes(*v, self.bits),
                }))
            }
            (FieldKind::Constant(expected), Value::Int(v)) => {
                if *v == expected {
                    Ok(Raw::Bits(expected))
                } else {
                    Err(FieldError::ConstantMismatch {
                        expected,
                        actual: *v,
                    })
                }
            }
            (FieldKind::Enum(table), Value::Symbol(symbol)) => table
                .iter()
                .find(|(s, _)| s == symbol)
                .map(|&(_, code)| Raw::Bits(code))
                .ok_or_else(|| FieldError::Unmapped(value.to_string())),
            (FieldKind::Bcd, Value::Int(v)) => int_to_bcd(*v).map(|b| Raw::Bits(b as u32)),
            (FieldKind::Bool, Value::Bool(b)) => Ok(Raw::Bits(*b as u32)),
            (FieldKind::Bytes, Value::Bytes(bytes)) => {
                let expected = self.bits as usize / 8;
                if bytes.len() != expected {
                    return Err(FieldError::BytesLength {
                        expected,
                        actual: bytes.len(),
                    });
                }
                Ok(Raw::Bytes(bytes.clone()))
            }
            (FieldKind::Range(t), Value::Int(v)) => t
                .select(*v)
                .map(|i| Raw::Bits(i as u32))
                .ok_or_else(|| FieldError::Unmapped(v.to_string())),
            (kind, _) => Err(FieldError::WrongType {
                expected: kind.type_name(),
            }),
        }
    }

    /// Check the static description for internal consistency
    ///
    /// Returns a description of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        let max = self.max_raw();
        let layout = match self.kind {
            FieldKind::Int(Endian::Little) | FieldKind::Bytes if self.bits % 8 != 0 => {
                Err(format!("{}: width {} is not whole bytes", self.name, self.bits))
            }
            FieldKind::Int(_) | FieldKind::Bytes | FieldKind::Bool if self.bits == 0 => {
                Err(format!("{}: zero width", self.name))
            }
            FieldKind::Int(_) if self.bits > 32 => {
                Err(format!("{}: integers are limited to 32 bits", self.name))
            }
            FieldKind::Constant(c) if c > max => {
                Err(format!("{}: constant 0x{:X} does not fit", self.name, c))
            }
            FieldKind::Bcd if self.bits != 8 => Err(format!("{}: BCD must be 8 bits", self.name)),
            FieldKind::Enum(table) => {
                if table.is_empty() {
                    return Err(format!("{}: empty table", self.name));
                }
                for (i, (symbol, code)) in table.iter().enumerate() {
                    if *code > max {
                        return Err(format!("{}: code 0x{:X} does not fit", self.name, code));
                    }
                    for (other_symbol, other_code) in &table[i + 1..] {
                        if other_code == code {
                            return Err(format!("{}: duplicate code 0x{:X}", self.name, code));
                        }
                        if other_symbol == symbol {
                            return Err(format!("{}: duplicate value {:?}", self.name, symbol));
                        }
                    }
                }
                Ok(())
            }
            FieldKind::Range(t) => {
                if t.values.is_empty() || t.values.len() - 1 > max as usize {
                    Err(format!("{}: range does not fit {} bits", self.name, self.bits))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        };
        layout?;

        match self.decode(&self.default_raw()) {
            Ok(v) if v == self.default_value() => Ok(()),
            _ => Err(format!("{}: default does not round-trip", self.name)),
        }
    }
}

impl FieldKind {
    fn type_name(self) -> &'static str {
        match self {
            FieldKind::Int(_) | FieldKind::Constant(_) | FieldKind::Bcd | FieldKind::Range(_) => {
                "integer"
            }
            FieldKind::Enum(_) => "enumeration",
            FieldKind::Bool => "bool",
            FieldKind::Bytes => "bytes",
        }
    }
}

/// Reverse the byte order of the low `bits` bits of `v`
fn swap_bytes(v: u32, bits: u32) -> u32 {
    let n = (bits / 8) as usize;
    let be = v.to_be_bytes();
    let mut out = 0u32;
    for &b in be[4 - n..].iter().rev() {
        out = (out << 8) | b as u32;
    }
    out
}

/// Decode a packed two-digit decimal byte
pub fn bcd_to_int(bcd: u8) -> Result<u32, FieldError> {
    let tens = bcd >> 4;
    let ones = bcd & 0x0F;
    if tens > 9 || ones > 9 {
        return Err(FieldError::InvalidBcd(bcd));
    }
    Ok(tens as u32 * 10 + ones as u32)
}

/// Encode 0-99 as a packed two-digit decimal byte
pub fn int_to_bcd(value: u32) -> Result<u8, FieldError> {
    if value > 99 {
        return Err(FieldError::OutOfRange { value, max: 99 });
    }
    Ok((((value / 10) << 4) | (value % 10)) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    static LEVELS: [(Symbol, u32); 2] = [
        (Symbol::Level(LogicLevel::Low), 0),
        (Symbol::Level(LogicLevel::High), 1),
    ];

    static FREQUENCIES: Threshold = Threshold {
        values: &[
            12_000_000, 6_000_000, 3_000_000, 1_500_000, 750_000, 375_000, 187_500, 93_800,
        ],
        matches: |requested, candidate| requested >= candidate,
    };

    #[test]
    fn test_int_round_trip() {
        let f = Field::int("count", 8);
        let raw = f.encode(&Value::Int(0xA5)).unwrap();
        assert_eq!(raw, Raw::Bits(0xA5));
        assert_eq!(f.decode(&raw).unwrap(), Value::Int(0xA5));
    }

    #[test]
    fn test_int_rejects_overflow() {
        let f = Field::int("clock_divider", 8);
        assert_eq!(
            f.encode(&Value::Int(256)),
            Err(FieldError::OutOfRange { value: 256, max: 255 })
        );
    }

    #[test]
    fn test_int_little_endian() {
        let f = Field::int_le("vid", 16);
        assert_eq!(f.encode(&Value::Int(0x10C4)).unwrap(), Raw::Bits(0xC410));
        assert_eq!(f.decode(&Raw::Bits(0xC410)).unwrap(), Value::Int(0x10C4));
    }

    #[test]
    fn test_constant() {
        let f = Field::constant("descriptor_type", 8, 0x03);
        assert_eq!(f.default_value(), Value::Int(3));
        assert!(f.encode(&Value::Int(3)).is_ok());
        assert_eq!(
            f.encode(&Value::Int(4)),
            Err(FieldError::ConstantMismatch {
                expected: 3,
                actual: 4
            })
        );
        assert!(matches!(
            f.decode(&Raw::Bits(0x04)),
            Err(FieldError::ConstantMismatch { .. })
        ));
    }

    #[test]
    fn test_enum() {
        let f = Field::enumeration("level", 1, &LEVELS);
        assert_eq!(f.default_value(), LogicLevel::Low.into_value());
        assert_eq!(f.encode(&LogicLevel::High.into_value()).unwrap(), Raw::Bits(1));
        assert_eq!(f.decode(&Raw::Bits(0)).unwrap(), LogicLevel::Low.into_value());

        // Value of another enumeration is not in the table
        assert!(matches!(
            f.encode(&OutputMode::PushPull.into_value()),
            Err(FieldError::Unmapped(_))
        ));
        assert!(matches!(f.decode(&Raw::Bits(2)), Err(FieldError::Unmapped(_))));
        assert_eq!(
            f.encode(&Value::Int(1)),
            Err(FieldError::WrongType {
                expected: "enumeration"
            })
        );
    }

    #[test]
    fn test_bcd() {
        let f = Field::bcd("major_release");
        assert_eq!(f.encode(&Value::Int(42)).unwrap(), Raw::Bits(0x42));
        assert_eq!(f.decode(&Raw::Bits(0x99)).unwrap(), Value::Int(99));
        assert_eq!(
            f.encode(&Value::Int(100)),
            Err(FieldError::OutOfRange { value: 100, max: 99 })
        );
        assert_eq!(f.decode(&Raw::Bits(0x1A)), Err(FieldError::InvalidBcd(0x1A)));
        assert_eq!(f.decode(&Raw::Bits(0xA0)), Err(FieldError::InvalidBcd(0xA0)));
    }

    #[test]
    fn test_bool() {
        let f = Field::boolean("overflow");
        assert_eq!(f.encode(&Value::Bool(true)).unwrap(), Raw::Bits(1));
        assert_eq!(f.decode(&Raw::Bits(0)).unwrap(), Value::Bool(false));

        let wide = Field::flag("active", 8);
        assert!(matches!(wide.decode(&Raw::Bits(2)), Err(FieldError::Unmapped(_))));
    }

    #[test]
    fn test_bytes() {
        let f = Field::bytes("string", 4);
        assert_eq!(f.bits, 32);
        assert_eq!(f.default_value(), Value::Bytes(vec![0; 4]));
        let raw = f.encode(&Value::Bytes(vec![1, 2, 3, 4])).unwrap();
        assert_eq!(f.decode(&raw).unwrap(), Value::Bytes(vec![1, 2, 3, 4]));
        assert_eq!(
            f.encode(&Value::Bytes(vec![1, 2, 3])),
            Err(FieldError::BytesLength {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_range_exact_and_between() {
        let f = Field::range("clock_frequency", 3, &FREQUENCIES);
        assert_eq!(f.encode(&Value::Int(12_000_000)).unwrap(), Raw::Bits(0));
        assert_eq!(f.encode(&Value::Int(6_000_000)).unwrap(), Raw::Bits(1));
        // 5 MHz is below 6 MHz, so the first entry it reaches is 3 MHz
        assert_eq!(f.encode(&Value::Int(5_000_000)).unwrap(), Raw::Bits(2));
        assert_eq!(f.decode(&Raw::Bits(2)).unwrap(), Value::Int(3_000_000));
        assert_eq!(f.encode(&Value::Int(50_000_000)).unwrap(), Raw::Bits(0));
        assert_eq!(f.decode(&Raw::Bits(7)).unwrap(), Value::Int(93_800));
    }

    #[test]
    fn test_range_below_lowest_entry() {
        let f = Field::range("clock_frequency", 3, &FREQUENCIES);
        assert!(matches!(
            f.encode(&Value::Int(1_000)),
            Err(FieldError::Unmapped(_))
        ));
    }

    #[test]
    fn test_check_catches_duplicate_codes() {
        static BAD: [(Symbol, u32); 2] = [
            (Symbol::Level(LogicLevel::Low), 0),
            (Symbol::Level(LogicLevel::High), 0),
        ];
        assert!(Field::enumeration("bad", 1, &BAD).check().is_err());
        assert!(Field::enumeration("good", 1, &LEVELS).check().is_ok());
        assert!(Field::constant("c", 4, 0x1F).check().is_err());
    }

    #[test]
    fn test_default_raw_matches_default_value() {
        let fields = [
            Field::int("count", 16),
            Field::int_le("word", 16),
            Field::constant("descriptor_type", 8, 0x03),
            Field::enumeration("level", 1, &LEVELS),
            Field::bcd("major"),
            Field::boolean("enabled"),
            Field::bytes("string", 4),
            Field::range("clock", 3, &FREQUENCIES),
        ];
        for f in &fields {
            f.check().unwrap();
            assert_eq!(f.decode(&f.default_raw()).unwrap(), f.default_value());
        }
        assert_eq!(fields[2].default_raw(), Raw::Bits(0x03));
        assert_eq!(fields[6].default_raw(), Raw::Bytes(vec![0; 4]));
    }

    #[test]
    fn test_typed_conversion() {
        assert_eq!(u8::from_value(Value::Int(300)), None);
        assert_eq!(u16::from_value(Value::Int(300)), Some(300));
        assert_eq!(bool::from_value(Value::Int(1)), None);
        assert_eq!(
            PinFunction::from_value(PinFunction::ClockOut.into_value()),
            Some(PinFunction::ClockOut)
        );
    }
}
