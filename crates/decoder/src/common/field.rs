//! Address fields carried by decoded commands.
//!
//! Templates declare, per sampled column, which semantic field a bit belongs to and at which
//! position. Matching a row collects those bits into a [`FieldAccumulator`]; assembly orders each
//! field's bits by descending declared position (MSB first) and concatenates them. The result is
//! a [`FieldValue`]: an integer plus the number of contributed bits, so it can be rendered as a
//! fixed-width binary string.

use std::fmt;

use serde::{Serialize, Serializer};

/// Semantic address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressField {
    /// Bankgroup address.
    BankGroup,
    /// Bank address within a bankgroup.
    Bank,
    /// Row address.
    Row,
    /// Column address.
    Column,
    /// Command opcode (MPC, MRW).
    Opcode,
    /// Mode register address (MRR, MRW).
    ModeRegister,
}

impl AddressField {
    /// All fields in output order.
    pub const ALL: [Self; 6] = [
        Self::BankGroup,
        Self::Bank,
        Self::Row,
        Self::Column,
        Self::Opcode,
        Self::ModeRegister,
    ];

    /// Short name used in output headers.
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::BankGroup => "bg",
            Self::Bank => "bk",
            Self::Row => "row",
            Self::Column => "col",
            Self::Opcode => "opc",
            Self::ModeRegister => "mra",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::BankGroup => 0,
            Self::Bank => 1,
            Self::Row => 2,
            Self::Column => 3,
            Self::Opcode => 4,
            Self::ModeRegister => 5,
        }
    }
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Highest bit position a template may declare for a field.
pub const MAX_FIELD_BITS: u8 = 32;

/// Fixed-width field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldValue {
    value: u32,
    width: u8,
}

impl FieldValue {
    /// Creates a value of `width` bits; bits of `value` above `width` are dropped.
    pub const fn new(value: u32, width: u8) -> Self {
        let masked = if width >= MAX_FIELD_BITS {
            value
        } else {
            value & ((1u32 << width) - 1)
        };
        Self {
            value: masked,
            width,
        }
    }

    /// Integer value.
    pub const fn value(self) -> u32 {
        self.value
    }

    /// Number of bits.
    pub const fn width(self) -> u8 {
        self.width
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.value, width = self.width as usize)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Resolved address fields of one command; absent fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AddressFields {
    slots: [Option<FieldValue>; 6],
}

impl AddressFields {
    /// Value of `field`, if the command carries it.
    pub const fn get(&self, field: AddressField) -> Option<FieldValue> {
        self.slots[field.slot()]
    }

    /// Sets `field` to `value`.
    pub const fn set(&mut self, field: AddressField, value: FieldValue) {
        self.slots[field.slot()] = Some(value);
    }

    /// Builder-style variant of [`set`](Self::set).
    #[must_use]
    pub const fn with(mut self, field: AddressField, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    /// Bank address.
    pub const fn bank(&self) -> Option<FieldValue> {
        self.get(AddressField::Bank)
    }

    /// Bankgroup address.
    pub const fn bankgroup(&self) -> Option<FieldValue> {
        self.get(AddressField::BankGroup)
    }

    /// Row address.
    pub const fn row(&self) -> Option<FieldValue> {
        self.get(AddressField::Row)
    }

    /// Column address.
    pub const fn column(&self) -> Option<FieldValue> {
        self.get(AddressField::Column)
    }

    /// True if no field is present.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Present fields in output order.
    pub fn iter(&self) -> impl Iterator<Item = (AddressField, FieldValue)> + '_ {
        AddressField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
    }
}

impl fmt::Display for AddressFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for AddressFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.abbreviation(), &value)?;
        }
        map.end()
    }
}

/// Per-field bit accumulator.
///
/// Bits are placed at their declared positions; [`finish`](Self::finish) walks each field from
/// the highest declared position down and concatenates the contributed bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAccumulator {
    placed: [u32; 6],
    declared: [u32; 6],
}

impl FieldAccumulator {
    /// Creates an empty accumulator.
    pub const fn new() -> Self {
        Self {
            placed: [0; 6],
            declared: [0; 6],
        }
    }

    /// Records `bit` (0 or 1) at `position` of `field`.
    ///
    /// Positions at or above [`MAX_FIELD_BITS`] are ignored; the registry rejects them.
    pub const fn push(&mut self, field: AddressField, position: u8, bit: u8) {
        if position >= MAX_FIELD_BITS {
            return;
        }
        let slot = field.slot();
        let mask = 1u32 << position;
        self.declared[slot] |= mask;
        if bit != 0 {
            self.placed[slot] |= mask;
        } else {
            self.placed[slot] &= !mask;
        }
    }

    /// Assembles every field that received at least one bit.
    pub fn finish(&self) -> AddressFields {
        let mut fields = AddressFields::default();
        for field in AddressField::ALL {
            let slot = field.slot();
            let declared = self.declared[slot];
            if declared == 0 {
                continue;
            }
            let mut value = 0u32;
            let mut width = 0u8;
            for position in (0..MAX_FIELD_BITS).rev() {
                let mask = 1u32 << position;
                if declared & mask == 0 {
                    continue;
                }
                value = (value << 1) | u32::from(self.placed[slot] & mask != 0);
                width += 1;
            }
            fields.set(field, FieldValue::new(value, width));
        }
        fields
    }
}
