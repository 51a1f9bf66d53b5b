//! Variable type sigils.
//!
//! Every KSP variable name starts with one character that encodes its
//! value kind and whether it is an array.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The one-character type tag leading a variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Sigil {
    /// `$` integer scalar
    Integer = b'$',
    /// `%` integer array
    IntegerArray = b'%',
    /// `@` string scalar
    String = b'@',
    /// `!` string array
    StringArray = b'!',
    /// `?` real array
    RealArray = b'?',
    /// `~` real scalar
    Real = b'~',
}

impl Sigil {
    /// All sigils, in the order candidates are reported in diagnostics.
    pub const ALL: [Sigil; 6] = [
        Sigil::Integer,
        Sigil::IntegerArray,
        Sigil::String,
        Sigil::StringArray,
        Sigil::RealArray,
        Sigil::Real,
    ];

    pub fn from_char(ch: char) -> Option<Self> {
        u8::try_from(ch).ok().and_then(|b| Sigil::try_from(b).ok())
    }

    #[inline]
    pub fn as_char(self) -> char {
        u8::from(self) as char
    }

    /// Array sigils may take a subscript.
    pub fn is_array(self) -> bool {
        matches!(self, Sigil::IntegerArray | Sigil::StringArray | Sigil::RealArray)
    }

    /// Split a leading sigil off a name, if present.
    pub fn split(name: &str) -> (Option<Sigil>, &str) {
        match name.chars().next().and_then(Sigil::from_char) {
            Some(sigil) => (Some(sigil), &name[1..]),
            None => (None, name),
        }
    }
}

impl fmt::Display for Sigil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_round_trip() {
        for sigil in Sigil::ALL {
            assert_eq!(Sigil::from_char(sigil.as_char()), Some(sigil));
        }
        assert_eq!(Sigil::from_char('x'), None);
        assert_eq!(Sigil::from_char('é'), None);
    }

    #[test]
    fn split_name() {
        assert_eq!(Sigil::split("%notes"), (Some(Sigil::IntegerArray), "notes"));
        assert_eq!(Sigil::split("notes"), (None, "notes"));
        assert_eq!(Sigil::split(""), (None, ""));
    }

    #[test]
    fn array_kinds() {
        assert!(Sigil::RealArray.is_array());
        assert!(!Sigil::Real.is_array());
        assert!(!Sigil::String.is_array());
    }
}
