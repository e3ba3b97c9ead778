//! Pulling the identifying bits out of a BSDL file.
//!
//! This is not a VHDL parser.  Only two things are looked at: the `IDCODE_REGISTER` attribute
//! and the entity declaration.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractionError;

pub const STEPPING_BITS: usize = 4;
pub const PART_BITS: usize = 16;
pub const MANUFACTURER_BITS: usize = 11;
/// Stepping, part number, manufacturer id, and the mandatory trailing `1`.
pub const IDCODE_BITS: usize = STEPPING_BITS + PART_BITS + MANUFACTURER_BITS + 1;

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new("--[^\n]*").unwrap());
static RE_IDCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\battribute\s+IDCODE_REGISTER\s+of\s+\w+\s*:\s*entity\s+is\b([^;]*);")
        .unwrap()
});
static RE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).unwrap());
static RE_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bentity\s+(\w+)\s+is\b").unwrap());

/// The three fields of an IDCODE, as bit strings, most significant bit first.
///
/// `stepping` may contain wildcard characters (anything but `0` and `1`); the other two
/// fields are always concrete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Idcode {
    pub stepping: String,
    pub part: String,
    pub manufacturer: String,
}

impl fmt::Display for Idcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.stepping, self.part, self.manufacturer)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bsdl {
    pub idcode: Idcode,
    /// The entity name exactly as declared.
    pub entity: String,
}

fn check_binary(field: &'static str, value: &str) -> Result<(), ExtractionError> {
    if value.chars().all(|c| c == '0' || c == '1') {
        Ok(())
    } else {
        Err(ExtractionError::NotBinary {
            field,
            value: value.to_string(),
        })
    }
}

impl Bsdl {
    pub fn parse(text: &str) -> Result<Bsdl, ExtractionError> {
        let text = RE_COMMENT.replace_all(text, "");
        let idcode = Self::parse_idcode(&text)?;
        let entity = RE_ENTITY
            .captures(&text)
            .ok_or(ExtractionError::EntityMissing)?[1]
            .to_string();
        Ok(Bsdl { idcode, entity })
    }

    fn parse_idcode(text: &str) -> Result<Idcode, ExtractionError> {
        let attr = RE_IDCODE
            .captures(text)
            .ok_or(ExtractionError::IdcodeMissing)?;
        let mut bits = String::new();
        let mut quoted = false;
        for piece in RE_QUOTED.captures_iter(&attr[1]) {
            quoted = true;
            bits.extend(piece[1].chars().filter(|c| !c.is_whitespace()));
        }
        if !quoted {
            return Err(ExtractionError::IdcodeUnquoted);
        }
        if !bits.is_ascii() {
            return Err(ExtractionError::NotBinary {
                field: "IDCODE_REGISTER",
                value: bits,
            });
        }
        if bits.len() != IDCODE_BITS {
            return Err(ExtractionError::IdcodeLength(bits.len()));
        }
        if !bits.ends_with('1') {
            return Err(ExtractionError::IdcodeMarker);
        }
        let (stepping, rest) = bits.split_at(STEPPING_BITS);
        let (part, rest) = rest.split_at(PART_BITS);
        let manufacturer = &rest[..MANUFACTURER_BITS];
        check_binary("part number", part)?;
        check_binary("manufacturer id", manufacturer)?;
        Ok(Idcode {
            stepping: stepping.to_string(),
            part: part.to_string(),
            manufacturer: manufacturer.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SAMPLE: &str = r#"
-- sample chip, entity foo is not this one
entity sample_chip is
  generic (PHYSICAL_PIN_MAP : string := "LQFP64");
  port (TCK : in bit; TDI : in bit; TDO : out bit; TMS : in bit);
  use STD_1149_1_2001.all;
  attribute INSTRUCTION_LENGTH of sample_chip : entity is 5;
  attribute IDCODE_REGISTER of sample_chip : entity is
    "0000" &              -- version
    "0110010000010100" &  -- part number
    "00000100000" &       -- manufacturer
    "1";                  -- required by 1149.1
end sample_chip;
"#;

    #[test]
    fn test_sample() {
        let bsdl = Bsdl::parse(SAMPLE).unwrap();
        assert_eq!(bsdl.entity, "sample_chip");
        assert_eq!(bsdl.idcode.stepping, "0000");
        assert_eq!(bsdl.idcode.part, "0110010000010100");
        assert_eq!(bsdl.idcode.manufacturer, "00000100000");
        assert_eq!(
            bsdl.idcode.to_string(),
            "0000011001000001010000000100000"
        );
    }

    #[test]
    fn test_wildcard_single_string() {
        let text = r#"
ENTITY XC9572XL_VQ44 IS
ATTRIBUTE IDCODE_REGISTER OF XC9572XL_VQ44 : ENTITY IS
    "XXXX0101011000000100000010010011";
END XC9572XL_VQ44;
"#;
        let bsdl = Bsdl::parse(text).unwrap();
        assert_eq!(bsdl.entity, "XC9572XL_VQ44");
        assert_eq!(bsdl.idcode.stepping, "XXXX");
        assert_eq!(bsdl.idcode.part, "0101011000000100");
        assert_eq!(bsdl.idcode.manufacturer, "00001001001");
    }

    #[test]
    fn test_commented_out_idcode() {
        let text = r#"
entity chip is
-- attribute IDCODE_REGISTER of chip : entity is "00000110010000010100000001000001";
end chip;
"#;
        assert_matches!(Bsdl::parse(text), Err(ExtractionError::IdcodeMissing));
    }

    #[test]
    fn test_malformed() {
        let unquoted = "entity c is\nattribute IDCODE_REGISTER of c : entity is 0000;\n";
        assert_matches!(Bsdl::parse(unquoted), Err(ExtractionError::IdcodeUnquoted));
        let short = "entity c is\nattribute IDCODE_REGISTER of c : entity is \"0000\" & \"1\";\n";
        assert_matches!(Bsdl::parse(short), Err(ExtractionError::IdcodeLength(5)));
        let marker =
            "entity c is\nattribute IDCODE_REGISTER of c : entity is \"00000110010000010100000001000000\";\n";
        assert_matches!(Bsdl::parse(marker), Err(ExtractionError::IdcodeMarker));
        let wild_part =
            "entity c is\nattribute IDCODE_REGISTER of c : entity is \"0000X110010000010100000001000001\";\n";
        assert_matches!(
            Bsdl::parse(wild_part),
            Err(ExtractionError::NotBinary { field: "part number", .. })
        );
    }

    #[test]
    fn test_entity_missing() {
        let text = "attribute IDCODE_REGISTER of c : entity is \"00000110010000010100000001000001\";\n";
        assert_matches!(Bsdl::parse(text), Err(ExtractionError::EntityMissing));
    }
}
