use crate::bsdl::STEPPING_BITS;
use crate::error::ExtractionError;

pub fn is_concrete(pattern: &str) -> bool {
    pattern.chars().all(|c| c == '0' || c == '1')
}

/// Expands a stepping pattern into every concrete code it matches.
///
/// Any character other than `0` and `1` is a wildcard.  The result is a set; it is returned
/// in ascending numeric order.
pub fn expand(pattern: &str) -> Result<Vec<String>, ExtractionError> {
    if pattern.chars().count() != STEPPING_BITS {
        return Err(ExtractionError::SteppingWidth(pattern.to_string()));
    }
    let mut mask: u32 = 0;
    let mut value: u32 = 0;
    for (i, c) in pattern.chars().enumerate() {
        let bit = 1 << (STEPPING_BITS - 1 - i);
        match c {
            '0' => mask |= bit,
            '1' => {
                mask |= bit;
                value |= bit;
            }
            _ => (),
        }
    }
    Ok((0..1u32 << STEPPING_BITS)
        .filter(|code| code & mask == value)
        .map(|code| format!("{code:0width$b}", width = STEPPING_BITS))
        .collect())
}

#[test]
fn test_expand() {
    assert_eq!(expand("0101").unwrap(), ["0101"]);
    assert_eq!(expand("XX11").unwrap(), ["0011", "0111", "1011", "1111"]);
    assert_eq!(expand("1x0X").unwrap(), ["1000", "1001", "1100", "1101"]);
    let all = expand("XXXX").unwrap();
    assert_eq!(all.len(), 16);
    assert_eq!(all.first().unwrap(), "0000");
    assert_eq!(all.last().unwrap(), "1111");
}

#[test]
fn test_expand_width() {
    assert!(matches!(expand(""), Err(ExtractionError::SteppingWidth(_))));
    assert!(matches!(expand("010"), Err(ExtractionError::SteppingWidth(_))));
    assert!(matches!(expand("01010"), Err(ExtractionError::SteppingWidth(_))));
}

#[test]
fn test_is_concrete() {
    assert!(is_concrete("0110"));
    assert!(!is_concrete("01X0"));
}
