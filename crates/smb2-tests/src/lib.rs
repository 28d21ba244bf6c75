//! Test helpers shared by the smb2-* crates.
//!
//! Only meant to be used as a dev-dependency.

#[doc(hidden)]
pub use binrw;
#[doc(hidden)]
pub use pastey;

/// Converts a hex string into bytes. Whitespace (including newlines) is ignored,
/// so long vectors may be split across lines.
///
/// # Panics
/// On an odd number of digits or a non-hex character.
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    assert!(
        digits.len() % 2 == 0,
        "hex string has an odd number of digits"
    );
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).expect("hex string is not ASCII");
            u8::from_str_radix(pair, 16).expect("invalid hex digit")
        })
        .collect()
}

/// Converts a hex string literal into a `Vec<u8>`. See [`hex_to_bytes`].
#[macro_export]
macro_rules! hex_to_u8_array {
    ($hex:expr) => {
        $crate::hex_to_bytes($hex)
    };
}

/// Generates a test that reads `$hex` as `$type` and compares it to `$value`.
#[macro_export]
macro_rules! test_binrw_read {
    (struct $name:ident { $($field:ident : $value:expr),* $(,)? } => $hex:expr) => {
        $crate::test_binrw_read! {
            $name => $name: $name { $($field: $value),* } => $hex
        }
    };
    ($type:ty => $test_name:ident : $value:expr => $hex:expr) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $test_name:snake _read>]() {
                use $crate::binrw::{io::Cursor, prelude::*};
                let bytes = $crate::hex_to_u8_array! { $hex };
                let mut cursor = Cursor::new(&bytes);
                let value: $type = cursor.read_le().unwrap();
                assert_eq!(value, $value);
            }
        }
    };
}

/// Generates a test that writes `$value` and compares the output to `$hex`.
#[macro_export]
macro_rules! test_binrw_write {
    (struct $name:ident { $($field:ident : $value:expr),* $(,)? } => $hex:expr) => {
        $crate::test_binrw_write! {
            $name => $name: $name { $($field: $value),* } => $hex
        }
    };
    ($type:ty => $test_name:ident : $value:expr => $hex:expr) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $test_name:snake _write>]() {
                use $crate::binrw::{io::Cursor, prelude::*};
                let value: $type = $value;
                let mut cursor = Cursor::new(Vec::new());
                value.write_le(&mut cursor).unwrap();
                assert_eq!(cursor.into_inner(), $crate::hex_to_u8_array! { $hex });
            }
        }
    };
}

/// Generates both the read and the write test for a value.
#[macro_export]
macro_rules! test_binrw {
    ($($v:tt)+) => {
        $crate::test_binrw_read! { $($v)+ }
        $crate::test_binrw_write! { $($v)+ }
    };
}
