//! Reading & writing helpers shared by the negotiate structures.

use binrw::{
    BinRead, BinResult, Endian,
    io::{Read, Seek, SeekFrom, Write},
};

use crate::DecodeFailure;

/// Number of zero bytes that bring `position` up to an 8-byte boundary.
#[inline]
pub const fn alignment_padding(position: u64) -> u64 {
    (8 - position % 8) % 8
}

/// Fails with [`DecodeFailure::Truncated`] unless `needed` more bytes
/// can be read from the current position of `reader`.
pub fn ensure_remaining<R: Read + Seek>(reader: &mut R, needed: u64) -> BinResult<()> {
    let offset = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(offset))?;

    let actual = end.saturating_sub(offset);
    if actual < needed {
        return Err(DecodeFailure::Truncated {
            offset,
            expected: needed,
            actual,
        }
        .at(offset));
    }
    Ok(())
}

/// Reads `count` items of `item_size` bytes each, after making sure
/// the whole array is present in the stream.
pub fn read_counted<R, T>(
    reader: &mut R,
    endian: Endian,
    (count, item_size): (usize, u64),
) -> BinResult<Vec<T>>
where
    R: Read + Seek,
    T: for<'a> BinRead<Args<'a> = ()>,
{
    ensure_remaining(reader, count as u64 * item_size)?;
    (0..count)
        .map(|_| T::read_options(reader, endian, ()))
        .collect()
}

pub fn write_zeros<W: Write + Seek>(writer: &mut W, count: u64) -> BinResult<()> {
    const ZEROS: [u8; 8] = [0; 8];
    let mut left = count;
    while left > 0 {
        let chunk = left.min(ZEROS.len() as u64);
        writer.write_all(&ZEROS[..chunk as usize])?;
        left -= chunk;
    }
    Ok(())
}

/// Reads a `StructureSize` field and fails unless it equals `expected`.
pub fn check_structure_size<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    expected: u16,
) -> BinResult<()> {
    let pos = reader.stream_position()?;
    let size = u16::read_options(reader, endian, ())?;
    if size != expected {
        return Err(binrw::Error::AssertFail {
            pos,
            message: format!("structure size {size} is not {expected}"),
        });
    }
    Ok(())
}

/// Converts a computed length or offset into the width of its wire field.
pub fn narrow<T: TryFrom<u64>>(value: u64, pos: u64, field: &str) -> BinResult<T> {
    T::try_from(value).map_err(|_| binrw::Error::AssertFail {
        pos,
        message: format!("{field} value {value} does not fit its field"),
    })
}

/// Declares a `u16` wire enum.
///
/// Values outside the declared set fail to decode with
/// [`DecodeFailure::Unsupported`] of the given [`ValueKind`][crate::ValueKind].
/// Variants must be declared in ascending value order, so the derived `Ord`
/// follows the wire values.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $kind:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
        #[repr(u16)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )+
        }

        impl $name {
            /// All the known values, in ascending wire order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];
        }

        impl TryFrom<u16> for $name {
            type Error = $crate::SmbMsgError;

            fn try_from(value: u16) -> ::std::result::Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err($crate::SmbMsgError::UnsupportedValue {
                        kind: $crate::ValueKind::$kind,
                        value,
                    }),
                }
            }
        }

        impl From<$name> for u16 {
            fn from(value: $name) -> u16 {
                value as u16
            }
        }

        impl ::binrw::BinRead for $name {
            type Args<'a> = ();

            fn read_options<R: ::binrw::io::Read + ::binrw::io::Seek>(
                reader: &mut R,
                endian: ::binrw::Endian,
                _: Self::Args<'_>,
            ) -> ::binrw::BinResult<Self> {
                let pos = ::binrw::io::Seek::stream_position(reader)?;
                let value = <u16 as ::binrw::BinRead>::read_options(reader, endian, ())?;
                $name::try_from(value).map_err(|_| {
                    $crate::DecodeFailure::Unsupported {
                        kind: $crate::ValueKind::$kind,
                        value,
                    }
                    .at(pos)
                })
            }
        }

        impl ::binrw::BinWrite for $name {
            type Args<'a> = ();

            fn write_options<W: ::binrw::io::Write + ::binrw::io::Seek>(
                &self,
                writer: &mut W,
                endian: ::binrw::Endian,
                _: Self::Args<'_>,
            ) -> ::binrw::BinResult<()> {
                <u16 as ::binrw::BinWrite>::write_options(&(*self as u16), writer, endian, ())
            }
        }
    };
}

pub(crate) use wire_enum;
