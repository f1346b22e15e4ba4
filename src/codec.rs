//! Primitive byte-level decoders shared by every format in this crate.
//!
//! Pure functions over byte slices — no I/O. Little-endian integers are read
//! with [`byteorder`]; everything else (UTF-16LE names and strings, packed
//! BCD numerics, packed BCD date-times, and the two private epoch
//! conventions) is hand-rolled here because there is no crate in the
//! surrounding ecosystem for either.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{BizdbError, Result};

/// Read a little-endian `u32` at the start of `bytes`.
pub fn read_u32(bytes: &[u8]) -> Result<u32> {
    if bytes.len() < 4 {
        return Err(BizdbError::Corrupt("short read: expected 4 bytes".into()));
    }
    Ok(LittleEndian::read_u32(bytes))
}

/// Read a little-endian `u16` at the start of `bytes`.
pub fn read_u16(bytes: &[u8]) -> Result<u16> {
    if bytes.len() < 2 {
        return Err(BizdbError::Corrupt("short read: expected 2 bytes".into()));
    }
    Ok(LittleEndian::read_u16(bytes))
}

/// Decode a UTF-16LE byte slice into a `String`, with no trimming.
///
/// Fails with [`BizdbError::Encoding`] on an odd byte length or an invalid
/// UTF-16 sequence (lone surrogate).
pub fn decode_utf16le(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(BizdbError::Encoding(format!(
            "UTF-16LE data has odd length {}",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| LittleEndian::read_u16(c))
        .collect();
    String::from_utf16(&units)
        .map_err(|e| BizdbError::Encoding(format!("invalid UTF-16 sequence: {e}")))
}

/// Decode a UTF-16LE byte slice, stopping at the first U+0000 code unit.
///
/// Real container entry names and table descriptions are often padded or
/// followed by junk after the terminator; truncating before decoding avoids
/// tripping over garbage that isn't valid UTF-16 on its own.
pub fn decode_utf16le_name(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| LittleEndian::read_u16(c))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode a NUL-padded UTF-8 byte slice (e.g. the database locale field),
/// truncating at the first NUL.
pub fn decode_utf8_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// A decoded `N` (packed-BCD decimal) field value.
///
/// Kept as sign + decimal-digit strings rather than collapsed into a single
/// numeric type, since callers may want exact decimal text, an integer (when
/// `precision == 0`), or a lossy `f64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numeric {
    pub negative: bool,
    pub integer_digits: String,
    pub fractional_digits: String,
}

impl Numeric {
    /// Lossy floating-point value.
    pub fn to_f64(&self) -> f64 {
        let s = self.to_string();
        s.parse().unwrap_or(0.0)
    }

    /// Exact integer value, if there is no fractional part.
    pub fn to_i128(&self) -> Option<i128> {
        if !self.fractional_digits.is_empty() {
            return None;
        }
        let s = format!("{}{}", if self.negative { "-" } else { "" }, self.integer_digits);
        s.parse().ok()
    }
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "{}", self.integer_digits)?;
        if !self.fractional_digits.is_empty() {
            write!(f, ".{}", self.fractional_digits)?;
        }
        Ok(())
    }
}

/// Decode a packed-BCD `N` (Numeric) field.
///
/// `bytes` must be exactly `length / 2 + 1` bytes (the on-disk size for an
/// `N` field of declared `length`/`precision`, per the row layout table).
/// The first nibble is the sign (`0` => negative, any other value =>
/// non-negative). The integer part is every digit up to the last
/// `precision` of the whole hex string; the fractional part, when
/// `precision > 0`, is the `precision`-digit window ending exactly at
/// `length` hex digits in — not at the end of the (possibly longer, due to
/// the nibble-packing round-up) hex string itself.
pub fn decode_numeric(bytes: &[u8], length: usize, precision: usize) -> Result<Numeric> {
    if bytes.is_empty() {
        return Err(BizdbError::Corrupt("numeric field has no bytes".into()));
    }
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        hex.push_str(&format!("{:02X}", b));
    }
    let negative = hex.as_bytes()[0] == b'0';

    let oob = || BizdbError::Corrupt(format!("numeric field length {length} precision {precision} out of range for {} hex digits", hex.len()));

    if precision == 0 {
        let end = 1 + length;
        let digits = hex.get(1..end).ok_or_else(oob)?;
        return Ok(Numeric {
            negative,
            integer_digits: digits.to_string(),
            fractional_digits: String::new(),
        });
    }

    let int_end = hex.len().checked_sub(precision).ok_or_else(oob)?;
    let integer_digits = hex.get(1..int_end).ok_or_else(oob)?.to_string();

    let frac_end = 1 + length;
    let frac_start = frac_end.checked_sub(precision).ok_or_else(oob)?;
    let fractional_digits = hex.get(frac_start..frac_end).ok_or_else(oob)?.to_string();

    Ok(Numeric {
        negative,
        integer_digits,
        fractional_digits,
    })
}

/// Decode an `NVC` (length-prefixed UTF-16LE) field: a `u16` character count
/// followed by exactly that many UTF-16 code units.
pub fn decode_nvc(bytes: &[u8]) -> Result<String> {
    let n = read_u16(bytes)? as usize;
    if n == 0 {
        return Ok(String::new());
    }
    let needed = 2 + n * 2;
    if bytes.len() < needed {
        return Err(BizdbError::Corrupt(format!(
            "NVC declares {} chars but only {} bytes available",
            n,
            bytes.len()
        )));
    }
    decode_utf16le(&bytes[2..needed])
}

/// Decode a `DT` field: 7 bytes of packed BCD `YYYYMMDDhhmmss`.
///
/// A year of `0000` means the value is absent and decodes to `None`.
pub fn decode_dt(bytes: &[u8]) -> Result<Option<NaiveDateTime>> {
    if bytes.len() != 7 {
        return Err(BizdbError::Corrupt(format!(
            "DT field must be 7 bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] == 0 && bytes[1] == 0 {
        return Ok(None);
    }
    let mut digits = String::with_capacity(14);
    for b in bytes {
        digits.push_str(&format!("{:02X}", b));
    }
    let year: i32 = digits[0..4]
        .parse()
        .map_err(|_| BizdbError::Corrupt(format!("bad DT year digits {:?}", &digits[0..4])))?;
    let month: u32 = digits[4..6]
        .parse()
        .map_err(|_| BizdbError::Corrupt("bad DT month digits".into()))?;
    let day: u32 = digits[6..8]
        .parse()
        .map_err(|_| BizdbError::Corrupt("bad DT day digits".into()))?;
    let hour: u32 = digits[8..10]
        .parse()
        .map_err(|_| BizdbError::Corrupt("bad DT hour digits".into()))?;
    let minute: u32 = digits[10..12]
        .parse()
        .map_err(|_| BizdbError::Corrupt("bad DT minute digits".into()))?;
    let second: u32 = digits[12..14]
        .parse()
        .map_err(|_| BizdbError::Corrupt("bad DT second digits".into()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(Some)
        .ok_or_else(|| BizdbError::Corrupt(format!("invalid DT calendar value {digits}")))
}

/// Decode an `RV` (row-version) field: four little-endian `i32`s joined with `.`.
pub fn decode_rv(bytes: &[u8]) -> Result<String> {
    if bytes.len() != 16 {
        return Err(BizdbError::Corrupt(format!(
            "RV field must be 16 bytes, got {}",
            bytes.len()
        )));
    }
    let parts: Vec<String> = (0..4)
        .map(|i| LittleEndian::read_i32(&bytes[i * 4..i * 4 + 4]).to_string())
        .collect();
    Ok(parts.join("."))
}

/// Convert a count of 100-nanosecond intervals since `epoch` to a calendar
/// date-time, using explicit calendar arithmetic rather than host-epoch math.
fn ticks_since(epoch: NaiveDate, ticks: u64) -> Result<NaiveDateTime> {
    let base = epoch
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| BizdbError::Corrupt("invalid epoch date".into()))?;
    let seconds = (ticks / 10_000_000) as i64;
    let sub_tick_ns = ((ticks % 10_000_000) * 100) as i64;
    base.checked_add_signed(Duration::seconds(seconds))
        .and_then(|dt| dt.checked_add_signed(Duration::nanoseconds(sub_tick_ns)))
        .ok_or_else(|| BizdbError::Corrupt("timestamp out of representable range".into()))
}

/// Decode a container entry timestamp: 100 ns intervals since `0001-01-01`.
pub fn decode_container_epoch(ticks: u64) -> Result<NaiveDateTime> {
    ticks_since(NaiveDate::from_ymd_opt(1, 1, 1).expect("valid constant date"), ticks)
}

/// Encode a calendar date-time back to the container's 100 ns-since-`0001-01-01`
/// tick count, the inverse of [`decode_container_epoch`].
pub fn encode_container_epoch(dt: NaiveDateTime) -> u64 {
    let base = NaiveDate::from_ymd_opt(1, 1, 1)
        .expect("valid constant date")
        .and_hms_opt(0, 0, 0)
        .expect("valid constant time");
    let delta = dt - base;
    (delta.num_microseconds().unwrap_or(0) * 10).max(0) as u64
}

/// Decode a Win32 FILETIME value: 100 ns intervals since `1601-01-01`, as used
/// by the EFD supply package's per-file timestamps.
pub fn decode_filetime(ticks: u64) -> Result<NaiveDateTime> {
    ticks_since(
        NaiveDate::from_ymd_opt(1601, 1, 1).expect("valid constant date"),
        ticks,
    )
}
