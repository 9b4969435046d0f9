//! FITS header scanning for HEALPix binary tables
//!
//! FITS format:
//! - 2880-byte blocks
//! - Header with 80-character keyword records
//! - Data in big-endian format
//!
//! Only the read path needed by the sky map is implemented: find the
//! `BINTABLE` extension, pick up its `NSIDE` keyword and locate the first
//! byte of the pixel payload after the `END` card.

use crate::{SkyMapError, SkyMapResult};

/// Size of one FITS header/data block in bytes
pub const BLOCK_SIZE: usize = 2880;

/// Size of one header keyword record in bytes
pub const CARD_SIZE: usize = 80;

const BINTABLE_MARKER: &[u8] = b"XTENSION= 'BINTABLE'";

/// Where the HEALPix pixels live inside a FITS file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealpixLayout {
    /// HEALPix resolution parameter
    pub nside: i64,
    /// Total pixel count, `12 * nside^2`
    pub npix: i64,
    /// Byte offset of the first pixel value
    pub data_offset: usize,
}

/// One 80-byte header record
///
/// Columns 1-8 hold the keyword. A value follows only when columns 9-10
/// read `= `; anything after a `/` in the value field is a comment.
#[derive(Debug, Clone, Copy)]
pub struct HeaderCard<'a>(&'a [u8]);

impl<'a> HeaderCard<'a> {
    pub fn new(record: &'a [u8]) -> Self {
        Self(record)
    }

    pub fn keyword(&self) -> &'a str {
        let record: &'a [u8] = self.0;
        let end = record.len().min(8);
        std::str::from_utf8(&record[..end]).unwrap_or("").trim_end()
    }

    /// Raw value field with the surrounding blanks removed
    pub fn value(&self) -> Option<&'a str> {
        let record: &'a [u8] = self.0;
        match record.get(8..10) {
            Some(b"= ") => std::str::from_utf8(&record[10..]).ok().map(str::trim),
            _ => None,
        }
    }

    /// Value as an integer
    ///
    /// Writers sometimes store integral keywords in real notation
    /// (`64.0`, `6.4D1`); those are accepted when they have no fractional
    /// part.
    pub fn integer(&self) -> Option<i64> {
        let field = self.value()?;
        let number = field.split('/').next().unwrap_or("").trim();
        if let Ok(n) = number.parse::<i64>() {
            return Some(n);
        }
        let real: f64 = number.replace(['D', 'd'], "E").parse().ok()?;
        (real.is_finite() && real.fract() == 0.0 && real.abs() < i64::MAX as f64)
            .then_some(real as i64)
    }
}

/// Scan header blocks for a HEALPix binary table
///
/// Walks the file block by block. A block that starts with
/// `XTENSION= 'BINTABLE'` opens an extension header; its cards are searched
/// for `NSIDE` until the `END` card, and the block after the one holding
/// `END` is where the pixel data starts. An extension without a usable
/// `NSIDE` is skipped and the scan continues.
pub fn scan_bintable(bytes: &[u8]) -> SkyMapResult<HealpixLayout> {
    let mut offset = 0usize;
    let mut in_bintable = false;
    let mut saw_bintable = false;
    let mut nside: Option<i64> = None;

    while offset + BLOCK_SIZE <= bytes.len() {
        let block = &bytes[offset..offset + BLOCK_SIZE];

        if !in_bintable && block.starts_with(BINTABLE_MARKER) {
            in_bintable = true;
            saw_bintable = true;
            nside = None;
        }

        if in_bintable {
            for record in block.chunks_exact(CARD_SIZE) {
                let card = HeaderCard::new(record);
                match card.keyword() {
                    "NSIDE" => nside = card.integer(),
                    "END" => {
                        let data_offset = offset + BLOCK_SIZE;
                        if let Some(n) = nside {
                            return layout_for(n, data_offset);
                        }
                        tracing::debug!("BINTABLE at offset {} has no NSIDE, skipping", offset);
                        in_bintable = false;
                        break;
                    }
                    _ => {}
                }
            }
        }

        offset += BLOCK_SIZE;
    }

    if saw_bintable {
        Err(SkyMapError::MissingNside)
    } else {
        Err(SkyMapError::MissingBintable)
    }
}

fn layout_for(nside: i64, data_offset: usize) -> SkyMapResult<HealpixLayout> {
    // NESTED indexing masks with nside - 1, so only powers of two are usable
    if nside <= 0 || nside & (nside - 1) != 0 || nside > crate::healpix::MAX_NSIDE {
        return Err(SkyMapError::InvalidNside(nside));
    }
    Ok(HealpixLayout {
        nside,
        npix: 12 * nside * nside,
        data_offset,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_card_keyword_and_value() {
        let record = int_card("NSIDE", 512);
        let nside = HeaderCard::new(&record);
        assert_eq!(nside.keyword(), "NSIDE");
        assert_eq!(nside.integer(), Some(512));

        let record = str_card("ORDERING", "NESTED");
        let ordering = HeaderCard::new(&record);
        assert_eq!(ordering.keyword(), "ORDERING");
        assert_eq!(ordering.value(), Some("'NESTED  '"));
        assert_eq!(ordering.integer(), None);

        let record = card("END");
        let end = HeaderCard::new(&record);
        assert_eq!(end.keyword(), "END");
        assert!(end.value().is_none());
    }

    #[test]
    fn test_card_integer_forms() {
        let integer = |text: &str| HeaderCard::new(&card(text)).integer();
        assert_eq!(integer("NSIDE   =                   64 / Resolution"), Some(64));
        assert_eq!(integer("NSIDE   =                 64.0"), Some(64));
        assert_eq!(integer("NSIDE   =                6.4D1"), Some(64));
        assert_eq!(integer("NSIDE   =                 64.5"), None);
        assert_eq!(integer("NSIDE   =                    T"), None);
        // Commentary cards carry no value indicator
        assert_eq!(integer("COMMENT   64"), None);
    }

    #[test]
    fn test_scan_finds_nside_and_data_offset() {
        let bytes = healpix_fits(Some(1), &[0; 12]);
        let layout = scan_bintable(&bytes).unwrap();
        assert_eq!(layout.nside, 1);
        assert_eq!(layout.npix, 12);
        // Primary header block + BINTABLE header block
        assert_eq!(layout.data_offset, 2 * BLOCK_SIZE);
    }

    #[test]
    fn test_scan_without_nside_fails() {
        let bytes = healpix_fits(None, &[0; 12]);
        assert!(matches!(scan_bintable(&bytes), Err(SkyMapError::MissingNside)));
    }

    #[test]
    fn test_scan_without_bintable_fails() {
        let bytes = primary_header();
        assert!(matches!(scan_bintable(&bytes), Err(SkyMapError::MissingBintable)));
    }

    #[test]
    fn test_scan_rejects_non_power_of_two_nside() {
        let bytes = healpix_fits(Some(3), &[0; 108]);
        assert!(matches!(scan_bintable(&bytes), Err(SkyMapError::InvalidNside(3))));
    }

    #[test]
    fn test_truncated_file_is_not_scanned() {
        let bytes = healpix_fits(Some(1), &[0; 12]);
        assert!(scan_bintable(&bytes[..BLOCK_SIZE + 100]).is_err());
    }
}
