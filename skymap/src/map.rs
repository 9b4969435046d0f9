//! Memory-mapped HEALPix sky map
//!
//! The whole FITS file is mapped read-only and private, so once a map is
//! loaded it can be shared between threads for lookups. Loading and
//! unloading need `&mut self`.

use std::ffi::c_void;
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::Path;
use std::ptr::NonNull;

use nix::sys::mman::{madvise, mmap, munmap, MapFlags, MmapAdvise, ProtFlags};

use crate::fits::{self, HealpixLayout};
use crate::healpix;
use crate::{SkyMapError, SkyMapResult};

/// Pixel values are stored in millikelvin
const PIXEL_SCALE: f64 = 1000.0;

/// A read-only private mapping of a whole file
///
/// The mapping is released before the descriptor is closed: `Drop` unmaps,
/// then the `File` field is dropped.
struct MappedFile {
    ptr: NonNull<c_void>,
    len: usize,
    _file: File,
}

// The mapping is PROT_READ + MAP_PRIVATE and never written through.
unsafe impl Send for MappedFile {}
unsafe impl Sync for MappedFile {}

impl MappedFile {
    fn open(path: &Path) -> SkyMapResult<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let len = usize::try_from(size).map_err(|_| SkyMapError::TooLarge(size))?;
        let length = NonZeroUsize::new(len).ok_or(SkyMapError::EmptyFile)?;

        let ptr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ,
                MapFlags::MAP_PRIVATE,
                &file,
                0,
            )?
        };

        // Lookups hop around the pixel array, readahead only wastes pages
        if let Err(e) = unsafe { madvise(ptr, len, MmapAdvise::MADV_RANDOM) } {
            tracing::debug!("madvise(MADV_RANDOM) failed: {}", e);
        }

        Ok(Self { ptr, len, _file: file })
    }

    fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const u8, self.len) }
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        if let Err(e) = unsafe { munmap(self.ptr, self.len) } {
            tracing::warn!("munmap failed: {}", e);
        }
    }
}

struct LoadedMap {
    mapping: MappedFile,
    layout: HealpixLayout,
}

/// HEALPix NESTED sky-temperature map backed by a memory-mapped FITS file
#[derive(Default)]
pub struct SkyMap {
    loaded: Option<LoadedMap>,
}

impl std::fmt::Debug for SkyMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkyMap")
            .field("layout", &self.loaded.as_ref().map(|m| m.layout))
            .finish()
    }
}

impl SkyMap {
    /// Create an empty, unloaded map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map and load `path` into it
    pub fn open(path: impl AsRef<Path>) -> SkyMapResult<Self> {
        let mut map = Self::new();
        map.load_fits(path)?;
        Ok(map)
    }

    /// Map a FITS file and locate its HEALPix table
    ///
    /// Any previously loaded file is released first. On error the map is
    /// left unloaded.
    pub fn load_fits(&mut self, path: impl AsRef<Path>) -> SkyMapResult<()> {
        self.unload();

        let path = path.as_ref();
        let mapping = MappedFile::open(path)?;
        let layout = fits::scan_bintable(mapping.bytes())?;

        tracing::info!(
            "Loaded sky map {} (NSIDE={}, {} pixels, data at byte {})",
            path.display(),
            layout.nside,
            layout.npix,
            layout.data_offset
        );

        self.loaded = Some(LoadedMap { mapping, layout });
        Ok(())
    }

    /// Release the mapping and close the file. Safe to call repeatedly.
    pub fn unload(&mut self) {
        if self.loaded.take().is_some() {
            tracing::debug!("Sky map unloaded");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn nside(&self) -> Option<i64> {
        self.loaded.as_ref().map(|m| m.layout.nside)
    }

    pub fn npix(&self) -> Option<i64> {
        self.loaded.as_ref().map(|m| m.layout.npix)
    }

    pub fn data_offset(&self) -> Option<usize> {
        self.loaded.as_ref().map(|m| m.layout.data_offset)
    }

    /// Sky brightness temperature in Kelvin at equatorial coordinates
    ///
    /// Returns 0 when no map is loaded, when the direction does not resolve
    /// to a pixel in `[0, npix)`, or when the pixel lies past the end of
    /// the file.
    pub fn temperature(&self, ra_deg: f64, dec_deg: f64) -> f64 {
        let Some(map) = &self.loaded else {
            return 0.0;
        };

        let theta = (90.0 - dec_deg).to_radians();
        let phi = ra_deg.to_radians();

        let pix = match healpix::ang2pix_nest(map.layout.nside, theta, phi) {
            Some(p) if (0..map.layout.npix).contains(&p) => p as usize,
            _ => return 0.0,
        };

        let start = map.layout.data_offset + 2 * pix;
        match map.mapping.bytes().get(start..start + 2) {
            Some(raw) => i16::from_be_bytes([raw[0], raw[1]]) as f64 / PIXEL_SCALE,
            None => 0.0,
        }
    }
}
