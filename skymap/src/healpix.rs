//! HEALPix NESTED pixel indexing
//!
//! Angles follow the HEALPix convention: `theta` is colatitude in radians
//! (0 at the north pole, pi at the south pole) and `phi` is longitude in
//! radians. The sphere is split into 12 base faces, each subdivided into
//! `nside * nside` pixels whose in-face coordinates are bit-interleaved.

use std::f64::consts::{FRAC_PI_2, PI};

/// Largest NSIDE whose in-face coordinates fit the 16-bit interleave
pub const MAX_NSIDE: i64 = 1 << 16;

// Ring and longitude offsets of the 12 base-face centers
const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

/// Convert a direction to its NESTED pixel index
///
/// Returns `None` when `theta` lies outside `[0, pi]` or `phi` is not
/// finite. Any finite `phi` is reduced modulo 2pi. `nside` must be a power
/// of two.
pub fn ang2pix_nest(nside: i64, theta: f64, phi: f64) -> Option<i64> {
    if !(0.0..=PI).contains(&theta) || !phi.is_finite() {
        return None;
    }

    let z = theta.cos();
    let za = z.abs();

    let mut phi = phi.rem_euclid(2.0 * PI);
    // rem_euclid can round up to the modulus for tiny negative inputs
    if phi >= 2.0 * PI {
        phi = 0.0;
    }

    // in [0, 4)
    let tt = phi / FRAC_PI_2;
    let mask = nside - 1;

    let (ix, iy, face) = if za <= 2.0 / 3.0 {
        // Equatorial belt
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64; // ascending edge line index
        let jm = (temp1 + temp2) as i64; // descending edge line index

        let ifp = jp / nside;
        let ifm = jm / nside;

        let face = if ifp == ifm {
            if ifp == 4 { 4 } else { ifp + 4 }
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };

        let ix = jm & mask;
        let iy = nside - (jp & mask) - 1;
        (ix, iy, face)
    } else {
        // Polar caps
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();

        let jp = ((tp * tmp) as i64).min(nside - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(nside - 1);

        if z >= 0.0 {
            (nside - jm - 1, nside - jp - 1, ntt)
        } else {
            (jp, jm, ntt + 8)
        }
    };

    Some(xyf2nest(nside, ix, iy, face))
}

/// Pack in-face coordinates and a face number into a NESTED index
///
/// The low 16 bits of `ix` land on the even bits of the in-face index and
/// those of `iy` on the odd bits; the face contributes `face * nside^2`.
pub fn xyf2nest(nside: i64, ix: i64, iy: i64, face: i64) -> i64 {
    let mut pix = face * nside * nside;
    for i in 0..16 {
        pix |= ((ix >> i) & 1) << (2 * i);
        pix |= ((iy >> i) & 1) << (2 * i + 1);
    }
    pix
}

/// Split a NESTED index into in-face coordinates and face number
pub fn nest2xyf(nside: i64, pix: i64) -> (i64, i64, i64) {
    let npface = nside * nside;
    let face = pix / npface;
    let ipf = pix % npface;

    let mut ix = 0;
    let mut iy = 0;
    for i in 0..16 {
        ix |= ((ipf >> (2 * i)) & 1) << i;
        iy |= ((ipf >> (2 * i + 1)) & 1) << i;
    }
    (ix, iy, face)
}

/// Center of a NESTED pixel as `(theta, phi)` in radians
///
/// Returns `None` for an index outside `[0, 12 * nside^2)`.
pub fn pix2ang_nest(nside: i64, pix: i64) -> Option<(f64, f64)> {
    let npix = 12 * nside * nside;
    if !(0..npix).contains(&pix) {
        return None;
    }

    let (ix, iy, face) = nest2xyf(nside, pix);
    let nl4 = 4 * nside;
    let fact2 = 4.0 / npix as f64;
    let fact1 = (2 * nside) as f64 * fact2;

    let jr = JRLL[face as usize] * nside - ix - iy - 1;

    let (nr, z, kshift) = if jr < nside {
        let nr = jr;
        (nr, 1.0 - (nr * nr) as f64 * fact2, 0)
    } else if jr > 3 * nside {
        let nr = nl4 - jr;
        (nr, (nr * nr) as f64 * fact2 - 1.0, 0)
    } else {
        (nside, (2 * nside - jr) as f64 * fact1, (jr - nside) & 1)
    };

    let mut jp = (JPLL[face as usize] * nr + ix - iy + 1 + kshift) / 2;
    if jp > nl4 {
        jp -= nl4;
    }
    if jp < 1 {
        jp += nl4;
    }

    let phi = (jp as f64 - (kshift + 1) as f64 * 0.5) * (FRAC_PI_2 / nr as f64);
    Some((z.acos(), phi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_face_centers_nside_1() {
        let z_north = (2.0f64 / 3.0).acos();
        let z_south = (-2.0f64 / 3.0).acos();

        for face in 0..4 {
            let phi = (face as f64 + 0.5) * FRAC_PI_2;
            assert_eq!(ang2pix_nest(1, z_north, phi), Some(face));
        }
        for face in 4..8 {
            let phi = (face - 4) as f64 * FRAC_PI_2;
            assert_eq!(ang2pix_nest(1, FRAC_PI_2, phi), Some(face));
        }
        for face in 8..12 {
            let phi = ((face - 8) as f64 + 0.5) * FRAC_PI_2;
            assert_eq!(ang2pix_nest(1, z_south, phi), Some(face));
        }
    }

    #[test]
    fn test_reference_pixels_nside_2() {
        // North pole sits on the north corner of face 0
        assert_eq!(ang2pix_nest(2, 0.0, 0.0), Some(3));
        // South pole on the south corner of face 8
        assert_eq!(ang2pix_nest(2, PI, 0.0), Some(32));
        // Either side of the face 4 center on the equator
        assert_eq!(ang2pix_nest(2, FRAC_PI_2, PI / 8.0), Some(17));
        assert_eq!(ang2pix_nest(2, FRAC_PI_2, -PI / 8.0), Some(18));
    }

    #[test]
    fn test_invalid_colatitude() {
        assert_eq!(ang2pix_nest(4, -0.1, 0.0), None);
        assert_eq!(ang2pix_nest(4, PI + 0.1, 0.0), None);
        assert_eq!(ang2pix_nest(4, f64::NAN, 0.0), None);
        assert_eq!(ang2pix_nest(4, 1.0, f64::NAN), None);
        assert_eq!(ang2pix_nest(4, 1.0, f64::INFINITY), None);
        assert_eq!(ang2pix_nest(4, 1.0, f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_longitude_wraps_over_many_turns() {
        let phi = 30f64.to_radians();
        assert_eq!(ang2pix_nest(16, 1.2, phi), Some(43));
        for k in -3..=3 {
            let turned = phi + 2.0 * PI * k as f64;
            assert_eq!(ang2pix_nest(16, 1.2, turned), Some(43), "k {}", k);
        }

        for pix in 0..12 * 8 * 8 {
            let (theta, phi) = pix2ang_nest(8, pix).unwrap();
            for k in -3..=3 {
                let turned = phi + 2.0 * PI * k as f64;
                assert_eq!(ang2pix_nest(8, theta, turned), Some(pix), "pix {} k {}", pix, k);
            }
        }
    }

    #[test]
    fn test_huge_longitude_stays_in_range() {
        let nside = 64;
        for phi in [1e19, -1e19, 1e300, -7.5e15] {
            let pix = ang2pix_nest(nside, 1.0, phi).unwrap();
            assert!((0..12 * nside * nside).contains(&pix), "phi {}", phi);
        }
        // Just below zero wraps to the top of the range, not past it
        let pix = ang2pix_nest(nside, FRAC_PI_2, -1e-18).unwrap();
        assert!((0..12 * nside * nside).contains(&pix));
    }

    #[test]
    fn test_xyf2nest_interleave() {
        assert_eq!(xyf2nest(4, 0, 0, 0), 0);
        assert_eq!(xyf2nest(4, 1, 0, 0), 1);
        assert_eq!(xyf2nest(4, 0, 1, 0), 2);
        assert_eq!(xyf2nest(4, 3, 3, 0), 15);
        assert_eq!(xyf2nest(4, 2, 1, 5), 5 * 16 + 0b0110);
        assert_eq!(nest2xyf(4, 5 * 16 + 0b0110), (2, 1, 5));
    }

    #[test]
    fn test_pixel_centers_round_trip() {
        for nside in [1, 2, 4, 8, 16] {
            for pix in 0..12 * nside * nside {
                let (theta, phi) = pix2ang_nest(nside, pix).unwrap();
                assert_eq!(ang2pix_nest(nside, theta, phi), Some(pix), "nside {} pix {}", nside, pix);
            }
        }
    }

    #[test]
    fn test_random_directions_are_deterministic_and_in_range() {
        let mut rng = StdRng::seed_from_u64(408);
        let nside = 64;
        for _ in 0..2000 {
            let theta = rng.gen_range(0.0..=PI);
            let phi = rng.gen_range(-PI..3.0 * PI);
            let first = ang2pix_nest(nside, theta, phi).unwrap();
            assert!((0..12 * nside * nside).contains(&first));
            assert_eq!(ang2pix_nest(nside, theta, phi), Some(first));
        }
    }
}
