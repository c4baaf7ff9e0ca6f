//! Periodic geometry and sphere digitization.
//!
//! A voxel at integer offset `(dx, dy, dz)` from a sphere center belongs to the digitized
//! sphere of radius `r` when `sqrt(dx² + dy² + dz²) - 0.5 <= r`. Offsets of every digitized
//! sphere up to [`MAX_TABLE_RADIUS`] are built lazily and cached for the life of the process.
use std::sync::OnceLock;

use glam::IVec3;

/// Largest radius (including any dispersion margin) served by the sphere tables.
pub const MAX_TABLE_RADIUS: i32 = 36;

const TABLE_LEN: usize = MAX_TABLE_RADIUS as usize + 1;

static SPHERES: [OnceLock<Box<[IVec3]>>; TABLE_LEN] = [const { OnceLock::new() }; TABLE_LEN];
static VOLUMES: OnceLock<[u64; TABLE_LEN]> = OnceLock::new();

/// Minimum-image fold of a coordinate difference onto `[-edge/2, edge/2]`.
#[inline]
pub fn periodic_offset(delta: i32, edge: i32) -> i32 {
    let d = delta.rem_euclid(edge);
    if d > edge / 2 {
        d - edge
    } else {
        d
    }
}

/// Folds any integer coordinate into `1..=edge`.
#[inline]
pub fn wrap_coord(c: i32, edge: i32) -> i32 {
    (c - 1).rem_euclid(edge) + 1
}

/// Folds every component of `p` into `1..=edge`.
#[inline]
pub fn wrap_position(p: IVec3, edge: i32) -> IVec3 {
    IVec3::new(wrap_coord(p.x, edge), wrap_coord(p.y, edge), wrap_coord(p.z, edge))
}

/// Euclidean distance between two lattice points under the minimum-image convention.
pub fn min_image_distance(a: IVec3, b: IVec3, edge: i32) -> f64 {
    let d = IVec3::new(
        periodic_offset(a.x - b.x, edge),
        periodic_offset(a.y - b.y, edge),
        periodic_offset(a.z - b.z, edge),
    );
    (d.length_squared() as f64).sqrt()
}

/// Whether `offset` lies inside the digitized sphere of `radius`.
#[inline]
pub fn in_sphere(offset: IVec3, radius: i32) -> bool {
    let dist = (offset.length_squared() as f32).sqrt();
    dist - 0.5 <= radius as f32
}

fn build_sphere(radius: i32) -> Box<[IVec3]> {
    let mut offsets = Vec::new();
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                let offset = IVec3::new(dx, dy, dz);
                if in_sphere(offset, radius) {
                    offsets.push(offset);
                }
            }
        }
    }
    offsets.into_boxed_slice()
}

/// Offsets of the digitized sphere, ordered by x, then y, then z.
///
/// # Panics
/// Panics when `radius` is negative or above [`MAX_TABLE_RADIUS`]; configurations are
/// validated against that bound before any sphere is requested.
pub fn sphere_offsets(radius: i32) -> &'static [IVec3] {
    assert!(
        (0..=MAX_TABLE_RADIUS).contains(&radius),
        "sphere radius {radius} outside 0..={MAX_TABLE_RADIUS}"
    );
    SPHERES[radius as usize].get_or_init(|| build_sphere(radius))
}

/// Number of voxels in the digitized sphere of `radius`.
pub fn sphere_volume(radius: i32) -> u64 {
    assert!(
        (0..=MAX_TABLE_RADIUS).contains(&radius),
        "sphere radius {radius} outside 0..={MAX_TABLE_RADIUS}"
    );
    volume_table()[radius as usize]
}

/// Digitized volume for every radius in `0..=MAX_TABLE_RADIUS`.
pub fn volume_table() -> &'static [u64; TABLE_LEN] {
    VOLUMES.get_or_init(|| {
        let mut table = [0u64; TABLE_LEN];
        for (r, slot) in table.iter_mut().enumerate() {
            let r = r as i32;
            let mut count = 0;
            for dx in -r..=r {
                for dy in -r..=r {
                    for dz in -r..=r {
                        if in_sphere(IVec3::new(dx, dy, dz), r) {
                            count += 1;
                        }
                    }
                }
            }
            *slot = count;
        }
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_VOLUMES: [u64; TABLE_LEN] = [
        1, 19, 81, 179, 389, 739, 1189, 1791, 2553, 3695, 4945, 6403, 8217, 10395, 12893, 15515,
        18853, 22575, 26745, 31103, 36137, 41851, 47833, 54435, 61565, 69599, 78205, 87271, 97233,
        107783, 119009, 131155, 143761, 157563, 172317, 187511, 203965,
    ];

    #[test]
    fn volume_table_matches_reference_digitization() {
        assert_eq!(volume_table(), &REFERENCE_VOLUMES);
    }

    #[test]
    fn sphere_offsets_agree_with_volume_table() {
        for r in [0, 1, 2, 5, 9] {
            assert_eq!(sphere_offsets(r).len() as u64, sphere_volume(r));
        }
    }

    #[test]
    fn sphere_offsets_are_scan_ordered() {
        let offsets = sphere_offsets(3);
        for pair in offsets.windows(2) {
            let a = (pair[0].x, pair[0].y, pair[0].z);
            let b = (pair[1].x, pair[1].y, pair[1].z);
            assert!(a < b);
        }
    }

    #[test]
    fn digitization_uses_half_voxel_tolerance() {
        assert!(in_sphere(IVec3::new(1, 1, 0), 1));
        assert!(!in_sphere(IVec3::new(1, 1, 1), 1));
        assert!(in_sphere(IVec3::new(2, 0, 0), 2));
        assert!(!in_sphere(IVec3::new(3, 0, 0), 2));
    }

    #[test]
    fn periodic_offset_folds_to_minimum_image() {
        assert_eq!(periodic_offset(0, 100), 0);
        assert_eq!(periodic_offset(49, 100), 49);
        assert_eq!(periodic_offset(50, 100), 50);
        assert_eq!(periodic_offset(51, 100), -49);
        assert_eq!(periodic_offset(-99, 100), 1);
        assert_eq!(periodic_offset(-3, 10), -3);
    }

    #[test]
    fn wrap_coord_stays_one_based() {
        assert_eq!(wrap_coord(0, 100), 100);
        assert_eq!(wrap_coord(1, 100), 1);
        assert_eq!(wrap_coord(100, 100), 100);
        assert_eq!(wrap_coord(101, 100), 1);
        assert_eq!(wrap_coord(-5, 10), 5);
    }

    #[test]
    fn min_image_distance_crosses_boundaries() {
        let a = IVec3::new(1, 1, 1);
        let b = IVec3::new(100, 1, 1);
        assert_eq!(min_image_distance(a, b, 100), 1.0);
        let c = IVec3::new(4, 5, 1);
        assert_eq!(min_image_distance(a, c, 100), 5.0);
    }
}
