//! Scalar GBn2 functional forms (nm, e, kJ/mol).
//!
//! These are the host-side counterparts of the tensor expressions evaluated by the engine and
//! serve as the reference they are tested against.

/// Dielectric offset subtracted from intrinsic radii, in nm.
pub const DIELECTRIC_OFFSET: f64 = 0.0195141;
/// Weight of the neck integral relative to the van der Waals integral.
pub const NECK_SCALE: f64 = 0.826836;
/// Extra separation beyond the sum of radii within which the neck term is active, in nm.
pub const NECK_CUTOFF: f64 = 0.68;
/// Coulomb constant, in kJ·nm/(mol·e²).
pub const COULOMB_CONSTANT: f64 = 138.935485;
/// Surface tension of the nonpolar term, in kcal/(mol·Å²).
pub const SURFACE_TENSION: f64 = 0.00542;
/// Solvent probe radius, in nm.
pub const PROBE_RADIUS: f64 = 0.14;
const KCAL_TO_KJ: f64 = 4.184;
const ANGSTROM2_PER_NM2: f64 = 100.0;

#[inline]
fn step(x: f64) -> f64 {
    if x >= 0.0 { 1.0 } else { 0.0 }
}

/// Descreening integral of atom `i` by a sphere of scaled radius `scaled_radius_j` at
/// distance `dist`.
#[inline]
pub fn gbn2_integral(dist: f64, offset_radius_i: f64, scaled_radius_j: f64) -> f64 {
    let upper = dist + scaled_radius_j;
    let lower = offset_radius_i.max((dist - scaled_radius_j).abs());
    let inv_upper = 1.0 / upper;
    let inv_lower = 1.0 / lower;
    let shell = dist - scaled_radius_j * scaled_radius_j / dist;
    let body = inv_lower - inv_upper
        + 0.25 * shell * (inv_upper * inv_upper - inv_lower * inv_lower)
        + 0.5 * (lower / upper).ln() / dist;
    step(dist + scaled_radius_j - offset_radius_i) * 0.5 * body
}

/// Neck correction for a pair with intrinsic radii `radius_i`, `radius_j` and tabulated
/// neck parameters `d0`, `m0`.
#[inline]
pub fn neck_integral(dist: f64, radius_i: f64, radius_j: f64, d0: f64, m0: f64) -> f64 {
    let x = dist - d0;
    let x2 = x * x;
    let x6 = x2 * x2 * x2;
    step(radius_i + radius_j + NECK_CUTOFF - dist) * m0 / (1.0 + 100.0 * x2 + 0.3e6 * x6)
}

/// Effective Born radius from the accumulated descreening integral.
///
/// With `integral == 0` this reduces to `offset_radius`.
#[inline]
pub fn born_radius(integral: f64, offset_radius: f64, alpha: f64, beta: f64, gamma: f64) -> f64 {
    let psi = integral * offset_radius;
    let rescaled = (alpha * psi - beta * psi * psi + gamma * psi * psi * psi).tanh();
    let radius = offset_radius + DIELECTRIC_OFFSET;
    1.0 / (1.0 / offset_radius - rescaled / radius)
}

/// Common prefactor of the GB polarization energy, `-½ k (1/ε_in − 1/ε_out)`.
#[inline]
pub fn gb_prefactor(solute_dielectric: f64, solvent_dielectric: f64) -> f64 {
    -0.5 * COULOMB_CONSTANT * (1.0 / solute_dielectric - 1.0 / solvent_dielectric)
}

#[inline]
pub fn gb_self_energy(prefactor: f64, charge: f64, born_radius: f64) -> f64 {
    prefactor * charge * charge / born_radius
}

/// Contribution of one directed pair to the target atom.
#[inline]
pub fn gb_pair_energy(
    prefactor: f64,
    dist: f64,
    charge_i: f64,
    charge_j: f64,
    born_radius_i: f64,
    born_radius_j: f64,
) -> f64 {
    let bb = born_radius_i * born_radius_j;
    let r2 = dist * dist;
    let f_gb = (r2 + bb * (-r2 / (4.0 * bb)).exp()).sqrt();
    prefactor * charge_i * charge_j / f_gb
}

/// Nonpolar surface-area energy of one atom scaled by `sa_scale`.
#[inline]
pub fn sa_energy(sa_scale: f64, offset_radius: f64) -> f64 {
    let r = offset_radius + DIELECTRIC_OFFSET + PROBE_RADIUS;
    KCAL_TO_KJ * SURFACE_TENSION * sa_scale * r * r * ANGSTROM2_PER_NM2
}
