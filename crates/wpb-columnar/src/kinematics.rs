//! Four-momentum helpers for reconstructed objects.

use std::ops::Add;

use crate::ragged::{delta_phi, delta_r};

/// Anything with a (pt, eta, phi, mass) parametrisation.
pub trait Momentum {
    /// Transverse momentum.
    fn pt(&self) -> f64;
    /// Pseudorapidity.
    fn eta(&self) -> f64;
    /// Azimuthal angle.
    fn phi(&self) -> f64;
    /// Mass.
    fn mass(&self) -> f64;

    /// Cartesian four-vector.
    fn p4(&self) -> LorentzVector {
        LorentzVector::from_pt_eta_phi_m(self.pt(), self.eta(), self.phi(), self.mass())
    }

    /// Δφ to another object, wrapped to (-π, π].
    fn delta_phi_to(&self, other: &impl Momentum) -> f64 {
        delta_phi(self.phi(), other.phi())
    }

    /// ΔR to another object.
    fn delta_r_to(&self, other: &impl Momentum) -> f64 {
        delta_r(self.eta(), self.phi(), other.eta(), other.phi())
    }
}

/// Cartesian four-momentum (px, py, pz, E).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LorentzVector {
    /// x component.
    pub px: f64,
    /// y component.
    pub py: f64,
    /// z component.
    pub pz: f64,
    /// Energy.
    pub e: f64,
}

impl LorentzVector {
    /// Build from collider coordinates.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let p2 = px * px + py * py + pz * pz;
        Self { px, py, pz, e: (p2 + mass * mass).sqrt() }
    }

    /// Squared invariant mass (may be slightly negative from rounding).
    pub fn mass2(&self) -> f64 {
        self.e * self.e - self.px * self.px - self.py * self.py - self.pz * self.pz
    }
}

impl Momentum for LorentzVector {
    fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 {
            return if self.pz >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY };
        }
        (self.pz / pt).asinh()
    }

    fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 < 0.0 { -(-m2).sqrt() } else { m2.sqrt() }
    }

    fn p4(&self) -> LorentzVector {
        *self
    }
}

impl Add for LorentzVector {
    type Output = LorentzVector;

    fn add(self, rhs: LorentzVector) -> LorentzVector {
        LorentzVector {
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
            e: self.e + rhs.e,
        }
    }
}

/// Transverse mass of a visible system and missing transverse momentum.
pub fn transverse_mass(pt: f64, phi: f64, met_pt: f64, met_phi: f64) -> f64 {
    (2.0 * pt * met_pt * (1.0 - delta_phi(phi, met_phi).cos())).sqrt()
}
