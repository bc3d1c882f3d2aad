use crate::error::{Result, SolverError};

/// Nuclear (or muon) properties of a single species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Isotope {
    pub label: &'static str,
    /// Twice the spin quantum number
    pub spin_halves: u32,
    /// Gyromagnetic ratio, in rad s^-1 T^-1
    pub gamma: f64,
    /// Electric quadrupole moment, in m^2
    pub quadrupole_moment: f64,
}

const fn isotope(
    label: &'static str,
    spin_halves: u32,
    gamma: f64,
    quadrupole_moment: f64,
) -> Isotope {
    Isotope {
        label,
        spin_halves,
        gamma,
        quadrupole_moment,
    }
}

pub(crate) static ISOTOPES: [Isotope; 13] = [
    isotope("mu", 1, 8.516_155e8, 0.0),
    isotope("1H", 1, 2.675_221_874_4e8, 0.0),
    isotope("2H", 2, 4.106_627_9e7, 0.286e-30),
    isotope("7Li", 3, 1.039_770_8e8, -4.01e-30),
    isotope("14N", 2, 1.933_779_2e7, 2.044e-30),
    isotope("19F", 1, 2.518_148e8, 0.0),
    isotope("23Na", 3, 7.080_849_3e7, 1.04e-29),
    isotope("27Al", 5, 6.976_271_5e7, 1.466e-29),
    isotope("31P", 1, 1.083_94e8, 0.0),
    isotope("51V", 7, 7.045_511_7e7, -5.2e-30),
    isotope("63Cu", 3, 7.111_789e7, -2.11e-29),
    isotope("65Cu", 3, 7.604_35e7, -1.95e-29),
    isotope("93Nb", 9, 6.567_4e7, -3.2e-29),
];

/// Every species known to [`lookup`].
#[must_use]
pub fn isotopes() -> &'static [Isotope] {
    &ISOTOPES
}

/// Find a species by label, e.g. `"63Cu"` or `"mu"`.
///
/// # Errors
///
/// Fails with `UnknownIsotope` if the label is not in the table.
pub fn lookup(label: &str) -> Result<&'static Isotope> {
    let label = label.trim();
    ISOTOPES
        .iter()
        .find(|i| i.label == label || (label == "mu+" && i.label == "mu"))
        .ok_or_else(|| SolverError::UnknownIsotope(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known() {
        let cu = lookup("63Cu").unwrap();
        assert_eq!(cu.spin_halves, 3);
        assert!(cu.quadrupole_moment < 0.0);

        let mu = lookup("mu+").unwrap();
        assert_eq!(mu.label, "mu");
        assert_eq!(mu.spin_halves, 1);
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(matches!(lookup("Xx"), Err(SolverError::UnknownIsotope(_))));
    }

    #[test]
    fn test_spin_half_has_no_quadrupole() {
        for isotope in isotopes().iter().filter(|i| i.spin_halves < 2) {
            assert_eq!(isotope.quadrupole_moment, 0.0, "{}", isotope.label);
        }
    }
}
