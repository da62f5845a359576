use phf::{Map, phf_map};
use std::fmt;

/// Absorber material used when no override is configured.
pub const DEFAULT_ABSORBER: &str = "G4_Pb";
/// Sensitive (scintillating) material used when no override is configured.
pub const DEFAULT_SCINTILLATOR: &str = "G4_PbWO4";

/// Bulk properties relevant for longitudinal shower development.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialProperties {
    /// Radiation length X0 in cm.
    pub radiation_length_cm: f64,
    /// Nuclear interaction length in cm.
    pub interaction_length_cm: f64,
    /// Density in g/cm^3.
    pub density_g_cm3: f64,
    /// Critical energy in MeV.
    pub critical_energy_mev: f64,
}

static MATERIALS: Map<&'static str, MaterialProperties> = phf_map! {
    "G4_Pb" => MaterialProperties { radiation_length_cm: 0.5612, interaction_length_cm: 17.59, density_g_cm3: 11.35, critical_energy_mev: 7.43 },
    "G4_Fe" => MaterialProperties { radiation_length_cm: 1.757, interaction_length_cm: 16.77, density_g_cm3: 7.874, critical_energy_mev: 21.68 },
    "G4_W" => MaterialProperties { radiation_length_cm: 0.3504, interaction_length_cm: 9.946, density_g_cm3: 19.30, critical_energy_mev: 7.97 },
    "G4_Cu" => MaterialProperties { radiation_length_cm: 1.436, interaction_length_cm: 15.32, density_g_cm3: 8.96, critical_energy_mev: 19.42 },
    "G4_Al" => MaterialProperties { radiation_length_cm: 8.897, interaction_length_cm: 39.70, density_g_cm3: 2.699, critical_energy_mev: 42.70 },
    "G4_Si" => MaterialProperties { radiation_length_cm: 9.370, interaction_length_cm: 46.52, density_g_cm3: 2.329, critical_energy_mev: 40.19 },
    "G4_lAr" => MaterialProperties { radiation_length_cm: 14.00, interaction_length_cm: 85.77, density_g_cm3: 1.396, critical_energy_mev: 32.84 },
    "G4_PbWO4" => MaterialProperties { radiation_length_cm: 0.8903, interaction_length_cm: 20.27, density_g_cm3: 8.28, critical_energy_mev: 9.64 },
    "G4_BGO" => MaterialProperties { radiation_length_cm: 1.118, interaction_length_cm: 22.78, density_g_cm3: 7.13, critical_energy_mev: 10.1 },
    "G4_POLYSTYRENE" => MaterialProperties { radiation_length_cm: 41.31, interaction_length_cm: 77.07, density_g_cm3: 1.06, critical_energy_mev: 93.11 },
};

/// Identity of a layer's material, by its simulation-engine name (e.g. `G4_Fe`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Material(String);

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Looks up the bulk properties, `None` for materials the registry does not know.
    pub fn properties(&self) -> Option<&'static MaterialProperties> {
        MATERIALS.get(self.0.as_str())
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Material {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

pub fn is_known_material(name: &str) -> bool {
    MATERIALS.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_materials_are_registered() {
        assert!(is_known_material(DEFAULT_ABSORBER));
        assert!(is_known_material(DEFAULT_SCINTILLATOR));
    }

    #[test]
    fn properties_are_looked_up_by_exact_name() {
        let lead = Material::new("G4_Pb").properties().unwrap();
        assert_eq!(lead.radiation_length_cm, 0.5612);
        assert!(Material::new("g4_pb").properties().is_none());
        assert!(Material::new("Unobtainium").properties().is_none());
    }

    #[test]
    fn display_prints_engine_name() {
        assert_eq!(Material::from("G4_POLYSTYRENE").to_string(), "G4_POLYSTYRENE");
    }
}
