use crate::core::materials::Material;
use std::fmt;

/// Whether a layer absorbs the shower or samples it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    /// Passive absorber, deposits are not read out.
    Absorber,
    /// Sensitive (scintillating) layer whose deposits are recorded as hits.
    Sensitive,
}

impl LayerRole {
    #[inline]
    pub fn is_sensitive(self) -> bool {
        matches!(self, Self::Sensitive)
    }
}

/// One physical slab of the calorimeter.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Thickness along the beam axis in cm.
    pub thickness: f64,
    pub material: Material,
    pub role: LayerRole,
    /// Number of read-out segments along the depth of the layer.
    pub segmentation: u32,
}

impl Layer {
    pub fn new(thickness: f64, material: Material, role: LayerRole) -> Self {
        Self {
            thickness,
            material,
            role,
            segmentation: 1,
        }
    }

    pub fn absorber(thickness: f64, material: impl Into<Material>) -> Self {
        Self::new(thickness, material.into(), LayerRole::Absorber)
    }

    pub fn sensitive(thickness: f64, material: impl Into<Material>) -> Self {
        Self::new(thickness, material.into(), LayerRole::Sensitive)
    }

    pub fn with_segmentation(mut self, segmentation: u32) -> Self {
        self.segmentation = segmentation;
        self
    }
}

/// The full ordered layer stack, front face first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    layers: Vec<Layer>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn total_thickness(&self) -> f64 {
        self.layers.iter().map(|l| l.thickness).sum()
    }

    pub fn absorber_count(&self) -> usize {
        self.layers.iter().filter(|l| !l.role.is_sensitive()).count()
    }

    pub fn sensitive_count(&self) -> usize {
        self.layers.iter().filter(|l| l.role.is_sensitive()).count()
    }
}

impl From<Vec<Layer>> for Geometry {
    fn from(layers: Vec<Layer>) -> Self {
        Self { layers }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, layer) in self.layers.iter().enumerate() {
            let role = match layer.role {
                LayerRole::Absorber => "absorber",
                LayerRole::Sensitive => "sensitive",
            };
            writeln!(
                f,
                "{:>3}  {:<9} {:<16} {:>10.3} cm  x{}",
                i, role, layer.material, layer.thickness, layer.segmentation
            )?;
        }
        write!(
            f,
            "     {} layers, total thickness {:.3} cm",
            self.len(),
            self.total_thickness()
        )
    }
}
