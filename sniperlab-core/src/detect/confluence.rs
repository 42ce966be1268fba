//! Moving-average confluence tagging for zones.

use crate::domain::{Strength, Zone};
use crate::indicators::MaSnapshot;

#[derive(Debug, Clone, Copy)]
pub struct ConfluenceAnnotator {
    /// Relative widening of the zone before testing an average against it.
    pub epsilon: f64,
}

impl Default for ConfluenceAnnotator {
    fn default() -> Self {
        Self { epsilon: 0.001 }
    }
}

impl ConfluenceAnnotator {
    /// Copy of `zone` tagged with every average inside
    /// `[lower * (1 - eps), upper * (1 + eps)]`. One or more tags make it STRONG.
    pub fn annotate(&self, zone: &Zone, snapshot: &MaSnapshot) -> Zone {
        let lo = zone.lower() * (1.0 - self.epsilon);
        let hi = zone.upper() * (1.0 + self.epsilon);
        let confluence: Vec<String> = snapshot
            .iter()
            .filter(|&(_, value)| value >= lo && value <= hi)
            .map(|(name, _)| name.to_string())
            .collect();

        let mut out = zone.clone();
        out.strength = if confluence.is_empty() {
            Strength::Normal
        } else {
            Strength::Strong
        };
        out.confluence = confluence;
        out
    }

    pub fn annotate_all(&self, zones: &[Zone], snapshot: &MaSnapshot) -> Vec<Zone> {
        zones.iter().map(|z| self.annotate(z, snapshot)).collect()
    }
}
