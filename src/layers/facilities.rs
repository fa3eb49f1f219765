use crate::{
    core::config::MapConfig,
    data::facility::Facility,
    traits::{FeatureId, MapId, MapProvider, MarkerIcon, MarkerOptions},
    ui::popup::facility_popup,
};

/// Features currently drawn for a facility snapshot, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    features: Vec<(String, FeatureId)>,
    skipped: usize,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Records that could not be drawn in the last render
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The marker drawn for a facility id, the first one if it repeats
    pub fn feature_for(&self, facility_id: &str) -> Option<FeatureId> {
        self.features
            .iter()
            .find(|(id, _)| id == facility_id)
            .map(|(_, feature)| *feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureId)> {
        self.features.iter().map(|(id, feature)| (id.as_str(), *feature))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.features.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// Projects facility snapshots onto the map as clickable markers.
///
/// Rendering is wholesale: every call removes what the previous call drew,
/// so the map always shows exactly the latest snapshot.
#[derive(Debug, Default)]
pub struct FacilityRenderer {
    rendered: FeatureSet,
}

impl FacilityRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn features(&self) -> &FeatureSet {
        &self.rendered
    }

    pub fn render(
        &mut self,
        provider: &mut dyn MapProvider,
        map: MapId,
        facilities: &[Facility],
        config: &MapConfig,
    ) -> &FeatureSet {
        self.clear(provider);

        let mut next = FeatureSet::default();

        for facility in facilities {
            if let Err(e) = facility.validate() {
                log::warn!("Not rendering facility: {}", e);
                next.skipped += 1;
                continue;
            }

            let name = facility.display_name(&config.labels.unnamed_facility);
            let popup = facility_popup(facility, &config.labels, config.detail_href(&facility.id));
            let options = MarkerOptions::new(facility.location)
                .with_icon(MarkerIcon::Facility)
                .with_tooltip(name)
                .with_popup(popup);

            match provider.create_marker(map, options) {
                Ok(feature) => next.features.push((facility.id.clone(), feature)),
                Err(e) => {
                    log::error!("{} failed to draw facility {}: {}", provider.name(), facility.id, e);
                    next.skipped += 1;
                }
            }
        }

        log::debug!(
            "Rendered {} facilities ({} skipped)",
            next.len(),
            next.skipped
        );
        self.rendered = next;
        &self.rendered
    }

    /// Removes every rendered feature and its popup binding
    pub fn clear(&mut self, provider: &mut dyn MapProvider) {
        let previous = std::mem::take(&mut self.rendered);
        if !previous.is_empty() {
            log::debug!("Removing {} facility markers", previous.len());
        }
        for (_, feature) in previous.features {
            provider.remove_feature(feature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::geo::LatLng, providers::headless::HeadlessProvider};

    #[test]
    fn test_provider_failures_are_skipped() {
        let mut provider = HeadlessProvider::new();
        let mut renderer = FacilityRenderer::new();
        let facilities = [Facility::new("a", None, LatLng::new(59.9, 10.7))];

        // no map was ever created for this handle
        let features = renderer.render(&mut provider, MapId(99), &facilities, &MapConfig::default());
        assert!(features.is_empty());
        assert_eq!(features.skipped(), 1);
    }

    #[test]
    fn test_empty_feature_set() {
        let set = FeatureSet::default();
        assert!(set.is_empty());
        assert_eq!(set.feature_for("a"), None);
        assert!(set.ids().is_empty());
    }
}
