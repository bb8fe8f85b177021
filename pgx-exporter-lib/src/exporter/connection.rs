use super::{Labels, Session, Target};
use crate::mapping::{MetricMap, QueryOverrideMap};
use core::fmt::{Debug, Formatter};
use semver::Version;
use tokio::sync::RwLock;

/// Label identifying the server a sample came from.
pub const SERVER_LABEL: &str = "server";

/// The maps a connection scrapes with, and what they were built from.
#[derive(Debug, Default)]
pub struct MapState {
    /// Version the maps were built for. `None` until the first successful probe.
    pub version: Option<Version>,
    pub metric_map: MetricMap,
    pub overrides: QueryOverrideMap,

    /// Content hash of the extension document merged into the maps, if one was read.
    pub extension_hash: Option<String>,
}

/// A cached session to one target plus the maps built for it.
///
/// Scrape passes hold the map lock shared for their whole duration; rebuilds hold it
/// exclusively, so a pass never observes a partially built map.
pub struct Connection<S> {
    target: Target,
    session: S,
    labels: Labels,
    state: RwLock<MapState>,
}

impl<S: Session> Connection<S> {
    pub(crate) fn new<'a>(target: Target, session: S, constant_labels: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut labels = vec![(SERVER_LABEL.to_string(), target.fingerprint().to_string())];
        labels.extend(constant_labels.into_iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            target,
            session,
            labels,
            state: RwLock::new(MapState::default()),
        }
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Labels attached to every sample from this target: `server` followed by the constant labels.
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    #[must_use]
    pub const fn state(&self) -> &RwLock<MapState> {
        &self.state
    }
}

impl<S> Debug for Connection<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.target)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}
