//! Thread-safe map of channel profiles, parallel to the console state.

use std::sync::RwLock;

use super::profile::{ChannelProfile, Role};

/// Profiles indexed 1-based, mirroring the console's channel numbering.
/// Same lock discipline as the console state: many readers, one writer,
/// copies out.
#[derive(Default)]
pub struct ChannelMap {
    channels: RwLock<Vec<ChannelProfile>>,
}

impl ChannelMap {
    pub fn new(count: usize) -> Self {
        Self {
            channels: RwLock::new((1..=count).map(ChannelProfile::new).collect()),
        }
    }

    pub fn resize(&self, count: usize) {
        let mut channels = self.channels.write().unwrap();
        let current = channels.len();
        if count < current {
            channels.truncate(count);
        } else {
            channels.extend((current + 1..=count).map(ChannelProfile::new));
        }
    }

    pub fn count(&self) -> usize {
        self.channels.read().unwrap().len()
    }

    /// Replace the profile at its own index; out-of-range is dropped.
    pub fn update_profile(&self, profile: ChannelProfile) {
        let mut channels = self.channels.write().unwrap();
        let idx = profile.index;
        if idx >= 1 && idx <= channels.len() {
            channels[idx - 1] = profile;
        }
    }

    pub fn profile(&self, ch: usize) -> Option<ChannelProfile> {
        self.channels.read().unwrap().get(ch.wrapping_sub(1)).cloned()
    }

    /// All channels currently classified as `role`.
    pub fn by_role(&self, role: Role) -> Vec<ChannelProfile> {
        self.channels
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.role == role)
            .cloned()
            .collect()
    }

    pub fn by_group(&self, group: &str) -> Vec<ChannelProfile> {
        self.channels
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.group == group)
            .cloned()
            .collect()
    }

    /// Channels with signal that aren't muted.
    pub fn active(&self) -> Vec<ChannelProfile> {
        self.channels
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.fingerprint.has_signal && !p.muted)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<ChannelProfile> {
        self.channels.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::profile::Confidence;

    #[test]
    fn test_indexing_is_one_based() {
        let map = ChannelMap::new(4);
        assert_eq!(map.count(), 4);
        assert_eq!(map.profile(1).unwrap().index, 1);
        assert_eq!(map.profile(4).unwrap().index, 4);
        assert!(map.profile(0).is_none());
        assert!(map.profile(5).is_none());
    }

    #[test]
    fn test_update_and_query_by_role() {
        let map = ChannelMap::new(4);
        let mut p = map.profile(2).unwrap();
        p.role = Role::Kick;
        p.group = "drums".into();
        p.confidence = Confidence::High;
        map.update_profile(p);

        let kicks = map.by_role(Role::Kick);
        assert_eq!(kicks.len(), 1);
        assert_eq!(kicks[0].index, 2);
        assert_eq!(map.by_group("drums").len(), 1);
        assert!(map.by_role(Role::Snare).is_empty());
    }

    #[test]
    fn test_active_requires_signal_and_unmuted() {
        let map = ChannelMap::new(3);

        let mut p1 = map.profile(1).unwrap();
        p1.fingerprint.has_signal = true;
        map.update_profile(p1);

        let mut p2 = map.profile(2).unwrap();
        p2.fingerprint.has_signal = true;
        p2.muted = true;
        map.update_profile(p2);

        let active = map.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].index, 1);
    }

    #[test]
    fn test_resize_preserves_prefix() {
        let map = ChannelMap::new(2);
        let mut p = map.profile(1).unwrap();
        p.role = Role::Snare;
        map.update_profile(p);

        map.resize(4);
        assert_eq!(map.count(), 4);
        assert_eq!(map.profile(1).unwrap().role, Role::Snare);
        assert_eq!(map.profile(4).unwrap().index, 4);
    }
}
