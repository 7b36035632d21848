//! # Spectral Setting Resolver
//!
//! A [`SpectralSetting`] is the structural fingerprint of a profile: band
//! count, wavelength axis and wavelength unit. Profiles can only be stacked
//! into one dense array when they share a setting, so the resolver partitions
//! profile rows into [`ProfileGroup`]s keyed by `(field name, setting)`.
//!
//! Settings are compared exactly (bit for bit on every wavelength). Two axes
//! that differ in the last digit are different settings; resampling is the
//! caller's business.
//!
//! Settings are interned in a caller-owned [`SettingCache`], so every group
//! sharing a setting points at the same `Arc`. The cache lives as long as the
//! caller wants (typically one mapping request) and is never shared globally.

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::debug;

use crate::profile::{SpectralProfile, UnitPolicy, WavelengthUnit};

/// Band count, wavelength axis and unit shared by a group of profiles
#[derive(Debug, Clone)]
pub struct SpectralSetting {
    band_count: usize,
    wavelengths: Option<Vec<f64>>,
    wavelength_unit: WavelengthUnit,
}

impl SpectralSetting {
    /// Create a setting. Without wavelengths the unit is always
    /// [`WavelengthUnit::Unspecified`].
    pub fn new(band_count: usize, wavelengths: Option<Vec<f64>>, unit: WavelengthUnit) -> Self {
        let wavelength_unit = if wavelengths.is_some() {
            unit
        } else {
            WavelengthUnit::Unspecified
        };
        Self {
            band_count,
            wavelengths,
            wavelength_unit,
        }
    }

    /// Setting of `profile`, inferring a missing unit with `policy`
    pub fn from_profile(profile: &SpectralProfile, policy: &UnitPolicy) -> Self {
        Self::new(
            profile.band_count(),
            profile.wavelengths().map(<[f64]>::to_vec),
            profile.effective_unit(policy),
        )
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Wavelength axis, if the profiles have one
    pub fn wavelengths(&self) -> Option<&[f64]> {
        self.wavelengths.as_deref()
    }

    /// Wavelength unit
    pub fn wavelength_unit(&self) -> WavelengthUnit {
        self.wavelength_unit
    }

    /// Human readable summary, e.g. `2151 bands, 350-2500 nm`
    pub fn describe(&self) -> String {
        match self.wavelengths() {
            Some(wl) if !wl.is_empty() => {
                let first = wl[0];
                let last = wl[wl.len() - 1];
                format!(
                    "{} bands, {}-{} {}",
                    self.band_count, first, last, self.wavelength_unit
                )
            }
            _ => format!("{} bands, no wavelengths", self.band_count),
        }
    }
}

impl fmt::Display for SpectralSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl PartialEq for SpectralSetting {
    fn eq(&self, other: &Self) -> bool {
        self.band_count == other.band_count
            && self.wavelength_unit == other.wavelength_unit
            && match (&self.wavelengths, &other.wavelengths) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
                }
                _ => false,
            }
    }
}

impl Eq for SpectralSetting {}

impl Hash for SpectralSetting {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.band_count.hash(state);
        self.wavelength_unit.hash(state);
        match &self.wavelengths {
            None => 0u8.hash(state),
            Some(wl) => {
                1u8.hash(state);
                for v in wl {
                    v.to_bits().hash(state);
                }
            }
        }
    }
}

/// Interning cache for [`SpectralSetting`]s, owned by the caller
#[derive(Debug, Default)]
pub struct SettingCache {
    settings: HashSet<Arc<SpectralSetting>>,
    policy: UnitPolicy,
}

impl SettingCache {
    /// Empty cache with the default unit policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty cache inferring missing units with `policy`
    pub fn with_unit_policy(policy: UnitPolicy) -> Self {
        Self {
            settings: HashSet::new(),
            policy,
        }
    }

    /// Unit policy used for profiles without a stated unit
    pub fn unit_policy(&self) -> &UnitPolicy {
        &self.policy
    }

    /// Shared instance equal to `setting`
    pub fn intern(&mut self, setting: SpectralSetting) -> Arc<SpectralSetting> {
        if let Some(existing) = self.settings.get(&setting) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(setting);
        self.settings.insert(Arc::clone(&shared));
        shared
    }

    /// Interned setting of `profile`
    pub fn resolve(&mut self, profile: &SpectralProfile) -> Arc<SpectralSetting> {
        let setting = SpectralSetting::from_profile(profile, &self.policy);
        self.intern(setting)
    }

    /// Number of distinct settings seen
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// True if no setting has been interned yet
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Forget all interned settings
    pub fn clear(&mut self) {
        self.settings.clear();
    }
}

/// Rows of one field sharing one spectral setting
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileGroup {
    /// Field the profiles were read from
    pub field_name: String,
    /// Shared setting
    pub setting: Arc<SpectralSetting>,
    /// Row ids in input order
    pub rows: Vec<usize>,
}

impl ProfileGroup {
    /// Number of profiles in the group
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True for a group without rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partition profiles into groups of identical `(field name, setting)`.
///
/// Groups come out in order of first appearance and keep their rows in input
/// order.
pub fn group<'a, I>(profiles: I, cache: &mut SettingCache) -> Vec<ProfileGroup>
where
    I: IntoIterator<Item = (usize, &'a str, &'a SpectralProfile)>,
{
    let mut index: HashMap<(&'a str, Arc<SpectralSetting>), usize> = HashMap::new();
    let mut groups: Vec<ProfileGroup> = Vec::new();

    for (row, field_name, profile) in profiles {
        let setting = cache.resolve(profile);
        let slot = *index
            .entry((field_name, Arc::clone(&setting)))
            .or_insert_with(|| {
                groups.push(ProfileGroup {
                    field_name: field_name.to_string(),
                    setting,
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
        groups[slot].rows.push(row);
    }

    debug!(
        "Grouped profiles into {} group(s), {} distinct setting(s) cached",
        groups.len(),
        cache.len()
    );
    groups
}
