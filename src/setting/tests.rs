use super::*;
use crate::profile::SpectralProfileBuilder;
use proptest::prelude::*;

fn profile(bands: usize) -> SpectralProfile {
    SpectralProfileBuilder::new(vec![0.5; bands]).build().unwrap()
}

fn profile_on(wavelengths: &[f64]) -> SpectralProfile {
    SpectralProfileBuilder::new(vec![0.5; wavelengths.len()])
        .wavelengths(wavelengths.to_vec())
        .build()
        .unwrap()
}

#[test]
fn test_types_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SettingCache>();
    assert_send_sync::<SpectralSetting>();
    assert_send_sync::<ProfileGroup>();
    assert_send_sync::<crate::mapper::FieldBinding>();
    assert_send_sync::<crate::mapper::RasterArray>();
}

#[test]
fn test_groups_by_band_count() {
    let profiles: Vec<SpectralProfile> = [50, 50, 30, 30].iter().map(|n| profile(*n)).collect();
    let mut cache = SettingCache::new();

    let groups = group(
        profiles.iter().enumerate().map(|(i, p)| (i + 1, "A", p)),
        &mut cache,
    );

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].rows, vec![1, 2]);
    assert_eq!(groups[0].setting.band_count(), 50);
    assert_eq!(groups[1].rows, vec![3, 4]);
    assert_eq!(groups[1].setting.band_count(), 30);
    assert!(groups.iter().all(|g| g.field_name == "A"));
}

#[test]
fn test_first_appearance_order_and_stable_rows() {
    let profiles = [profile(3), profile(5), profile(3), profile(5), profile(3)];
    let mut cache = SettingCache::new();
    let groups = group(
        profiles.iter().enumerate().map(|(i, p)| (i, "f", p)),
        &mut cache,
    );
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].setting.band_count(), 3);
    assert_eq!(groups[0].rows, vec![0, 2, 4]);
    assert_eq!(groups[1].rows, vec![1, 3]);
}

#[test]
fn test_fields_never_share_groups() {
    let p = profile(4);
    let mut cache = SettingCache::new();
    let groups = group(vec![(0, "a", &p), (0, "b", &p), (1, "a", &p)], &mut cache);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].field_name, "a");
    assert_eq!(groups[0].rows, vec![0, 1]);
    assert_eq!(groups[1].field_name, "b");
    assert!(Arc::ptr_eq(&groups[0].setting, &groups[1].setting));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_wavelengths_compared_exactly() {
    let a = profile_on(&[400.0, 500.0, 600.0]);
    let b = profile_on(&[400.0, 500.0, 600.000_000_001]);
    let c = profile(3);
    let mut cache = SettingCache::new();
    let groups = group(vec![(0, "f", &a), (1, "f", &b), (2, "f", &c)], &mut cache);
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[2].setting.wavelengths(), None);
    assert_eq!(groups[2].setting.wavelength_unit(), WavelengthUnit::Unspecified);
}

#[test]
fn test_inferred_unit_matches_explicit_unit() {
    let inferred = SpectralProfileBuilder::new(vec![1.0, 2.0])
        .wavelengths(vec![0.45, 0.5])
        .wavelength_unit(WavelengthUnit::Unspecified)
        .build()
        .unwrap();
    let explicit = SpectralProfileBuilder::new(vec![3.0, 4.0])
        .wavelengths(vec![0.45, 0.5])
        .wavelength_unit(WavelengthUnit::Micrometers)
        .build()
        .unwrap();
    let nanometers = SpectralProfileBuilder::new(vec![3.0, 4.0])
        .wavelengths(vec![0.45, 0.5])
        .wavelength_unit(WavelengthUnit::Nanometers)
        .build()
        .unwrap();

    let mut cache = SettingCache::new();
    let groups = group(
        vec![(0, "f", &inferred), (1, "f", &explicit), (2, "f", &nanometers)],
        &mut cache,
    );
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].rows, vec![0, 1]);
    assert_eq!(groups[0].setting.wavelength_unit(), WavelengthUnit::Micrometers);
}

#[test]
fn test_cache_policy_changes_inference() {
    let p = SpectralProfileBuilder::new(vec![1.0, 2.0])
        .wavelengths(vec![350.0, 900.0])
        .wavelength_unit(WavelengthUnit::Unspecified)
        .build()
        .unwrap();
    let mut cache = SettingCache::with_unit_policy(UnitPolicy::new(1000.0));
    assert_eq!(cache.resolve(&p).wavelength_unit(), WavelengthUnit::Micrometers);
}

#[test]
fn test_intern_shares_instances() {
    let mut cache = SettingCache::new();
    let a = cache.intern(SpectralSetting::new(3, Some(vec![1.0, 2.0, 3.0]), WavelengthUnit::Micrometers));
    let b = cache.intern(SpectralSetting::new(3, Some(vec![1.0, 2.0, 3.0]), WavelengthUnit::Micrometers));
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_setting_without_wavelengths_drops_unit() {
    let s = SpectralSetting::new(10, None, WavelengthUnit::Nanometers);
    assert_eq!(s.wavelength_unit(), WavelengthUnit::Unspecified);
    assert_eq!(s.describe(), "10 bands, no wavelengths");

    let s = SpectralSetting::new(2, Some(vec![350.0, 2500.0]), WavelengthUnit::Nanometers);
    assert_eq!(s.to_string(), "2 bands, 350-2500 nm");
}

#[test]
fn test_empty_input() {
    let mut cache = SettingCache::new();
    let groups = group(Vec::<(usize, &str, &SpectralProfile)>::new(), &mut cache);
    assert!(groups.is_empty());
}

proptest! {
    /// Two rows share a group exactly when their settings are equal
    #[test]
    fn test_grouping_matches_setting_equality(
        shapes in prop::collection::vec((1usize..4, any::<bool>(), 0u8..3), 1..40),
    ) {
        let profiles: Vec<SpectralProfile> = shapes
            .iter()
            .map(|(bands, with_axis, unit)| {
                let mut builder = SpectralProfileBuilder::new(vec![1.0; *bands]);
                if *with_axis {
                    let unit = match unit {
                        0 => WavelengthUnit::Nanometers,
                        1 => WavelengthUnit::Micrometers,
                        _ => WavelengthUnit::Unspecified,
                    };
                    builder = builder
                        .wavelengths((0..*bands).map(|i| 400.0 + i as f64).collect())
                        .wavelength_unit(unit);
                }
                builder.build().unwrap()
            })
            .collect();

        let mut cache = SettingCache::new();
        let groups = group(profiles.iter().enumerate().map(|(i, p)| (i, "f", p)), &mut cache);

        let total: usize = groups.iter().map(ProfileGroup::len).sum();
        prop_assert_eq!(total, profiles.len());

        let mut group_of = vec![usize::MAX; profiles.len()];
        for (g, grp) in groups.iter().enumerate() {
            for row in &grp.rows {
                group_of[*row] = g;
            }
        }
        let policy = UnitPolicy::default();
        for i in 0..profiles.len() {
            for j in 0..profiles.len() {
                let same_setting = SpectralSetting::from_profile(&profiles[i], &policy)
                    == SpectralSetting::from_profile(&profiles[j], &policy);
                prop_assert_eq!(group_of[i] == group_of[j], same_setting);
            }
        }
    }
}
