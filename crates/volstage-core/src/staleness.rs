//! Rebuild planning.
//!
//! Each render call compares the current modification times of its three
//! inputs (data set, array selection, volume property) against the times
//! recorded at the last build and decides how much has to be rebuilt. The
//! evaluation is level-triggered: nothing carries over between calls except
//! the recorded [`BuildTimestamps`].

use crate::timestamp::ModTime;

/// What was last built, and when.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildTimestamps {
    /// Time of the last spatial field build.
    pub geometry: ModTime,
    /// Time of the last transfer function build.
    pub property: ModTime,
    /// Array name used by the last spatial field build.
    pub array_name: Option<String>,
    /// Vector component used by the last spatial field build (`None` for
    /// magnitude or before the first build).
    pub vector_component: Option<usize>,
}

/// Current state of the inputs, sampled once per render call.
#[derive(Debug, Clone, Copy)]
pub struct StalenessInputs<'a> {
    /// Whether a device volume already exists.
    pub has_volume: bool,
    /// Modification time of the input data set.
    pub data_time: ModTime,
    /// Name of the selected scalar array.
    pub array_name: &'a str,
    /// Selected vector component, `None` when the vector magnitude is mapped.
    pub vector_component: Option<usize>,
    /// Modification time of the volume property.
    pub property_time: ModTime,
}

/// Which condition drove a [`RebuildPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildScope {
    /// No device volume yet: create it and build everything.
    FirstBuild,
    /// Data set, array name or vector component changed.
    Geometry,
    /// Only the volume property changed.
    PropertyOnly,
    /// Nothing changed; reuse the device resources.
    Unchanged,
}

/// The work one render call has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildPlan {
    pub scope: RebuildScope,
    /// Rebuild and re-upload the spatial field.
    pub rebuild_field: bool,
    /// Rebuild and re-upload the color/opacity tables.
    pub rebuild_transfer_function: bool,
    /// The device volume is created by this call.
    pub is_new_volume: bool,
}

impl RebuildPlan {
    fn for_scope(scope: RebuildScope) -> Self {
        let (rebuild_field, rebuild_transfer_function) = match scope {
            RebuildScope::FirstBuild | RebuildScope::Geometry => (true, true),
            RebuildScope::PropertyOnly => (false, true),
            RebuildScope::Unchanged => (false, false),
        };
        Self {
            scope,
            rebuild_field,
            rebuild_transfer_function,
            is_new_volume: scope == RebuildScope::FirstBuild,
        }
    }

    /// Returns whether the call can reuse everything as-is.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.rebuild_field && !self.rebuild_transfer_function
    }
}

/// Tracks build times and turns input times into a [`RebuildPlan`].
#[derive(Debug, Clone, Default)]
pub struct StalenessTracker {
    timestamps: BuildTimestamps,
}

impl StalenessTracker {
    /// Creates a tracker that has never built anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker from previously recorded build times.
    pub fn with_timestamps(timestamps: BuildTimestamps) -> Self {
        Self { timestamps }
    }

    /// Returns the recorded build times.
    pub fn timestamps(&self) -> &BuildTimestamps {
        &self.timestamps
    }

    /// Decides what the current render call has to rebuild.
    #[must_use]
    pub fn evaluate(&self, inputs: &StalenessInputs<'_>) -> RebuildPlan {
        let scope = if !inputs.has_volume {
            RebuildScope::FirstBuild
        } else if self.geometry_changed(inputs) {
            RebuildScope::Geometry
        } else if inputs.property_time > self.timestamps.property {
            RebuildScope::PropertyOnly
        } else {
            RebuildScope::Unchanged
        };

        log::trace!("rebuild scope: {scope:?}");
        RebuildPlan::for_scope(scope)
    }

    fn geometry_changed(&self, inputs: &StalenessInputs<'_>) -> bool {
        inputs.data_time > self.timestamps.geometry
            || self.timestamps.array_name.as_deref() != Some(inputs.array_name)
            || self.timestamps.vector_component != inputs.vector_component
    }

    /// Records a finished spatial field build.
    pub fn record_field_build(&mut self, array_name: &str, vector_component: Option<usize>) {
        self.timestamps.geometry = ModTime::now();
        self.timestamps.array_name = Some(array_name.to_string());
        self.timestamps.vector_component = vector_component;
    }

    /// Records a finished transfer function build.
    pub fn record_transfer_function_build(&mut self) {
        self.timestamps.property = ModTime::now();
    }

    /// Forgets every build, e.g. after the device resources were released.
    pub fn reset(&mut self) {
        self.timestamps = BuildTimestamps::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn built(geometry: u64, property: u64) -> StalenessTracker {
        StalenessTracker::with_timestamps(BuildTimestamps {
            geometry: ModTime::from_raw(geometry),
            property: ModTime::from_raw(property),
            array_name: Some("temp".to_string()),
            vector_component: Some(0),
        })
    }

    fn inputs(data: u64, property: u64) -> StalenessInputs<'static> {
        StalenessInputs {
            has_volume: true,
            data_time: ModTime::from_raw(data),
            array_name: "temp",
            vector_component: Some(0),
            property_time: ModTime::from_raw(property),
        }
    }

    #[test]
    fn test_first_build_rebuilds_everything() {
        let tracker = StalenessTracker::new();
        let plan = tracker.evaluate(&StalenessInputs {
            has_volume: false,
            ..inputs(1, 1)
        });
        assert_eq!(plan.scope, RebuildScope::FirstBuild);
        assert!(plan.rebuild_field);
        assert!(plan.rebuild_transfer_function);
        assert!(plan.is_new_volume);
    }

    #[test]
    fn test_property_only_change() {
        let plan = built(10, 10).evaluate(&inputs(5, 11));
        assert_eq!(plan.scope, RebuildScope::PropertyOnly);
        assert!(!plan.rebuild_field);
        assert!(plan.rebuild_transfer_function);
        assert!(!plan.is_new_volume);
    }

    #[test]
    fn test_data_change_rebuilds_both() {
        let plan = built(10, 10).evaluate(&inputs(12, 5));
        assert_eq!(plan.scope, RebuildScope::Geometry);
        assert!(plan.rebuild_field);
        assert!(plan.rebuild_transfer_function);
    }

    #[test]
    fn test_array_name_change_rebuilds_both() {
        let plan = built(10, 10).evaluate(&StalenessInputs {
            array_name: "pressure",
            ..inputs(5, 5)
        });
        assert_eq!(plan.scope, RebuildScope::Geometry);
        assert!(plan.rebuild_transfer_function);
    }

    #[test]
    fn test_vector_component_change_rebuilds_both() {
        let plan = built(10, 10).evaluate(&StalenessInputs {
            vector_component: Some(2),
            ..inputs(5, 5)
        });
        assert_eq!(plan.scope, RebuildScope::Geometry);
    }

    #[test]
    fn test_switch_to_magnitude_rebuilds_both() {
        let plan = built(10, 10).evaluate(&StalenessInputs {
            vector_component: None,
            ..inputs(5, 5)
        });
        assert_eq!(plan.scope, RebuildScope::Geometry);
        assert!(plan.rebuild_field);
    }

    #[test]
    fn test_unchanged_is_noop() {
        let plan = built(10, 10).evaluate(&inputs(10, 10));
        assert_eq!(plan.scope, RebuildScope::Unchanged);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_record_builds() {
        let mut tracker = StalenessTracker::new();
        tracker.record_field_build("temp", Some(1));
        tracker.record_transfer_function_build();
        let ts = tracker.timestamps();
        assert!(ts.geometry.is_set());
        assert!(ts.property > ts.geometry);
        assert_eq!(ts.array_name.as_deref(), Some("temp"));
        assert_eq!(ts.vector_component, Some(1));

        tracker.reset();
        assert_eq!(tracker.timestamps(), &BuildTimestamps::default());
    }

    proptest! {
        #[test]
        fn field_rebuild_implies_transfer_function_rebuild(
            geometry in 0u64..100,
            property in 0u64..100,
            data in 0u64..100,
            prop_time in 0u64..100,
            has_volume in any::<bool>(),
            component in 0usize..3,
        ) {
            let plan = built(geometry, property).evaluate(&StalenessInputs {
                has_volume,
                vector_component: Some(component),
                ..inputs(data, prop_time)
            });
            if plan.rebuild_field {
                prop_assert!(plan.rebuild_transfer_function);
            }
            prop_assert_eq!(plan.is_new_volume, !has_volume);
        }
    }
}
