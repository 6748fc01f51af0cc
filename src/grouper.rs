//! Grouping of unordered slices into volume candidates and splitting of
//! candidates with repeated positions into per-timepoint volumes.

use crate::enums::{Orientation, SplitMode};
use crate::geometry::{Vector3, almost_equal};
use crate::slice::Slice;
use crate::validator::{ValidationOptions, VolumeValidator};

use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Attributes that must be identical for slices to share a volume.
///
/// Spacings are kept as bit patterns so the key can be hashed and ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub sop_class_uid: String,
    pub protocol_name: String,
    pub image_types: Vec<String>,
    pub orientation: Orientation,
    pub columns: u32,
    pub rows: u32,
    pixel_spacing_row: u64,
    pixel_spacing_col: u64,
}

impl GroupKey {
    /// Key of `slice`, or `None` when the slice cannot take part in a volume.
    pub fn of(slice: &Slice) -> Option<Self> {
        let orientation = slice.main_orientation();
        let usable = orientation != Orientation::Undefined
            && slice.contains_plane()
            && slice.rows > 0
            && slice.columns > 0
            && slice.pixel_spacing_row > 0.0
            && slice.pixel_spacing_col > 0.0;
        usable.then(|| Self {
            sop_class_uid: slice.sop_class_uid.clone(),
            protocol_name: slice.protocol_name.clone(),
            image_types: slice.image_types.clone(),
            orientation,
            columns: slice.columns,
            rows: slice.rows,
            pixel_spacing_row: slice.pixel_spacing_row.to_bits(),
            pixel_spacing_col: slice.pixel_spacing_col.to_bits(),
        })
    }

    pub fn pixel_spacing_row(&self) -> f64 {
        f64::from_bits(self.pixel_spacing_row)
    }

    pub fn pixel_spacing_col(&self) -> f64 {
        f64::from_bits(self.pixel_spacing_col)
    }
}

/// Slices sharing a [`GroupKey`], ascending by position along the normal and
/// then by acquisition time.
#[derive(Debug, Clone)]
pub struct VolumeCandidate<'a> {
    pub key: GroupKey,
    pub slices: Vec<&'a Slice>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupingOptions {
    pub validation: ValidationOptions,
    /// Smallest per-timepoint bucket emitted when a candidate is split.
    pub min_bucket_len: usize,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            validation: ValidationOptions::default(),
            min_bucket_len: 2,
        }
    }
}

impl GroupingOptions {
    pub fn with_validation(mut self, validation: ValidationOptions) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_min_bucket_len(mut self, min_bucket_len: usize) -> Self {
        self.min_bucket_len = min_bucket_len;
        self
    }
}

/// Ascending position along the normal, then acquisition time.
pub(crate) fn stack_order(a: &Slice, b: &Slice) -> Ordering {
    a.position_along_normal()
        .total_cmp(&b.position_along_normal())
        .then_with(|| a.acquisition_date_time.cmp(&b.acquisition_date_time))
}

/// Groups slices into candidates and turns candidates into volume slice lists.
///
/// Every call recomputes its result from the given slices; the returned
/// iterators are finite and hold no state besides borrowed slices.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeGrouper {
    options: GroupingOptions,
}

impl VolumeGrouper {
    pub fn new(options: GroupingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GroupingOptions {
        &self.options
    }

    /// Valid candidates, sorted by key.
    pub fn group_candidates<'a>(&self, slices: &'a [Slice]) -> Vec<VolumeCandidate<'a>> {
        let mut groups: HashMap<GroupKey, Vec<&'a Slice>> = HashMap::new();
        for slice in slices {
            match GroupKey::of(slice) {
                Some(key) => groups.entry(key).or_default().push(slice),
                None => debug!(
                    sop_instance_uid = %slice.sop_instance_uid,
                    "slice has no usable geometry, skipped"
                ),
            }
        }

        let validator = VolumeValidator::new(self.options.validation);
        let mut candidates: Vec<VolumeCandidate<'a>> = groups
            .into_iter()
            .filter_map(|(key, mut members)| {
                members.sort_by(|a, b| stack_order(a, b));
                let result = validator.validate(&members);
                if result.valid() {
                    Some(VolumeCandidate {
                        key,
                        slices: members,
                    })
                } else {
                    debug!(
                        protocol = %key.protocol_name,
                        slices = members.len(),
                        failed = ?result.failures(),
                        "candidate rejected"
                    );
                    None
                }
            })
            .collect();
        candidates.sort_by(|a, b| a.key.cmp(&b.key));
        candidates
    }

    /// One slice list per timepoint. A candidate without repeated positions
    /// is emitted whole.
    pub fn split_into_volumes<'a>(
        &self,
        slices: &'a [Slice],
    ) -> impl Iterator<Item = Vec<&'a Slice>> + use<'a> {
        let tolerance = self.options.validation.tolerance;
        let min_bucket_len = self.options.min_bucket_len;
        self.group_candidates(slices)
            .into_iter()
            .flat_map(move |candidate| {
                let locations = Self::position_groups(&candidate.slices, tolerance);
                let slot_count = locations.iter().map(Vec::len).max().unwrap_or(0);
                if slot_count < 2 {
                    return vec![candidate.slices];
                }
                (0..slot_count)
                    .map(|slot| {
                        locations
                            .iter()
                            .filter_map(|location| location.get(slot).copied())
                            .collect::<Vec<_>>()
                    })
                    .filter(|bucket| bucket.len() >= min_bucket_len)
                    .collect()
            })
    }

    /// Whole candidates that repeat at least one position, unsplit.
    pub fn extract_4d_candidates<'a>(
        &self,
        slices: &'a [Slice],
    ) -> impl Iterator<Item = Vec<&'a Slice>> + use<'a> {
        let tolerance = self.options.validation.tolerance;
        self.group_candidates(slices)
            .into_iter()
            .filter(move |candidate| {
                Self::position_groups(&candidate.slices, tolerance)
                    .iter()
                    .any(|location| location.len() > 1)
            })
            .map(|candidate| candidate.slices)
    }

    pub fn candidates<'a>(
        &self,
        slices: &'a [Slice],
        mode: SplitMode,
    ) -> Box<dyn Iterator<Item = Vec<&'a Slice>> + 'a> {
        match mode {
            SplitMode::PerTimepoint => Box::new(self.split_into_volumes(slices)),
            SplitMode::Stacked => Box::new(self.extract_4d_candidates(slices)),
        }
    }

    /// Slices at the same 3D position, each group sorted by acquisition time.
    /// Groups keep the order in which their first member appears.
    fn position_groups<'a>(slices: &[&'a Slice], tolerance: f64) -> Vec<Vec<&'a Slice>> {
        let mut groups: Vec<(Option<Vector3>, Vec<&'a Slice>)> = Vec::new();
        for &slice in slices {
            let found = groups.iter_mut().find(|(position, _)| match (position, &slice.position) {
                (Some(a), Some(b)) => almost_equal(a, b, tolerance),
                _ => false,
            });
            match found {
                Some((_, members)) => members.push(slice),
                None => groups.push((slice.position, vec![slice])),
            }
        }
        groups
            .into_iter()
            .map(|(_, mut members)| {
                members.sort_by_key(|slice| slice.acquisition_date_time);
                members
            })
            .collect()
    }
}
