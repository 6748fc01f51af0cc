/// Anatomical plane a slice is dominantly aligned with, derived from the axis
/// of its orientation normal with the largest magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Orientation {
    Sagittal,
    Coronal,
    Transversal,
    #[default]
    Undefined,
}

/// How candidates with repeated positions are turned into output stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// One 3D volume per timepoint.
    #[default]
    PerTimepoint,
    /// The whole multi-timepoint candidate as one 4D stack.
    Stacked,
}
