//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::{BinaryMask, BoundingBox, Frame, ImgWriteRaw, LabelledMask};

pub use crate::consts::{ALPHA_THRESHOLD, BACKGROUND_VALUE, INTENSITY_SCALE, IOU_THRESHOLD, MIN_AREA};

pub use crate::label::{label, label_and_fill, label_and_filter};

pub use crate::measure::{measure, MeasureOptions, Measured, Particle, Property, Value};
#[cfg(feature = "rayon")]
pub use crate::measure::par_measure;

pub use crate::matching::{match_particles, MatchPolicy, MatchRecord, MatchSide};

pub use crate::dataset::{
    self, BenchmarkLayout, Dataset, FrameOutput, Pipeline, SharedDataset, TableSnapshot,
};
pub use crate::dataset::{home_dataset_dir, home_dataset_dir_with};
