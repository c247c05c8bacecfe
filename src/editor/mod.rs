//! Editing engines that operate on a [`Surface`](crate::surface::Surface):
//! crop selection, blur brush and watermark stamp, plus the undo history the
//! session records their snapshots in.

pub mod history;
pub mod tools;

pub use history::{EditHistory, HistoryOutcome, UndoEntry};
pub use tools::{
    apply_crop, BlurBrush, BrushOptions, CropPreset, CropState, ToolKind, Watermark,
    WatermarkOptions,
};
