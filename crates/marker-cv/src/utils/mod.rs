//! Utility modules

pub mod image;
pub mod mask_ops;

pub use image::ImageUtils;
pub use mask_ops::MaskOps;
