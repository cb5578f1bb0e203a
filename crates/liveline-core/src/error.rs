use thiserror::Error;

/// Rejections raised while turning a detector callback into a [`LandmarkSet`].
///
/// None of these escape a frame cycle: the coordinator logs them and the frame
/// contributes nothing.
///
/// [`LandmarkSet`]: crate::LandmarkSet
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("non-finite landmark coordinate at index {0}")]
    NonFiniteLandmark(usize),
}
