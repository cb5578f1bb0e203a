//! Fixed face-mesh index catalogs.
//!
//! Indices follow the 478-point face mesh with iris refinement (468 mesh
//! points followed by two 5-point iris rings). Any paired recognition model
//! consuming the pattern relies on these exact lists and their order.

/// Minimum landmark count for a full mesh with iris refinement.
pub const FULL_MESH_LEN: usize = 478;

/// Face-oval contour, used for the centroid.
pub const FACE_OVAL: [usize; 36] = [
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377, 152,
    148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

/// Landmark pairs whose normalized distances make up one pattern frame.
pub const MANDATORY_PAIRS: [(usize, usize); 20] = [
    (33, 263),
    (133, 362),
    (10, 152),
    (4, 152),
    (61, 291),
    (234, 454),
    (4, 33),
    (4, 263),
    (13, 14),
    (70, 300),
    (105, 334),
    (127, 356),
    (172, 397),
    (1, 61),
    (1, 291),
    (168, 4),
    (6, 197),
    (159, 145),
    (386, 374),
    (0, 17),
];

/// Iris ring of the eye on the image-left side (centre first).
pub const LEFT_IRIS: [usize; 5] = [468, 469, 470, 471, 472];
/// Iris ring of the eye on the image-right side (centre first).
pub const RIGHT_IRIS: [usize; 5] = [473, 474, 475, 476, 477];

/// Eyelid contour around [`LEFT_IRIS`].
pub const LEFT_EYE: [usize; 16] = [
    33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
];
/// Eyelid contour around [`RIGHT_IRIS`].
pub const RIGHT_EYE: [usize; 16] = [
    263, 249, 390, 373, 374, 380, 381, 382, 362, 398, 384, 385, 386, 387, 388, 466,
];

pub const NOSE_TIP: usize = 4;
pub const LEFT_EYE_CORNER: usize = 33;
pub const RIGHT_EYE_CORNER: usize = 263;

/// Six-point eye outline used by the eye aspect ratio.
///
/// `corners` span the eye horizontally; `upper[k]` pairs with `lower[k]`.
#[derive(Debug, Clone, Copy)]
pub struct EarLandmarks {
    pub corners: (usize, usize),
    pub upper: [usize; 2],
    pub lower: [usize; 2],
}

pub const LEFT_EAR: EarLandmarks = EarLandmarks {
    corners: (33, 133),
    upper: [160, 158],
    lower: [144, 153],
};

pub const RIGHT_EAR: EarLandmarks = EarLandmarks {
    corners: (362, 263),
    upper: [385, 387],
    lower: [380, 373],
};

/// Highest index touched by the EAR outlines.
pub const EAR_MAX_INDEX: usize = 387;
