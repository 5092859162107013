use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::BTreeMap;

use crate::models::BoundingBox;

/// One closed outline in an edge map: an 8-connected set of edge pixels.
#[derive(Debug, Clone)]
pub struct Contour {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Contour {
    /// Minimal upright rectangle enclosing every pixel of the contour
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_extent(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Find contours in a binary edge image using connected components.
///
/// Contours come back in label order, which is raster-scan discovery order.
pub fn find_contours(edges: &GrayImage) -> Vec<Contour> {
    let labeled = connected_components(edges, Connectivity::Eight, Luma([0]));

    let mut regions: BTreeMap<u32, (u32, u32, u32, u32)> = BTreeMap::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue; // background
        }

        regions
            .entry(label_val)
            .and_modify(|(min_x, min_y, max_x, max_y)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
            })
            .or_insert((x, y, x, y));
    }

    regions
        .into_values()
        .map(|(min_x, min_y, max_x, max_y)| Contour {
            min_x,
            min_y,
            max_x,
            max_y,
        })
        .collect()
}

/// Keep boxes at least `min_area` large and, when a tolerance is given,
/// roughly square.
pub fn filter_boxes(
    boxes: impl IntoIterator<Item = BoundingBox>,
    min_area: u64,
    square_tolerance: Option<u32>,
) -> Vec<BoundingBox> {
    boxes
        .into_iter()
        .filter(|b| b.area() >= min_area)
        .filter(|b| square_tolerance.is_none_or(|tol| b.is_near_square(tol)))
        .collect()
}
