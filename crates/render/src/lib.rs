//! Dual-image skeleton renderer
//!
//! One render pass produces both outputs for a frame: the skeleton drawn on a
//! blank canvas and the same skeleton composited over the original frame.
//! Producing both from one pass guarantees the two images share one
//! coordinate scaling. Rendering is a pure function of its inputs and never
//! fails; an absent landmark set yields a blank skeleton image and an overlay
//! identical to the input frame.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use skelform_common::{Landmark, LandmarkSet, SKELETON_CONNECTIONS};

/// Drawing style for skeleton rendering
#[derive(Debug, Clone)]
pub struct RenderStyle {
    /// Joint-to-joint connection color
    pub connection_color: Rgb<u8>,
    /// Joint marker color
    pub joint_color: Rgb<u8>,
    /// Connection line thickness in pixels
    pub line_thickness: f32,
    /// Joint marker radius in pixels
    pub joint_radius: i32,
    /// Joints below this confidence are not drawn, and connections touching
    /// them are skipped on both images
    pub min_confidence: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        // Green connections, white joint markers
        Self {
            connection_color: Rgb([0, 255, 0]),
            joint_color: Rgb([255, 255, 255]),
            line_thickness: 4.0,
            joint_radius: 4,
            min_confidence: 0.5,
        }
    }
}

/// The two images rendered for one frame
#[derive(Debug, Clone)]
pub struct RenderedPair {
    /// Skeleton on a blank canvas
    pub skeleton: RgbImage,
    /// Skeleton over the original frame
    pub overlay: RgbImage,
}

/// Render the skeleton and overlay images for one frame
#[must_use]
pub fn render_frame(
    frame: &RgbImage,
    landmarks: Option<&LandmarkSet>,
    style: &RenderStyle,
) -> RenderedPair {
    let mut skeleton = RgbImage::new(frame.width(), frame.height());
    let mut overlay = frame.clone();

    if let Some(set) = landmarks {
        let width = frame.width() as f32;
        let height = frame.height() as f32;

        for (from, to) in SKELETON_CONNECTIONS {
            let (Some(a), Some(b)) = (set.joint(*from), set.joint(*to)) else {
                continue;
            };
            if a.confidence < style.min_confidence || b.confidence < style.min_confidence {
                continue;
            }
            let start = scale_point(a, width, height);
            let end = scale_point(b, width, height);
            draw_thick_segment(&mut skeleton, start, end, style);
            draw_thick_segment(&mut overlay, start, end, style);
        }

        for landmark in &set.landmarks {
            if landmark.confidence < style.min_confidence {
                continue;
            }
            let (x, y) = scale_point(landmark, width, height);
            let center = (x.round() as i32, y.round() as i32);
            draw_filled_circle_mut(&mut skeleton, center, style.joint_radius, style.joint_color);
            draw_filled_circle_mut(&mut overlay, center, style.joint_radius, style.joint_color);
        }
    }

    RenderedPair { skeleton, overlay }
}

/// Scale a normalized landmark to pixel coordinates
fn scale_point(landmark: &Landmark, width: f32, height: f32) -> (f32, f32) {
    (landmark.x * width, landmark.y * height)
}

/// Draw a line with round caps at the configured thickness
///
/// imageproc draws one-pixel segments, so thickness comes from stacking
/// half-pixel perpendicular offsets; the stride keeps diagonals hole-free.
fn draw_thick_segment(canvas: &mut RgbImage, start: (f32, f32), end: (f32, f32), style: &RenderStyle) {
    let half = style.line_thickness / 2.0;
    let radius = half.round() as i32;

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        draw_filled_circle_mut(
            canvas,
            (start.0.round() as i32, start.1.round() as i32),
            radius,
            style.connection_color,
        );
        return;
    }

    let nx = -dy / len;
    let ny = dx / len;
    let steps = (style.line_thickness * 2.0).ceil().max(1.0) as i32;
    for i in 0..=steps {
        let offset = -half + i as f32 * style.line_thickness / steps as f32;
        draw_line_segment_mut(
            canvas,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            style.connection_color,
        );
    }

    if radius > 0 {
        draw_filled_circle_mut(
            canvas,
            (start.0.round() as i32, start.1.round() as i32),
            radius,
            style.connection_color,
        );
        draw_filled_circle_mut(
            canvas,
            (end.0.round() as i32, end.1.round() as i32),
            radius,
            style.connection_color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skelform_common::JointName;

    fn test_frame() -> RgbImage {
        RgbImage::from_pixel(100, 50, Rgb([10, 20, 30]))
    }

    fn confident_set() -> LandmarkSet {
        LandmarkSet {
            confidence: 0.9,
            landmarks: vec![
                Landmark::new(JointName::LeftShoulder, 0.25, 0.5, 0.9),
                Landmark::new(JointName::RightShoulder, 0.75, 0.5, 0.9),
            ],
        }
    }

    #[test]
    fn test_no_landmarks_yields_blank_and_identity() {
        let frame = test_frame();
        let pair = render_frame(&frame, None, &RenderStyle::default());

        assert!(pair.skeleton.pixels().all(|p| p.0 == [0, 0, 0]));
        assert_eq!(pair.overlay.as_raw(), frame.as_raw());
    }

    #[test]
    fn test_detection_draws_on_both_images() {
        let frame = test_frame();
        let set = confident_set();
        let pair = render_frame(&frame, Some(&set), &RenderStyle::default());

        assert!(pair.skeleton.pixels().any(|p| p.0 != [0, 0, 0]));
        assert_ne!(pair.overlay.as_raw(), frame.as_raw());
    }

    #[test]
    fn test_scaling_consistent_across_images() {
        let frame = test_frame();
        let set = LandmarkSet {
            confidence: 0.9,
            landmarks: vec![Landmark::new(JointName::Nose, 0.5, 0.5, 0.9)],
        };
        let pair = render_frame(&frame, Some(&set), &RenderStyle::default());

        // Marker center lands at (50, 25) on both canvases
        let style = RenderStyle::default();
        assert_eq!(*pair.skeleton.get_pixel(50, 25), style.joint_color);
        assert_eq!(*pair.overlay.get_pixel(50, 25), style.joint_color);
    }

    #[test]
    fn test_low_confidence_connection_skipped() {
        let frame = test_frame();
        let set = LandmarkSet {
            confidence: 0.9,
            landmarks: vec![
                Landmark::new(JointName::LeftShoulder, 0.25, 0.5, 0.3),
                Landmark::new(JointName::RightShoulder, 0.75, 0.5, 0.9),
            ],
        };
        let pair = render_frame(&frame, Some(&set), &RenderStyle::default());

        // Shoulder-to-shoulder line must not be drawn: midpoint stays blank
        assert_eq!(*pair.skeleton.get_pixel(50, 25), Rgb([0, 0, 0]));
        // The confident joint is still marked
        assert_eq!(
            *pair.skeleton.get_pixel(75, 25),
            RenderStyle::default().joint_color
        );
    }

    #[test]
    fn test_out_of_frame_coordinates_do_not_panic() {
        let frame = test_frame();
        let set = LandmarkSet {
            confidence: 0.9,
            landmarks: vec![
                Landmark::new(JointName::LeftShoulder, 0.0, 0.0, 0.9),
                Landmark::new(JointName::RightShoulder, 1.0, 1.0, 0.9),
            ],
        };
        let _ = render_frame(&frame, Some(&set), &RenderStyle::default());
    }

    #[test]
    fn test_output_dimensions_match_input() {
        let frame = RgbImage::new(33, 17);
        let pair = render_frame(&frame, Some(&confident_set()), &RenderStyle::default());
        assert_eq!(pair.skeleton.dimensions(), (33, 17));
        assert_eq!(pair.overlay.dimensions(), (33, 17));
    }
}
