use crate::detection::Detection;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const STROKE_WIDTH: i32 = 3;

/// Draws one hollow rectangle per detection onto the image. Takes the
/// buffer by value: drawing mutates it in place and hands it back, so
/// callers keep no aliased view of an unmodified original.
///
/// Coordinates are used exactly as given; boxes that fall partly or
/// wholly outside the image are clipped by the rasterizer.
pub fn draw_detections(mut image: RgbImage, detections: &[Detection]) -> RgbImage {
    for detection in detections {
        let (x_min, y_min, x_max, y_max) = detection.corners();

        // The stroke grows inward from the outline, one rectangle per
        // inset pixel.
        for inset in 0..STROKE_WIDTH {
            let width = x_max - x_min + 1 - 2 * inset;
            let height = y_max - y_min + 1 - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect =
                Rect::at(x_min + inset, y_min + inset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(&mut image, rect, BOX_COLOR);
        }
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn canvas() -> RgbImage {
        RgbImage::from_pixel(200, 200, BLACK)
    }

    fn detection(row: [f32; 6]) -> Detection {
        Detection::from_row(&row).unwrap()
    }

    #[test]
    fn draws_rectangle_at_converted_corners() {
        let annotated = draw_detections(canvas(), &[detection([100., 100., 40., 60., 0.9, 0.])]);

        // Outline runs from (80, 70) to (120, 130).
        assert_eq!(*annotated.get_pixel(80, 70), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(120, 130), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(120, 70), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(100, 70), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(80, 100), BOX_COLOR);

        // Interior and exterior stay untouched.
        assert_eq!(*annotated.get_pixel(100, 100), BLACK);
        assert_eq!(*annotated.get_pixel(79, 70), BLACK);
        assert_eq!(*annotated.get_pixel(80, 69), BLACK);
    }

    #[test]
    fn stroke_is_three_pixels_wide_inward() {
        let annotated = draw_detections(canvas(), &[detection([100., 100., 40., 60., 0.9, 0.])]);

        assert_eq!(*annotated.get_pixel(80, 100), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(81, 100), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(82, 100), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(83, 100), BLACK);
    }

    #[test]
    fn out_of_bounds_boxes_are_clipped() {
        // Corners (-50, 100) to (250, 400): only the top edge crosses the
        // canvas. Everything else clips without panicking.
        let annotated = draw_detections(canvas(), &[detection([100., 250., 300., 300., 0.5, 1.])]);

        assert_eq!(*annotated.get_pixel(50, 100), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(50, 99), BLACK);
        assert_eq!(*annotated.get_pixel(50, 103), BLACK);
    }

    #[test]
    fn no_detections_leaves_the_image_untouched() {
        let annotated = draw_detections(canvas(), &[]);
        assert!(annotated.pixels().all(|&p| p == BLACK));
    }
}
