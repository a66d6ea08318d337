use image::Rgba;

use crate::buffer::Pixel;

/// Arithmetic mean of R, G and B, with alpha forced opaque.
#[inline]
pub fn grayscale(pixel: Pixel) -> Pixel {
    let [r, g, b, _] = pixel.0;
    let gray = ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
    Rgba([gray, gray, gray, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_channels_with_floor() {
        assert_eq!(grayscale(Rgba([120, 60, 30, 200])), Rgba([70, 70, 70, 255]));
        assert_eq!(grayscale(Rgba([255, 0, 0, 255])), Rgba([85, 85, 85, 255]));
        assert_eq!(grayscale(Rgba([1, 1, 0, 9])), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn full_white_does_not_overflow() {
        assert_eq!(grayscale(Rgba([255, 255, 255, 0])), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn gray_input_is_a_fixed_point() {
        for v in [0u8, 17, 128, 254, 255] {
            let p = Rgba([v, v, v, 255]);
            assert_eq!(grayscale(p), p);
        }
    }
}
