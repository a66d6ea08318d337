use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use std::marker::PhantomData;
use std::ptr;

/// One 8-bit RGBA pixel.
pub type Pixel = Rgba<u8>;

const CHANNELS: usize = 4;

/// Owned W x H raster of RGBA8 pixels. `Clone` is a deep copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        Self::from_fn(width, height, |_x, _y| pixel)
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: FnMut(u32, u32) -> Pixel,
    {
        Self { image: ImageBuffer::from_fn(width, height, f) }
    }

    /// Normalises any decoded image to RGBA8 so the kernel only sees one pixel format.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        Self { image: img.to_rgba8() }
    }

    pub fn width(&self) -> u32 { self.image.width() }
    pub fn height(&self) -> u32 { self.image.height() }

    /// Number of pixels, i.e. the size of the linear index domain `[0, W*H)`.
    pub fn len(&self) -> usize { self.image.width() as usize * self.image.height() as usize }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn get(&self, x: u32, y: u32) -> Pixel { *self.image.get_pixel(x, y) }
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) { self.image.put_pixel(x, y, pixel) }

    pub fn get_index(&self, index: usize) -> Pixel {
        let (x, y) = index_to_xy(index, self.width());
        self.get(x, y)
    }

    /// Row-major pixel iterator, in linear index order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.image.pixels().copied()
    }

    pub fn as_rgba_image(&self) -> &RgbaImage { &self.image }

    /// Borrows the buffer as a view that many workers may write through at once.
    pub fn shared(&mut self) -> SharedPixels<'_> {
        let (width, height) = self.image.dimensions();
        SharedPixels {
            ptr: self.image.as_mut_ptr(),
            width,
            height,
            _buffer: PhantomData,
        }
    }
}

#[inline]
pub fn index_to_xy(index: usize, width: u32) -> (u32, u32) {
    let width = width as usize;
    ((index % width) as u32, (index / width) as u32)
}

/// Lock-free view over a [`PixelBuffer`] shared by the workers of one strategy run.
///
/// Holding the view keeps the buffer mutably borrowed, so nothing outside the run can
/// observe it. The accessors are `unsafe`: every caller must own a set of pixel indices
/// disjoint from every other thread's for the lifetime of the view. Both schedulers
/// hand out each index to exactly one worker, which is what makes their tasks sound.
pub struct SharedPixels<'a> {
    ptr: *mut u8,
    width: u32,
    height: u32,
    _buffer: PhantomData<&'a mut [u8]>,
}

// SAFETY: the view only dereferences `ptr` through the unsafe accessors below, whose
// contract rules out two threads touching the same pixel.
unsafe impl Send for SharedPixels<'_> {}
unsafe impl Sync for SharedPixels<'_> {}

impl SharedPixels<'_> {
    pub fn len(&self) -> usize { self.width as usize * self.height as usize }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn coords(&self, index: usize) -> (u32, u32) { index_to_xy(index, self.width) }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// # Safety
    /// `(x, y)` must be in bounds and no other thread may write this pixel while the
    /// view is alive.
    pub unsafe fn get(&self, x: u32, y: u32) -> Pixel {
        let mut channels = [0u8; CHANNELS];
        ptr::copy_nonoverlapping(self.ptr.add(self.offset(x, y)), channels.as_mut_ptr(), CHANNELS);
        Rgba(channels)
    }

    /// # Safety
    /// `(x, y)` must be in bounds and owned exclusively by the calling worker.
    pub unsafe fn set(&self, x: u32, y: u32, pixel: Pixel) {
        ptr::copy_nonoverlapping(pixel.0.as_ptr(), self.ptr.add(self.offset(x, y)), CHANNELS);
    }

    /// Reads linear pixel `index`, maps it through `f` and writes it back.
    ///
    /// # Safety
    /// `index < self.len()` and the index is owned exclusively by the calling worker.
    pub unsafe fn update<F>(&self, index: usize, f: F)
    where
        F: Fn(Pixel) -> Pixel,
    {
        let (x, y) = self.coords(index);
        self.set(x, y, f(self.get(x, y)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_index_is_row_major() {
        assert_eq!(index_to_xy(0, 3), (0, 0));
        assert_eq!(index_to_xy(2, 3), (2, 0));
        assert_eq!(index_to_xy(3, 3), (0, 1));
        assert_eq!(index_to_xy(7, 3), (1, 2));
    }

    #[test]
    fn clone_is_independent() {
        let mut a = PixelBuffer::filled(2, 2, Rgba([1, 2, 3, 4]));
        let b = a.clone();
        a.set(1, 1, Rgba([9, 9, 9, 9]));
        assert_eq!(b.get(1, 1), Rgba([1, 2, 3, 4]));
        assert_eq!(a.get(1, 1), Rgba([9, 9, 9, 9]));
    }

    #[test]
    fn shared_view_reads_and_writes_by_index() {
        let mut buf = PixelBuffer::from_fn(3, 2, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        {
            let view = buf.shared();
            assert_eq!(view.len(), 6);
            assert!(!view.is_empty());
            unsafe {
                assert_eq!(view.get(2, 1), Rgba([2, 1, 0, 255]));
                view.update(4, |p| Rgba([p[0] + 10, p[1] + 10, 7, 0]));
            }
        }
        assert_eq!(buf.get(1, 1), Rgba([11, 11, 7, 0]));
        assert_eq!(buf.get_index(4), Rgba([11, 11, 7, 0]));
    }

    #[test]
    fn zero_sized_buffer_is_empty() {
        let mut buf = PixelBuffer::from_fn(0, 3, |_x, _y| Rgba([0, 0, 0, 0]));
        assert!(buf.is_empty());
        assert!(buf.shared().is_empty());
        assert!(!PixelBuffer::filled(1, 1, Rgba([0, 0, 0, 0])).is_empty());
    }

    #[test]
    fn from_dynamic_normalises_to_rgba() {
        let rgb = image::RgbImage::from_pixel(2, 1, image::Rgb([10, 20, 30]));
        let buf = PixelBuffer::from_dynamic(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(buf.get(1, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(buf.len(), 2);
    }
}
