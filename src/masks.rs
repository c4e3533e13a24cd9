use std::fmt::Debug;

use bit_set::BitSet;
use image::DynamicImage;

use crate::cells::{Cartesian2DCoordinate, ALL_DIRECTIONS};
use crate::units::{Height, Width};
use crate::utils::{self, FnvHashSet};

/// Which coordinates may be visited while carving a maze.
///
/// `contains` must be a pure function of its arguments: it is queried repeatedly and in no
/// particular order during generation. Coordinates outside the mask are simply not open.
pub trait Mask: Debug {
    fn contains(&self, x: isize, y: isize) -> bool;

    /// Calculates the number of open cells within a 2d space specified by `width` and `height`.
    fn count_open_within(&self, width: Width, height: Height) -> usize {
        let mut count = 0;
        for y in 0..height.0 {
            for x in 0..width.0 {
                if self.contains(x as isize, y as isize) {
                    count += 1;
                }
            }
        }
        count
    }

    /// The first open coordinate in row major order within `width` x `height`.
    fn first_open_within(&self, width: Width, height: Height) -> Option<Cartesian2DCoordinate> {
        (0..height.0)
            .flat_map(|y| (0..width.0).map(move |x| (x, y)))
            .find(|&(x, y)| self.contains(x as isize, y as isize))
            .map(|(x, y)| Cartesian2DCoordinate::new(x as u32, y as u32))
    }

    /// Every open coordinate within `width` x `height` connected to `start` through north,
    /// south, east and west steps over open cells. Empty if `start` itself is not open.
    fn open_region_from(&self,
                        start: Cartesian2DCoordinate,
                        width: Width,
                        height: Height)
                        -> FnvHashSet<Cartesian2DCoordinate> {
        let mut region = utils::fnv_hashset(width.0 * height.0);
        let in_bounds = |x: isize, y: isize| {
            x >= 0 && y >= 0 && (x as usize) < width.0 && (y as usize) < height.0
        };
        if !in_bounds(start.x as isize, start.y as isize) ||
           !self.contains(start.x as isize, start.y as isize) {
            return region;
        }

        let _ = region.insert(start);
        let mut frontier = vec![start];
        while let Some(coord) = frontier.pop() {
            for dir in ALL_DIRECTIONS.iter() {
                let (dx, dy) = dir.delta();
                let (nx, ny) = (coord.x as isize + dx, coord.y as isize + dy);
                if in_bounds(nx, ny) && self.contains(nx, ny) {
                    let neighbour = Cartesian2DCoordinate::new(nx as u32, ny as u32);
                    if region.insert(neighbour) {
                        frontier.push(neighbour);
                    }
                }
            }
        }
        region
    }
}

/// Every coordinate is open. The dimensions are informational only.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TransparentMask {
    pub width: usize,
    pub height: usize,
}

impl TransparentMask {
    pub fn new(width: usize, height: usize) -> TransparentMask {
        TransparentMask { width, height }
    }
}

impl Mask for TransparentMask {
    #[inline]
    fn contains(&self, _: isize, _: isize) -> bool {
        true
    }
}

/// A bitmap of open cells. Rows may be ragged; cells beyond a row's own length are closed.
#[derive(Debug, Clone)]
pub struct BinaryMask2D {
    open: BitSet,
    pub width: usize,
    pub height: usize,
}

impl BinaryMask2D {
    /// Build from rows of open flags.
    pub fn from_rows<R, I>(rows: R) -> BinaryMask2D
        where R: IntoIterator<Item = I>,
              I: IntoIterator<Item = bool>
    {
        let rows = rows.into_iter()
            .map(|row| row.into_iter().collect::<Vec<bool>>())
            .collect::<Vec<_>>();
        let height = rows.len();
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        let mut open = BitSet::with_capacity(width * height);

        for (y, row) in rows.iter().enumerate() {
            for (x, &is_open) in row.iter().enumerate() {
                if is_open {
                    let _ = open.insert(y * width + x);
                }
            }
        }

        BinaryMask2D {
            open,
            width,
            height,
        }
    }

    /// Parse a text mask where `.` is open and any other character is closed.
    ///
    /// Trailing whitespace is trimmed from each row, and blank rows at the start and end of the
    /// text are dropped. Blank rows in between are kept as fully closed rows.
    pub fn from_text(text: &str) -> BinaryMask2D {
        BinaryMask2D::from_rows(text.trim_end()
            .lines()
            .skip_while(|line| line.trim().is_empty())
            .map(|line| line.trim_end().chars().map(|c| c == '.')))
    }

    /// Build from decoded pixel values; a pixel is open iff its low 8 bits are all zero.
    ///
    /// `pixels` is row major with `width` values per row. A trailing partial row is kept as a
    /// short row.
    pub fn from_pixels(width: usize, pixels: &[u32]) -> BinaryMask2D {
        BinaryMask2D::from_rows(pixels.chunks(width.max(1))
            .map(|row| row.iter().map(|&value| (value & 0xff) == 0)))
    }

    /// Build from a decoded image, packing each pixel as `0xRRGGBBAA` before applying the
    /// `from_pixels` rule. Fully transparent pixels are open.
    pub fn from_image(data_image: &DynamicImage) -> BinaryMask2D {
        let rgba = data_image.to_rgba8();
        let width = rgba.width() as usize;
        let pixels = rgba.pixels()
            .map(|pixel| {
                let [r, g, b, a] = pixel.0;
                u32::from_be_bytes([r, g, b, a])
            })
            .collect::<Vec<u32>>();
        BinaryMask2D::from_pixels(width, &pixels)
    }
}

impl Mask for BinaryMask2D {
    fn contains(&self, x: isize, y: isize) -> bool {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.open.contains(y as usize * self.width + x as usize)
        } else {
            false
        }
    }
}
