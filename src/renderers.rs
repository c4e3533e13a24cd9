use std::fmt;
use std::convert::TryFrom;
use std::io::Cursor;
use std::str::FromStr;

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::cells::{self, Cell, CompassPrimary};
use crate::errors::*;
use crate::grid::Grid;

// Sprite tables are indexed by the cell's passage bits: N=1, S=2, E=4, W=8.

const SIMPLE_SPRITES: [[&str; 2]; 16] = [
    ["   ", "   "], // " "
    ["| |", "+-+"], // "╵"
    ["+-+", "| |"], // "╷"
    ["| |", "| |"], // "│"
    ["+--", "+--"], // "╶"
    ["| .", "+--"], // "└"
    ["+--", "| ."], // "┌"
    ["| .", "| ."], // "├"
    ["--+", "--+"], // "╴"
    [". |", "--+"], // "┘"
    ["--+", ". |"], // "┐"
    [". |", ". |"], // "┤"
    ["---", "---"], // "─"
    [". .", "---"], // "┴"
    ["---", ". ."], // "┬"
    [". .", ". ."], // "┼"
];

const UTF8_SPRITES: [[&str; 2]; 16] = [
    ["   ", "   "],
    ["│ │", "└─┘"],
    ["┌─┐", "│ │"],
    ["│ │", "│ │"],
    ["┌──", "└──"],
    ["│ └", "└──"],
    ["┌──", "│ ┌"],
    ["│ └", "│ ┌"],
    ["──┐", "──┘"],
    ["┘ │", "──┘"],
    ["──┐", "┐ │"],
    ["┘ │", "┐ │"],
    ["───", "───"],
    ["┘ └", "───"],
    ["───", "┐ ┌"],
    ["┘ └", "┐ ┌"],
];

const UTF8_LINES: [&str; 16] = [" ", "╵", "╷", "│", "╶", "└", "┌", "├", "╴", "┘", "┐", "┤", "─",
                                "┴", "┬", "┼"];

/// The textual renderings of a grid.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Three by two ASCII characters per cell.
    SimpleAscii,
    /// Three by two box drawing characters per cell, walls drawn around the passages.
    Utf8Halls,
    /// One box drawing character per cell tracing the passages.
    Utf8Lines,
}

impl Default for TextMode {
    fn default() -> TextMode {
        TextMode::SimpleAscii
    }
}

impl FromStr for TextMode {
    type Err = Error;

    fn from_str(mode: &str) -> Result<TextMode> {
        match mode.replace('-', "_").as_str() {
            "simple_ascii" | "ascii" => Ok(TextMode::SimpleAscii),
            "utf8_halls" => Ok(TextMode::Utf8Halls),
            "utf8_lines" => Ok(TextMode::Utf8Lines),
            _ => Err(ErrorKind::UnknownRenderMode(mode.to_string()).into()),
        }
    }
}

/// Supported binary image formats.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum ExportFormat {
    Png,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(format: &str) -> Result<ExportFormat> {
        match format {
            "png" | "PNG" => Ok(ExportFormat::Png),
            _ => Err(ErrorKind::UnknownExportFormat(format.to_string()).into()),
        }
    }
}

pub fn render_text(grid: &Grid, mode: TextMode) -> String {
    match mode {
        TextMode::SimpleAscii => render_with_sprites(grid, &SIMPLE_SPRITES),
        TextMode::Utf8Halls => render_with_sprites(grid, &UTF8_SPRITES),
        TextMode::Utf8Lines => render_lines(grid),
    }
}

#[inline]
fn sprite_index(cell: Cell) -> usize {
    (cell & 0x0f) as usize
}

fn render_with_sprites(grid: &Grid, sprites: &[[&str; 2]; 16]) -> String {
    let mut output = String::with_capacity(grid.size() * 8);
    for row in grid.iter_row() {
        for line in 0..2 {
            output.push_str(&row.iter().map(|&cell| sprites[sprite_index(cell)][line]).join(""));
            output.push('\n');
        }
    }
    output
}

fn render_lines(grid: &Grid) -> String {
    let mut output = String::with_capacity(grid.size() * 4);
    for row in grid.iter_row() {
        output.push_str(&row.iter().map(|&cell| UTF8_LINES[sprite_index(cell)]).join(""));
        output.push('\n');
    }
    output
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", render_text(self, TextMode::SimpleAscii))
    }
}

pub type Colour = [u8; 4];

/// Image rendering configuration. Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Pixel length of one cell, walls included on the north and west sides.
    pub cell_size: u32,
    pub wall_width: u32,
    pub background: Colour,
    pub wall_colour: Colour,
    pub cell_colour: Colour,
}

impl Default for RenderOptions {
    fn default() -> RenderOptions {
        RenderOptions {
            cell_size: 10,
            wall_width: 1,
            background: [0xff, 0xff, 0xff, 0x00],
            wall_colour: [0x00, 0x00, 0x00, 0xff],
            cell_colour: [0xff, 0xff, 0xff, 0xff],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptionsBuilder {
    options: RenderOptions,
}

impl RenderOptionsBuilder {
    pub fn new() -> RenderOptionsBuilder {
        RenderOptionsBuilder::default()
    }
    pub fn cell_size(mut self, pixels: u32) -> RenderOptionsBuilder {
        self.options.cell_size = pixels;
        self
    }
    pub fn wall_width(mut self, pixels: u32) -> RenderOptionsBuilder {
        self.options.wall_width = pixels;
        self
    }
    pub fn background(mut self, colour: Colour) -> RenderOptionsBuilder {
        self.options.background = colour;
        self
    }
    pub fn wall_colour(mut self, colour: Colour) -> RenderOptionsBuilder {
        self.options.wall_colour = colour;
        self
    }
    pub fn cell_colour(mut self, colour: Colour) -> RenderOptionsBuilder {
        self.options.cell_colour = colour;
        self
    }
    pub fn build(self) -> RenderOptions {
        self.options
    }
}

/// Encodes a finished grid into an image byte blob.
pub trait GridFormatter {
    fn format(&self, grid: &Grid, options: &RenderOptions) -> Result<Vec<u8>>;
}

#[derive(Debug, Default, Copy, Clone)]
pub struct PngFormatter;

impl GridFormatter for PngFormatter {
    fn format(&self, grid: &Grid, options: &RenderOptions) -> Result<Vec<u8>> {
        let image = draw_grid(grid, options)?;
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image).write_to(&mut bytes, ImageOutputFormat::Png)?;
        Ok(bytes.into_inner())
    }
}

pub fn export(grid: &Grid, format: ExportFormat, options: &RenderOptions) -> Result<Vec<u8>> {
    let bytes = match format {
        ExportFormat::Png => PngFormatter.format(grid, options)?,
    };
    debug!(?format, bytes = bytes.len(), "exported grid");
    Ok(bytes)
}

/// Image size for the grid: every cell is `cell_size` square, plus a closing wall on the east
/// and south edges. Fails when the image would not fit in `u32` pixel coordinates.
pub fn image_dimensions(grid: &Grid, options: &RenderOptions) -> Result<(u32, u32)> {
    let invalid = || Error::from(ErrorKind::InvalidRenderOptions(options.cell_size,
                                                                 options.wall_width));
    let cell = cell_pixels(options).ok_or_else(invalid)?;
    let side = |cells: usize| {
        u32::try_from(cells)
            .ok()
            .and_then(|cells| cells.checked_mul(cell))
            .and_then(|pixels| pixels.checked_add(options.wall_width))
    };
    let img_width = side(grid.width().0).ok_or_else(invalid)?;
    let img_height = side(grid.height().0).ok_or_else(invalid)?;
    Ok((img_width, img_height))
}

#[inline]
fn cell_pixels(options: &RenderOptions) -> Option<u32> {
    options.wall_width.checked_add(1).map(|min| options.cell_size.max(min))
}

// Every rectangle end below is at most the image size, which `image_dimensions` checked.
fn draw_grid(grid: &Grid, options: &RenderOptions) -> Result<RgbaImage> {
    let (img_width, img_height) = image_dimensions(grid, options)?;
    let mut image = RgbaImage::from_pixel(img_width, img_height, Rgba(options.background));
    let cell_size = options.cell_size.max(options.wall_width.saturating_add(1));
    let wall = options.wall_width;
    let wall_colour = Rgba(options.wall_colour);
    let cell_colour = Rgba(options.cell_colour);

    for coord in grid.iter() {
        let cell = grid.cell(coord).unwrap_or(0);
        if cell == 0 {
            continue;
        }

        let x1 = coord.x * cell_size;
        let y1 = coord.y * cell_size;
        let x2 = x1 + cell_size;
        let y2 = y1 + cell_size;

        fill_rect(&mut image, x1 + wall, y1 + wall, x2, y2, cell_colour);

        // corners always, wall segments only where there is no passage
        for &(cx, cy) in &[(x1, y1), (x2, y1), (x1, y2), (x2, y2)] {
            fill_rect(&mut image, cx, cy, cx + wall, cy + wall, wall_colour);
        }

        let sides = [(CompassPrimary::North, (x1 + wall, y1, x2, y1 + wall)),
                     (CompassPrimary::South, (x1 + wall, y2, x2, y2 + wall)),
                     (CompassPrimary::West, (x1, y1 + wall, x1 + wall, y2)),
                     (CompassPrimary::East, (x2, y1 + wall, x2 + wall, y2))];
        for &(direction, (sx1, sy1, sx2, sy2)) in sides.iter() {
            let colour = if cells::has_passage(cell, direction) {
                cell_colour
            } else {
                wall_colour
            };
            fill_rect(&mut image, sx1, sy1, sx2, sy2, colour);
        }
    }

    Ok(image)
}

/// Fill [x1, x2) x [y1, y2), clipped to the image.
fn fill_rect(image: &mut RgbaImage, x1: u32, y1: u32, x2: u32, y2: u32, colour: Rgba<u8>) {
    for y in y1..y2.min(image.height()) {
        for x in x1..x2.min(image.width()) {
            image.put_pixel(x, y, colour);
        }
    }
}
