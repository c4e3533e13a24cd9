// Create the Error, ErrorKind, ResultExt, and Result types.
// Other modules `use crate::errors::*;` to get access to everything `error_chain!` creates.
#![allow(deprecated)]

use error_chain::error_chain;

error_chain! {

    foreign_links {
        Image(::image::ImageError);
    }

    errors {
        UnknownRenderMode(mode: String) {
            description("unknown text render mode")
            display("unknown render mode: {:?}", mode)
        }
        UnknownExportFormat(format: String) {
            description("unknown image export format")
            display("unknown export format: {:?}", format)
        }
        InvalidDimensions(width: usize, height: usize) {
            description("maze dimensions must be positive")
            display("invalid maze dimensions {}x{}", width, height)
        }
        InvalidRandomness(randomness: u8) {
            description("randomness must be a percentage")
            display("randomness {} is outside 0..=100", randomness)
        }
        InvalidRenderOptions(cell_size: u32, wall_width: u32) {
            description("render options give an image too large to address")
            display("cell size {} with wall width {} overflows the image size", cell_size, wall_width)
        }
        NoOpenCell(width: usize, height: usize) {
            description("mask has no passable cell within the maze")
            display("mask has no passable cell within {}x{}", width, height)
        }
    }
}
