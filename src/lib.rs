//! **mazecarve** generates rectangular mazes with a masked depth first backtracker and renders
//! them as text or images.
//!
//! Cells are 4 bit passage masks (`cells::NORTH`, `SOUTH`, `EAST`, `WEST`); a `masks::Mask`
//! gates which cells may be carved; `renderers` turn a finished `grid::Grid` into sprites.
//!
//! ```
//! use mazecarve::maze::MazeBuilder;
//! use mazecarve::units::{Height, Width};
//!
//! let maze = MazeBuilder::new(Width(5), Height(5)).seed(7).generate().unwrap();
//! assert_eq!(maze.grid().links_count(), 24);
//! print!("{}", maze.render("utf8_lines").unwrap());
//! ```

pub mod cells;
pub mod errors;
pub mod generators;
pub mod grid;
pub mod masks;
pub mod maze;
pub mod renderers;
pub mod units;
mod utils;

pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::maze::{Maze, MazeBuilder};
