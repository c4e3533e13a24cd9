use std::mem;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::cells::{Cartesian2DCoordinate, CompassPrimary, DirectionSmallVec, ALL_DIRECTIONS};
use crate::grid::{CellLinkError, Grid};
use crate::masks::Mask;

/// Pick a uniformly random open cell of the grid by rejection sampling.
///
/// Returns None, without sampling, when the mask has no open cell inside the grid; sampling
/// would otherwise never finish.
pub fn random_open_cell<R: Rng + ?Sized>(grid: &Grid,
                                         mask: &dyn Mask,
                                         rng: &mut R)
                                         -> Option<Cartesian2DCoordinate> {
    let (width, height) = (grid.width(), grid.height());
    mask.first_open_within(width, height)?;

    loop {
        let x = rng.gen_range(0..width.0);
        let y = rng.gen_range(0..height.0);
        if mask.contains(x as isize, y as isize) {
            return Some(Cartesian2DCoordinate::new(x as u32, y as u32));
        }
    }
}

/// The four compass directions in a fresh random order.
fn new_tries<R: Rng + ?Sized>(rng: &mut R) -> DirectionSmallVec {
    let mut tries = ALL_DIRECTIONS.iter().cloned().collect::<DirectionSmallVec>();
    tries.shuffle(rng);
    tries
}

/// Depth first "recursive backtracker" generation driven one carve at a time.
///
/// The recursion is an explicit stack of (cell, untried directions) frames. Each `step` pops
/// directions off the current retry queue until one leads to an unvisited open cell, carving
/// a passage to it. When the queue runs dry the previous frame is restored, and when the
/// stack runs dry the maze is finished.
///
/// Only never visited cells (value 0) are carved into, so the passages always form a
/// spanning tree over the cells reachable from the start.
///
/// `randomness` is the percentage chance that the direction just carved is *not* moved to
/// the front of the new cell's retry queue. At 100 every direction order is uniformly random;
/// lower values favour carrying straight on, giving longer corridors.
#[derive(Debug, Clone)]
pub struct RecursiveBacktracker {
    current: Cartesian2DCoordinate,
    tries: DirectionSmallVec,
    stack: Vec<(Cartesian2DCoordinate, DirectionSmallVec)>,
    randomness: u8,
    generated: bool,
}

impl RecursiveBacktracker {
    pub fn new<R: Rng + ?Sized>(start: Cartesian2DCoordinate,
                                randomness: u8,
                                rng: &mut R)
                                -> RecursiveBacktracker {
        RecursiveBacktracker {
            current: start,
            tries: new_tries(rng),
            stack: vec![],
            randomness: randomness.min(100),
            generated: false,
        }
    }

    #[inline]
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    #[inline]
    pub fn current(&self) -> Cartesian2DCoordinate {
        self.current
    }

    #[inline]
    pub fn randomness(&self) -> u8 {
        self.randomness
    }

    /// Number of frames on the backtracking path behind the current cell.
    #[inline]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Carve one passage. Returns the newly entered cell, or None once every reachable cell
    /// has been visited (and on every call after that).
    pub fn step<R: Rng + ?Sized>(&mut self,
                                 grid: &mut Grid,
                                 mask: &dyn Mask,
                                 rng: &mut R)
                                 -> Option<Cartesian2DCoordinate> {
        if self.generated {
            return None;
        }

        let direction = self.next_direction(grid, mask)?;
        let neighbour = match grid.link(self.current, direction) {
            Ok(neighbour) => neighbour,
            Err(CellLinkError::InvalidGridCoordinate) => {
                panic!("Direction {:?} from {} should lead to a cell in the grid.",
                       direction,
                       self.current)
            }
        };

        let remaining_tries = mem::replace(&mut self.tries, new_tries(rng));
        self.stack.push((self.current, remaining_tries));

        if rng.gen_range(0..100) >= self.randomness {
            // keep going straight: tries are popped from the back
            if let Some(position) = self.tries.iter().position(|&d| d == direction) {
                let _ = self.tries.remove(position);
            }
            self.tries.push(direction);
        }

        trace!(x = neighbour.x, y = neighbour.y, depth = self.stack.len(), "carved");
        self.current = neighbour;
        Some(neighbour)
    }

    fn next_direction(&mut self, grid: &Grid, mask: &dyn Mask) -> Option<CompassPrimary> {
        loop {
            match self.tries.pop() {
                Some(direction) => {
                    let open_unvisited = grid.neighbour_at_direction(self.current, direction)
                        .map_or(false, |n| {
                            grid.cell(n) == Some(0) && mask.contains(n.x as isize, n.y as isize)
                        });
                    if open_unvisited {
                        return Some(direction);
                    }
                }
                None => {
                    match self.stack.pop() {
                        Some((coord, tries)) => {
                            self.current = coord;
                            self.tries = tries;
                        }
                        None => {
                            self.generated = true;
                            debug!(x = self.current.x, y = self.current.y, "generation finished");
                            return None;
                        }
                    }
                }
            }
        }
    }
}

/// Remove every dead end (a cell with exactly one passage) in a single pass.
///
/// Dead ends are collected first and removed afterwards, so a corridor leading to a dead end
/// only loses its last cell per call; the cell behind becomes the new dead end for the next
/// call. Call repeatedly to prune further. Two dead ends facing each other are both cleared.
///
/// Returns the number of cells cleared.
pub fn sparsify(grid: &mut Grid) -> usize {
    let dead_ends = grid.iter()
        .filter(|&coord| grid.cell(coord).and_then(CompassPrimary::from_single_bit).is_some())
        .collect::<Vec<Cartesian2DCoordinate>>();

    for &coord in &dead_ends {
        // a facing dead end may have emptied this cell already
        if let Some(direction) = grid.cell(coord).and_then(CompassPrimary::from_single_bit) {
            let _ = grid.unlink(coord, direction);
        }
    }

    debug!(removed = dead_ends.len(), "sparsified");
    dead_ends.len()
}
