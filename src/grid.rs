use std::fmt;
use std::slice;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::cells::{self, Cartesian2DCoordinate, Cell, CompassPrimary};
use crate::units::{Height, Width};

/// A `width` x `height` rectangle of passage bitmasks stored row major.
///
/// Passages are always carved and removed in pairs so that a bit on one cell is mirrored by
/// the opposite bit on its neighbour.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
    width: Width,
    height: Height,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum CellLinkError {
    InvalidGridCoordinate,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "Grid :: width: {:?}, height: {:?}, passages: {:?}",
               self.width.0,
               self.height.0,
               self.links_count())
    }
}

impl Grid {
    pub fn new(width: Width, height: Height) -> Grid {
        Grid {
            cells: vec![0; width.0 * height.0],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> Width {
        self.width
    }

    #[inline]
    pub fn height(&self) -> Height {
        self.height
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// The passage bits of a cell, None outside the grid.
    #[inline]
    pub fn cell(&self, coord: Cartesian2DCoordinate) -> Option<Cell> {
        self.grid_coordinate_to_index(coord).map(|index| self.cells[index])
    }

    /// Row major view of every cell.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Is the grid coordinate valid for this grid - within the grid's dimensions
    #[inline]
    pub fn is_valid_coordinate(&self, coord: Cartesian2DCoordinate) -> bool {
        (coord.x as usize) < self.width.0 && (coord.y as usize) < self.height.0
    }

    /// Convert a grid coordinate to a one dimensional index in the range 0...grid.size().
    /// Returns None if the grid coordinate is invalid.
    #[inline]
    pub fn grid_coordinate_to_index(&self, coord: Cartesian2DCoordinate) -> Option<usize> {
        if self.is_valid_coordinate(coord) {
            Some(coord.y as usize * self.width.0 + coord.x as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn index_to_grid_coordinate(&self, index: usize) -> Cartesian2DCoordinate {
        let x = index % self.width.0;
        let y = index / self.width.0;
        (x as u32, y as u32).into()
    }

    pub fn neighbour_at_direction(&self,
                                  coord: Cartesian2DCoordinate,
                                  direction: CompassPrimary)
                                  -> Option<Cartesian2DCoordinate> {
        cells::offset_coordinate(coord, direction)
            .and_then(|neighbour_coord| if self.is_valid_coordinate(neighbour_coord) {
                Some(neighbour_coord)
            } else {
                None
            })
    }

    /// Carve a passage from `coord` towards `direction`, setting the direction bit on the cell
    /// and the opposite bit on the neighbour. Returns the neighbour.
    pub fn link(&mut self,
                coord: Cartesian2DCoordinate,
                direction: CompassPrimary)
                -> Result<Cartesian2DCoordinate, CellLinkError> {
        let neighbour = self.neighbour_at_direction(coord, direction);
        match (self.grid_coordinate_to_index(coord),
               neighbour.and_then(|n| self.grid_coordinate_to_index(n))) {
            (Some(a_index), Some(b_index)) => {
                self.cells[a_index] |= direction.bit();
                self.cells[b_index] |= direction.opposite().bit();
                neighbour.ok_or(CellLinkError::InvalidGridCoordinate)
            }
            _ => Err(CellLinkError::InvalidGridCoordinate),
        }
    }

    /// Remove the passage from `coord` towards `direction` along with its mirror on the
    /// neighbour. Returns true if a passage bit was cleared.
    pub fn unlink(&mut self, coord: Cartesian2DCoordinate, direction: CompassPrimary) -> bool {
        let a_index = match self.grid_coordinate_to_index(coord) {
            Some(index) => index,
            None => return false,
        };
        let had_passage = cells::has_passage(self.cells[a_index], direction);
        self.cells[a_index] &= !direction.bit();

        if let Some(b_index) = self.neighbour_at_direction(coord, direction)
            .and_then(|n| self.grid_coordinate_to_index(n)) {
            self.cells[b_index] &= !direction.opposite().bit();
        }

        had_passage
    }

    pub fn is_neighbour_linked(&self,
                               coord: Cartesian2DCoordinate,
                               direction: CompassPrimary)
                               -> bool {
        self.cell(coord)
            .map_or(false, |cell| cells::has_passage(cell, direction)) &&
        self.neighbour_at_direction(coord, direction).is_some()
    }

    /// Number of passages, each bidirectional passage counted once.
    pub fn links_count(&self) -> usize {
        self.iter_links().count()
    }

    #[inline]
    pub fn iter(&self) -> CellIter {
        CellIter {
            width: self.width.0,
            current_cell_number: 0,
            cells_count: self.size(),
        }
    }

    /// Slices of cells, one per row from north to south.
    #[inline]
    pub fn iter_row(&self) -> slice::Chunks<Cell> {
        // chunks(0) panics, a zero width grid has no rows anyway
        self.cells.chunks(self.width.0.max(1))
    }

    /// Every passage once, as the (west or north cell, east or south cell) pair.
    pub fn iter_links(&self) -> LinksIter {
        LinksIter {
            grid: self,
            cell_iter: self.iter(),
            pending_south: None,
        }
    }

    /// The carved passages as an undirected graph with one node per cell, node index equal to
    /// the row major cell index.
    pub fn to_graph(&self) -> UnGraph<Cartesian2DCoordinate, ()> {
        let mut graph = UnGraph::with_capacity(self.size(), self.size());
        for coord in self.iter() {
            let _ = graph.add_node(coord);
        }
        for (a, b) in self.iter_links() {
            if let (Some(a_index), Some(b_index)) = (self.grid_coordinate_to_index(a),
                                                     self.grid_coordinate_to_index(b)) {
                let _ = graph.add_edge(NodeIndex::new(a_index), NodeIndex::new(b_index), ());
            }
        }
        graph
    }
}

#[derive(Debug, Clone)]
pub struct CellIter {
    width: usize,
    current_cell_number: usize,
    cells_count: usize,
}

impl ExactSizeIterator for CellIter {} // default impl using size_hint()
impl Iterator for CellIter {
    type Item = Cartesian2DCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_cell_number < self.cells_count {
            let x = self.current_cell_number % self.width;
            let y = self.current_cell_number / self.width;
            self.current_cell_number += 1;
            Some(Cartesian2DCoordinate::new(x as u32, y as u32))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cells_count - self.current_cell_number;
        (remaining, Some(remaining))
    }
}

pub struct LinksIter<'a> {
    grid: &'a Grid,
    cell_iter: CellIter,
    pending_south: Option<(Cartesian2DCoordinate, Cartesian2DCoordinate)>,
}

impl<'a> Iterator for LinksIter<'a> {
    type Item = (Cartesian2DCoordinate, Cartesian2DCoordinate);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(link) = self.pending_south.take() {
            return Some(link);
        }

        let grid = self.grid;
        for coord in &mut self.cell_iter {
            let east = grid.neighbour_at_direction(coord, CompassPrimary::East)
                .filter(|_| grid.is_neighbour_linked(coord, CompassPrimary::East));
            let south = grid.neighbour_at_direction(coord, CompassPrimary::South)
                .filter(|_| grid.is_neighbour_linked(coord, CompassPrimary::South));

            match (east, south) {
                (Some(e), Some(s)) => {
                    self.pending_south = Some((coord, s));
                    return Some((coord, e));
                }
                (Some(e), None) => return Some((coord, e)),
                (None, Some(s)) => return Some((coord, s)),
                (None, None) => continue,
            }
        }

        None
    }
}

impl<'a> fmt::Debug for LinksIter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LinksIter :: cell iter : {:?}", self.cell_iter)
    }
}
