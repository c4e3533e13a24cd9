use std::convert::From;
use std::fmt;

use smallvec::SmallVec;

/// A grid cell: one passage bit per `CompassPrimary` direction, 0 when walled off on all sides.
pub type Cell = u8;

pub const NORTH: Cell = 0x01;
pub const SOUTH: Cell = 0x02;
pub const EAST: Cell = 0x04;
pub const WEST: Cell = 0x08;

/// Retry queues never hold more than the four compass directions.
pub type DirectionSmallVec = SmallVec<[CompassPrimary; 4]>;

#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Ord, PartialOrd)]
pub struct Cartesian2DCoordinate {
    pub x: u32,
    pub y: u32,
}

impl Cartesian2DCoordinate {
    pub fn new(x: u32, y: u32) -> Cartesian2DCoordinate {
        Cartesian2DCoordinate { x, y }
    }
}

impl From<(u32, u32)> for Cartesian2DCoordinate {
    fn from(x_y_pair: (u32, u32)) -> Cartesian2DCoordinate {
        Cartesian2DCoordinate::new(x_y_pair.0, x_y_pair.1)
    }
}

impl fmt::Display for Cartesian2DCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug)]
pub enum CompassPrimary {
    North,
    South,
    East,
    West,
}

pub const ALL_DIRECTIONS: [CompassPrimary; 4] = [CompassPrimary::North,
                                                 CompassPrimary::South,
                                                 CompassPrimary::East,
                                                 CompassPrimary::West];

impl CompassPrimary {
    /// The passage bit this direction sets in a `Cell`.
    #[inline]
    pub fn bit(self) -> Cell {
        match self {
            CompassPrimary::North => NORTH,
            CompassPrimary::South => SOUTH,
            CompassPrimary::East => EAST,
            CompassPrimary::West => WEST,
        }
    }

    #[inline]
    pub fn opposite(self) -> CompassPrimary {
        match self {
            CompassPrimary::North => CompassPrimary::South,
            CompassPrimary::South => CompassPrimary::North,
            CompassPrimary::East => CompassPrimary::West,
            CompassPrimary::West => CompassPrimary::East,
        }
    }

    /// (dx, dy) with y growing southwards.
    #[inline]
    pub fn delta(self) -> (isize, isize) {
        match self {
            CompassPrimary::North => (0, -1),
            CompassPrimary::South => (0, 1),
            CompassPrimary::East => (1, 0),
            CompassPrimary::West => (-1, 0),
        }
    }

    /// The direction whose bit is exactly `cell`, if `cell` holds a single passage.
    pub fn from_single_bit(cell: Cell) -> Option<CompassPrimary> {
        match cell {
            NORTH => Some(CompassPrimary::North),
            SOUTH => Some(CompassPrimary::South),
            EAST => Some(CompassPrimary::East),
            WEST => Some(CompassPrimary::West),
            _ => None,
        }
    }
}

/// Creates a new coordinate offset 1 cell away in the given direction.
/// Returns None if the coordinate would go negative; the upper bound is the grid's business.
pub fn offset_coordinate(coord: Cartesian2DCoordinate,
                         dir: CompassPrimary)
                         -> Option<Cartesian2DCoordinate> {
    let (x, y) = (coord.x, coord.y);
    match dir {
        CompassPrimary::North => {
            if y > 0 {
                Some(Cartesian2DCoordinate::new(x, y - 1))
            } else {
                None
            }
        }
        CompassPrimary::South => y.checked_add(1).map(|y| Cartesian2DCoordinate::new(x, y)),
        CompassPrimary::East => x.checked_add(1).map(|x| Cartesian2DCoordinate::new(x, y)),
        CompassPrimary::West => {
            if x > 0 {
                Some(Cartesian2DCoordinate::new(x - 1, y))
            } else {
                None
            }
        }
    }
}

/// Is there a passage from a cell with these bits towards `dir`?
#[inline]
pub fn has_passage(cell: Cell, dir: CompassPrimary) -> bool {
    cell & dir.bit() != 0
}
