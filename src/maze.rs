use std::fmt;

use error_chain::bail;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::debug;

use crate::cells::{Cartesian2DCoordinate, Cell};
use crate::errors::*;
use crate::generators::{self, RecursiveBacktracker};
use crate::grid::Grid;
use crate::masks::{Mask, TransparentMask};
use crate::renderers::{self, ExportFormat, RenderOptions, TextMode};
use crate::units::{Height, Width};

/// Configures and creates a `Maze`.
#[derive(Debug)]
pub struct MazeBuilder {
    width: Width,
    height: Height,
    mask: Option<Box<dyn Mask>>,
    randomness: u8,
    rng: Option<XorShiftRng>,
}

impl MazeBuilder {
    pub fn new(width: Width, height: Height) -> MazeBuilder {
        MazeBuilder {
            width,
            height,
            mask: None,
            randomness: 100,
            rng: None,
        }
    }

    /// Restrict carving to the mask's open cells. Without a mask every cell is open.
    pub fn mask<M: Mask + 'static>(mut self, mask: M) -> MazeBuilder {
        self.mask = Some(Box::new(mask));
        self
    }

    /// Percentage, 0 to 100.
    pub fn randomness(mut self, randomness: u8) -> MazeBuilder {
        self.randomness = randomness;
        self
    }

    /// Seed the random source so the generated maze is reproducible.
    pub fn seed(mut self, seed: u64) -> MazeBuilder {
        self.rng = Some(XorShiftRng::seed_from_u64(seed));
        self
    }

    pub fn rng(mut self, rng: XorShiftRng) -> MazeBuilder {
        self.rng = Some(rng);
        self
    }

    /// Fails if a dimension is zero, randomness is over 100, or the mask has no open cell
    /// within the maze.
    pub fn build(self) -> Result<Maze> {
        let MazeBuilder { width, height, mask, randomness, rng } = self;

        if width.0 == 0 || height.0 == 0 {
            bail!(ErrorKind::InvalidDimensions(width.0, height.0));
        }
        if randomness > 100 {
            bail!(ErrorKind::InvalidRandomness(randomness));
        }

        let mask: Box<dyn Mask> = match mask {
            Some(mask) => mask,
            None => Box::new(TransparentMask::new(width.0, height.0)),
        };
        let mut rng = rng.unwrap_or_else(|| XorShiftRng::seed_from_u64(rand::thread_rng().gen()));
        let grid = Grid::new(width, height);

        let start = generators::random_open_cell(&grid, mask.as_ref(), &mut rng)
            .ok_or_else(|| Error::from(ErrorKind::NoOpenCell(width.0, height.0)))?;
        let backtracker = RecursiveBacktracker::new(start, randomness, &mut rng);

        debug!(width = width.0, height = height.0, randomness, x = start.x, y = start.y,
               "maze created");

        Ok(Maze {
            grid,
            mask,
            rng,
            start,
            backtracker,
        })
    }

    /// Build and immediately run the generation to completion.
    pub fn generate(self) -> Result<Maze> {
        let mut maze = self.build()?;
        maze.generate();
        Ok(maze)
    }
}

/// A maze being carved, or finished, on a grid of passage bitmasks.
///
/// Generation can be driven a carve at a time with `step`; a partially generated maze is
/// always a valid grid that can be inspected or rendered.
pub struct Maze {
    grid: Grid,
    mask: Box<dyn Mask>,
    rng: XorShiftRng,
    start: Cartesian2DCoordinate,
    backtracker: RecursiveBacktracker,
}

impl fmt::Debug for Maze {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "Maze {}x{} {}",
               self.grid.width().0,
               self.grid.height().0,
               if self.is_generated() {
                   "generated"
               } else {
                   "not generated"
               })
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.grid)
    }
}

impl Maze {
    #[inline]
    pub fn width(&self) -> Width {
        self.grid.width()
    }

    #[inline]
    pub fn height(&self) -> Height {
        self.grid.height()
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn mask(&self) -> &dyn Mask {
        self.mask.as_ref()
    }

    #[inline]
    pub fn cell(&self, coord: Cartesian2DCoordinate) -> Option<Cell> {
        self.grid.cell(coord)
    }

    /// The randomly chosen open cell generation began from.
    #[inline]
    pub fn start(&self) -> Cartesian2DCoordinate {
        self.start
    }

    /// The cell the generator is currently at.
    #[inline]
    pub fn current(&self) -> Cartesian2DCoordinate {
        self.backtracker.current()
    }

    #[inline]
    pub fn randomness(&self) -> u8 {
        self.backtracker.randomness()
    }

    #[inline]
    pub fn is_generated(&self) -> bool {
        self.backtracker.is_generated()
    }

    /// Carve one passage, returning the newly entered cell. None once generation has finished.
    pub fn step(&mut self) -> Option<Cartesian2DCoordinate> {
        self.backtracker.step(&mut self.grid, self.mask.as_ref(), &mut self.rng)
    }

    /// Run generation to completion.
    pub fn generate(&mut self) {
        self.generate_with(|_| ())
    }

    /// Run generation to completion, calling `on_carve` with each newly entered cell in carve
    /// order.
    pub fn generate_with<F>(&mut self, mut on_carve: F)
        where F: FnMut(Cartesian2DCoordinate)
    {
        let mut carved = 0;
        while let Some(coord) = self.step() {
            carved += 1;
            on_carve(coord);
        }
        debug!(carved, passages = self.grid.links_count(), "maze generated");
    }

    /// One pass of dead end removal, see `generators::sparsify`. Returns the cells removed.
    pub fn sparsify(&mut self) -> usize {
        generators::sparsify(&mut self.grid)
    }

    pub fn to_text(&self, mode: TextMode) -> String {
        renderers::render_text(&self.grid, mode)
    }

    /// Render with a mode given by name, e.g. "utf8_lines".
    pub fn render(&self, mode: &str) -> Result<String> {
        let mode = mode.parse::<TextMode>()?;
        Ok(self.to_text(mode))
    }

    /// Encode the grid as an image in a format given by name, e.g. "png". Encoder failures
    /// are returned as they are.
    pub fn export(&self, format: &str, options: &RenderOptions) -> Result<Vec<u8>> {
        let format = format.parse::<ExportFormat>()?;
        renderers::export(&self.grid, format, options)
    }
}

#[cfg(test)]
mod tests {
    use petgraph::algo;
    use quickcheck::{quickcheck, TestResult};

    use super::*;
    use crate::cells::{CompassPrimary, ALL_DIRECTIONS};
    use crate::masks::BinaryMask2D;

    fn init_logging() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn assert_bidirectional(grid: &Grid) {
        for coord in grid.iter() {
            for &dir in ALL_DIRECTIONS.iter() {
                if grid.is_neighbour_linked(coord, dir) {
                    let neighbour = grid.neighbour_at_direction(coord, dir)
                        .expect("passage leads off the grid");
                    assert!(grid.is_neighbour_linked(neighbour, dir.opposite()),
                            "one way passage {} {:?}",
                            coord,
                            dir);
                }
            }
        }
    }

    fn assert_spanning_tree(maze: &Maze) {
        let grid = maze.grid();
        let reachable = maze.mask().open_region_from(maze.start(), maze.width(), maze.height());

        for coord in grid.iter() {
            let visited = grid.cell(coord).map_or(false, |c| c != 0);
            if grid.size() > 1 && reachable.len() > 1 {
                assert_eq!(visited, reachable.contains(&coord), "coverage at {}", coord);
            } else {
                assert!(!visited);
            }
        }

        assert_eq!(grid.links_count(), reachable.len() - 1);
        let graph = grid.to_graph();
        assert!(!algo::is_cyclic_undirected(&graph));
    }

    #[test]
    fn five_by_five_end_to_end() {
        init_logging();
        let maze = MazeBuilder::new(Width(5), Height(5))
            .seed(2024)
            .generate()
            .expect("maze creation failed");

        assert!(maze.is_generated());
        assert!(maze.grid().cells().iter().all(|&c| c != 0));
        assert_eq!(maze.grid().links_count(), 24);
        let passage_bits = maze.grid()
            .cells()
            .iter()
            .map(|c| c.count_ones())
            .sum::<u32>();
        assert_eq!(passage_bits, 48);
        assert_bidirectional(maze.grid());

        let lines = maze.render("utf8_lines").expect("render failed");
        assert!(lines.ends_with('\n'));
        let rows = lines.lines().collect::<Vec<_>>();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row.chars().count() == 5));
        assert!(!rows.iter().any(|row| row.contains(' ')));
    }

    #[test]
    fn generated_flag_flips_once() {
        let mut maze = MazeBuilder::new(Width(3), Height(2))
            .seed(5)
            .build()
            .expect("maze creation failed");
        let mut carves = 0;
        while maze.step().is_some() {
            carves += 1;
            assert!(!maze.is_generated());
        }
        assert_eq!(carves, 5);
        assert!(maze.is_generated());
        for _ in 0..3 {
            assert_eq!(maze.step(), None);
            assert!(maze.is_generated());
        }
    }

    #[test]
    fn partial_generation_is_inspectable() {
        let mut maze = MazeBuilder::new(Width(6), Height(6))
            .seed(77)
            .build()
            .expect("maze creation failed");
        for _ in 0..10 {
            assert!(maze.step().is_some());
        }
        assert!(!maze.is_generated());
        assert_eq!(maze.grid().links_count(), 10);
        assert_bidirectional(maze.grid());
        assert!(!algo::is_cyclic_undirected(&maze.grid().to_graph()));
        assert_eq!(maze.to_text(TextMode::SimpleAscii).lines().count(), 12);
        assert_eq!(format!("{:?}", maze), "Maze 6x6 not generated");
    }

    #[test]
    fn callback_sees_carves_in_order() {
        let mut maze = MazeBuilder::new(Width(4), Height(4))
            .seed(8)
            .build()
            .expect("maze creation failed");
        let start = maze.start();
        let mut carved = vec![];
        maze.generate_with(|coord| carved.push(coord));

        assert_eq!(carved.len(), 15);
        assert!(!carved.contains(&start));
        // every carved cell is entered from an already visited neighbour
        let mut visited = vec![start];
        for coord in &carved {
            let entered_from_visited = ALL_DIRECTIONS.iter().any(|&dir| {
                maze.grid()
                    .neighbour_at_direction(*coord, dir)
                    .map_or(false, |n| {
                        visited.contains(&n) && maze.grid().is_neighbour_linked(*coord, dir)
                    })
            });
            assert!(entered_from_visited, "{} entered from nowhere", coord);
            visited.push(*coord);
        }
        assert_eq!(format!("{:?}", maze), "Maze 4x4 generated");
    }

    #[test]
    fn same_seed_same_maze() {
        let build = |seed| {
            MazeBuilder::new(Width(8), Height(5))
                .seed(seed)
                .randomness(40)
                .generate()
                .expect("maze creation failed")
        };
        assert_eq!(build(99).grid(), build(99).grid());
        assert_eq!(build(99).start(), build(99).start());
    }

    #[test]
    fn masked_maze_covers_only_its_region() {
        let mask = BinaryMask2D::from_text("\
...X...
...X...
XXXXXXX
.......");
        for seed in 0..10 {
            let maze = MazeBuilder::new(Width(7), Height(4))
                .mask(mask.clone())
                .seed(seed)
                .generate()
                .expect("maze creation failed");
            assert_spanning_tree(&maze);
            for x in 0..7 {
                assert_eq!(maze.cell(Cartesian2DCoordinate::new(x, 2)), Some(0));
            }
            let region = maze.mask().open_region_from(maze.start(), Width(7), Height(4));
            assert!(region.len() == 6 || region.len() == 7);
        }
    }

    #[test]
    fn mask_larger_than_maze_is_clipped() {
        let mask = BinaryMask2D::from_text(".........\n.........\n.........");
        let maze = MazeBuilder::new(Width(3), Height(2))
            .mask(mask)
            .seed(4)
            .generate()
            .expect("maze creation failed");
        assert!(maze.grid().cells().iter().all(|&c| c != 0));
        assert_eq!(maze.grid().links_count(), 5);
    }

    #[test]
    fn construction_errors() {
        let kind_of = |result: Result<Maze>| result.err().map(|e| e.kind().to_string());

        assert_eq!(kind_of(MazeBuilder::new(Width(0), Height(3)).build()),
                   Some(ErrorKind::InvalidDimensions(0, 3).to_string()));
        assert_eq!(kind_of(MazeBuilder::new(Width(3), Height(3)).randomness(101).build()),
                   Some(ErrorKind::InvalidRandomness(101).to_string()));
        assert_eq!(kind_of(MazeBuilder::new(Width(2), Height(2))
                       .mask(BinaryMask2D::from_text("XX\nXX\n"))
                       .build()),
                   Some(ErrorKind::NoOpenCell(2, 2).to_string()));
        // open cells outside the maze rectangle do not count
        assert_eq!(kind_of(MazeBuilder::new(Width(2), Height(1))
                       .mask(BinaryMask2D::from_text("XX.\n..."))
                       .build()),
                   Some(ErrorKind::NoOpenCell(2, 1).to_string()));
    }

    #[test]
    fn bogus_render_mode_leaves_grid_alone() {
        let maze = MazeBuilder::new(Width(4), Height(3))
            .seed(12)
            .generate()
            .expect("maze creation failed");
        let before = maze.grid().clone();
        let err = maze.render("bogus").expect_err("bogus mode rendered");
        match *err.kind() {
            ErrorKind::UnknownRenderMode(ref mode) => assert_eq!(mode, "bogus"),
            ref other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(maze.grid(), &before);
        assert_eq!(maze.render("simple_ascii").ok(), Some(maze.to_string()));
    }

    #[test]
    fn export_by_name() {
        let maze = MazeBuilder::new(Width(3), Height(3))
            .seed(1)
            .generate()
            .expect("maze creation failed");
        let bytes = maze.export("png", &RenderOptions::default()).expect("export failed");
        let image = image::load_from_memory(&bytes).expect("png did not decode").to_rgba8();
        assert_eq!((image.width(), image.height()), (31, 31));

        let err = maze.export("bmp", &RenderOptions::default()).expect_err("bmp exported");
        match *err.kind() {
            ErrorKind::UnknownExportFormat(ref format) => assert_eq!(format, "bmp"),
            ref other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn sparsify_through_maze() {
        let mut maze = MazeBuilder::new(Width(6), Height(6))
            .seed(31)
            .generate()
            .expect("maze creation failed");
        let dead_ends = maze.grid()
            .cells()
            .iter()
            .filter(|&&c| CompassPrimary::from_single_bit(c).is_some())
            .count();
        assert!(dead_ends >= 2);
        assert_eq!(maze.sparsify(), dead_ends);
        assert_bidirectional(maze.grid());
        assert_eq!(maze.grid().cells().iter().filter(|&&c| c == 0).count(), dead_ends);
    }

    #[test]
    fn generated_mazes_are_spanning_trees() {
        fn prop(width: u8, height: u8, randomness: u8, seed: u64) -> TestResult {
            let (w, h) = (width as usize % 9, height as usize % 9);
            if w == 0 || h == 0 {
                return TestResult::discard();
            }
            let maze = MazeBuilder::new(Width(w), Height(h))
                .randomness(randomness % 101)
                .seed(seed)
                .generate()
                .expect("maze creation failed");

            assert_bidirectional(maze.grid());
            assert_spanning_tree(&maze);
            TestResult::from_bool(maze.is_generated() &&
                                  maze.grid().links_count() == w * h - 1)
        }
        quickcheck(prop as fn(u8, u8, u8, u64) -> TestResult);
    }

    #[test]
    fn masked_mazes_never_leave_the_mask() {
        fn prop(rows: Vec<Vec<bool>>, seed: u64) -> TestResult {
            let rows = rows.into_iter().take(8).map(|r| r.into_iter().take(8).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            let mask = BinaryMask2D::from_rows(rows);
            let (w, h) = (mask.width, mask.height);
            if w == 0 || h == 0 || mask.first_open_within(Width(w), Height(h)).is_none() {
                return TestResult::discard();
            }
            let maze = MazeBuilder::new(Width(w), Height(h))
                .mask(mask)
                .seed(seed)
                .generate()
                .expect("maze creation failed");

            assert_bidirectional(maze.grid());
            assert_spanning_tree(&maze);
            let leaked = maze.grid().iter().any(|c| {
                maze.cell(c).map_or(false, |bits| bits != 0) &&
                !maze.mask().contains(c.x as isize, c.y as isize)
            });
            TestResult::from_bool(!leaked)
        }
        quickcheck(prop as fn(Vec<Vec<bool>>, u64) -> TestResult);
    }
}
