use crate::community::{CommunityId, Position};
use rand::Rng;
use std::{error::Error, fmt};

/// Random probes tried before `place_random_unique` scans for free cells.
const MAX_PLACEMENT_PROBES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    OccupiedCell {
        position: Position,
        occupant: CommunityId,
    },
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },
    NoFreeCell,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::OccupiedCell { position, occupant } => {
                write!(f, "cell {position:?} is already occupied by community {occupant}")
            }
            GridError::OutOfBounds {
                position,
                width,
                height,
            } => write!(f, "cell {position:?} is outside the {width}x{height} grid"),
            GridError::NoFreeCell => write!(f, "no free cell available"),
        }
    }
}

impl Error for GridError {}

/// Fixed, non-wrapping 2D lattice with single occupancy per cell.
#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Option<CommunityId>>,
    occupied: usize,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
            occupied: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    /// Lattice midpoint, using integer division on each axis.
    pub fn center(&self) -> Position {
        [self.width / 2, self.height / 2]
    }

    fn index(&self, position: Position) -> Result<usize, GridError> {
        let [x, y] = position;
        if x >= self.width || y >= self.height {
            return Err(GridError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y * self.width + x)
    }

    fn position_of(&self, idx: usize) -> Position {
        [idx % self.width, idx / self.width]
    }

    pub fn occupant(&self, position: Position) -> Option<CommunityId> {
        self.index(position).ok().and_then(|idx| self.cells[idx])
    }

    pub fn place(&mut self, id: CommunityId, position: Position) -> Result<(), GridError> {
        let idx = self.index(position)?;
        if let Some(occupant) = self.cells[idx] {
            return Err(GridError::OccupiedCell { position, occupant });
        }
        self.cells[idx] = Some(id);
        self.occupied += 1;
        Ok(())
    }

    /// Place `id` at a uniformly random empty cell and return that cell.
    ///
    /// Occupied probes are retried; after `MAX_PLACEMENT_PROBES` misses the
    /// choice is made uniformly among the remaining free cells instead.
    pub fn place_random_unique<R: Rng + ?Sized>(
        &mut self,
        id: CommunityId,
        rng: &mut R,
    ) -> Result<Position, GridError> {
        if self.occupied >= self.cells.len() {
            return Err(GridError::NoFreeCell);
        }
        for _ in 0..MAX_PLACEMENT_PROBES {
            let position = [
                rng.random_range(0..self.width),
                rng.random_range(0..self.height),
            ];
            match self.place(id, position) {
                Ok(()) => return Ok(position),
                Err(GridError::OccupiedCell { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            id,
            occupied = self.occupied,
            capacity = self.cells.len(),
            "random placement kept hitting occupied cells; scanning free cells"
        );
        let free: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.is_none().then_some(idx))
            .collect();
        let idx = free[rng.random_range(0..free.len())];
        let position = self.position_of(idx);
        self.place(id, position)?;
        Ok(position)
    }

    /// Empty a cell, returning its former occupant.
    pub fn vacate(&mut self, position: Position) -> Option<CommunityId> {
        let idx = self.index(position).ok()?;
        let previous = self.cells[idx].take();
        if previous.is_some() {
            self.occupied -= 1;
        }
        previous
    }

    pub(crate) fn occupied_within(
        &self,
        position: Position,
        radius: usize,
    ) -> impl Iterator<Item = (Position, CommunityId)> + '_ {
        let [cx, cy] = position;
        let x_range = cx.saturating_sub(radius)..=cx.saturating_add(radius).min(self.width - 1);
        let y_range = cy.saturating_sub(radius)..=cy.saturating_add(radius).min(self.height - 1);
        y_range.flat_map(move |y| {
            x_range.clone().filter_map(move |x| {
                if x == cx && y == cy {
                    return None;
                }
                self.cells[y * self.width + x].map(|id| ([x, y], id))
            })
        })
    }

    /// Occupied cells within Chebyshev distance `radius` of `position`,
    /// excluding `position` itself. No wraparound at the borders.
    pub fn neighbors(&self, position: Position, radius: usize) -> Vec<Position> {
        self.occupied_within(position, radius)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Occupants of the cells returned by [`Grid::neighbors`].
    pub fn neighbor_ids(&self, position: Position, radius: usize) -> Vec<CommunityId> {
        self.occupied_within(position, radius)
            .map(|(_, id)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn full_grid(width: usize, height: usize) -> Grid {
        let mut grid = Grid::new(width, height);
        let mut id = 1;
        for y in 0..height {
            for x in 0..width {
                grid.place(id, [x, y]).unwrap();
                id += 1;
            }
        }
        grid
    }

    #[test]
    fn interior_cell_has_moore_neighborhood() {
        let grid = full_grid(5, 5);
        assert_eq!(grid.neighbors([2, 2], 1).len(), 8);
        assert!(!grid.neighbors([2, 2], 1).contains(&[2, 2]));
    }

    #[test]
    fn border_cells_do_not_wrap() {
        let grid = full_grid(5, 5);
        assert_eq!(grid.neighbors([0, 0], 1).len(), 3);
        assert_eq!(grid.neighbors([4, 2], 1).len(), 5);
        assert_eq!(grid.neighbors([4, 4], 1).len(), 3);
    }

    #[test]
    fn larger_radius_uses_chebyshev_distance() {
        let grid = full_grid(7, 7);
        assert_eq!(grid.neighbors([3, 3], 2).len(), 24);
    }

    #[test]
    fn empty_cells_are_not_neighbors() {
        let mut grid = Grid::new(3, 3);
        grid.place(1, [1, 1]).unwrap();
        assert!(grid.neighbors([1, 1], 1).is_empty());
        grid.place(2, [0, 0]).unwrap();
        assert_eq!(grid.neighbors([1, 1], 1), vec![[0, 0]]);
        assert_eq!(grid.neighbor_ids([1, 1], 1), vec![2]);
    }

    #[test]
    fn place_rejects_occupied_cell() {
        let mut grid = Grid::new(2, 2);
        grid.place(1, [1, 0]).unwrap();
        assert_eq!(
            grid.place(2, [1, 0]),
            Err(GridError::OccupiedCell {
                position: [1, 0],
                occupant: 1
            })
        );
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn place_rejects_out_of_bounds() {
        let mut grid = Grid::new(2, 2);
        assert!(matches!(
            grid.place(1, [2, 0]),
            Err(GridError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn random_placement_fills_grid_without_collisions() {
        let mut grid = Grid::new(6, 4);
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let mut seen = std::collections::HashSet::new();
        for id in 1..=24 {
            let pos = grid.place_random_unique(id, &mut rng).unwrap();
            assert!(seen.insert(pos));
            assert_eq!(grid.occupant(pos), Some(id));
        }
        assert_eq!(grid.occupied_count(), 24);
        assert_eq!(
            grid.place_random_unique(25, &mut rng),
            Err(GridError::NoFreeCell)
        );
    }

    #[test]
    fn vacate_frees_cell() {
        let mut grid = Grid::new(2, 2);
        grid.place(7, [0, 1]).unwrap();
        assert_eq!(grid.vacate([0, 1]), Some(7));
        assert_eq!(grid.vacate([0, 1]), None);
        assert_eq!(grid.occupied_count(), 0);
        grid.place(8, [0, 1]).unwrap();
    }

    #[test]
    fn center_uses_integer_midpoint() {
        assert_eq!(Grid::new(50, 50).center(), [25, 25]);
        assert_eq!(Grid::new(5, 4).center(), [2, 2]);
        assert_eq!(Grid::new(1, 1).center(), [0, 0]);
    }
}
