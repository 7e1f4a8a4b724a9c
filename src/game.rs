//! Game state: grid, falling piece, gravity, line clears, scoring.

use crate::shapes::{ShapeMatrix, Tetromino};
use std::collections::VecDeque;

pub const GRID_WIDTH: usize = 10;
pub const GRID_HEIGHT: usize = 20;

/// Seconds per cell at level 1.
const INITIAL_FALL_INTERVAL: f64 = 0.5;
/// Speed floor: seconds per cell at level 10 and beyond.
const MIN_FALL_INTERVAL: f64 = 0.05;
/// Speed-up per level.
const FALL_SPEEDUP_PER_LEVEL: f64 = 0.05;
/// Cleared lines per level-up.
const LINES_PER_LEVEL: u32 = 10;
/// Base points for clearing 1..=4 rows at once, scaled by level.
const CLEAR_SCORES: [u32; 4] = [100, 300, 500, 800];

/// Single cell: empty or a locked block of a given tetromino kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Block(Tetromino),
}

/// Playfield of locked cells. Row 0 is the top; rows are always
/// GRID_WIDTH wide and there are always GRID_HEIGHT of them.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: VecDeque<Vec<Cell>>,
}

impl Grid {
    pub fn new() -> Self {
        let rows = (0..GRID_HEIGHT)
            .map(|_| vec![Cell::Empty; GRID_WIDTH])
            .collect();
        Self { rows }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.rows[row][col]
    }

    /// Bounds are the caller's responsibility; the collision routine
    /// checks them before querying.
    #[inline]
    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        matches!(self.rows[row][col], Cell::Block(_))
    }

    fn set(&mut self, row: usize, col: usize, kind: Tetromino) {
        self.rows[row][col] = Cell::Block(kind);
    }

    /// Ascending indices of fully-occupied rows.
    pub fn full_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|c| matches!(c, Cell::Block(_))))
            .map(|(i, _)| i)
            .collect()
    }

    /// Remove each indexed row and insert a fresh empty row at the top.
    /// `indices` must be ascending: removing row i and prepending keeps
    /// every later index valid, so multiple simultaneous clears are safe.
    pub fn clear_rows(&mut self, indices: &[usize]) {
        for &i in indices {
            self.rows.remove(i);
            self.rows.push_front(vec![Cell::Empty; GRID_WIDTH]);
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

/// Current piece: kind, post-rotation matrix, and bounding-box origin on
/// the grid. `y` may be negative while the piece is above the visible top.
#[derive(Debug, Clone)]
pub struct Piece {
    pub kind: Tetromino,
    pub matrix: ShapeMatrix,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    /// New piece at spawn position: horizontally centred, y = 0.
    pub fn spawn(kind: Tetromino) -> Self {
        let matrix = kind.base_matrix();
        let x = (GRID_WIDTH / 2) as i32 - (matrix[0].len() / 2) as i32;
        Self { kind, matrix, x, y: 0 }
    }

    /// Matrix rotated 90° clockwise: transpose with row order reversed.
    /// Pure; dimensions swap. O is visually invariant, the rest cycle.
    pub fn rotated(&self) -> ShapeMatrix {
        let h = self.matrix.len();
        let w = self.matrix[0].len();
        (0..w)
            .map(|i| (0..h).map(|j| self.matrix[h - 1 - j][i]).collect())
            .collect()
    }

    /// Collision test for a hypothetical position/orientation against a
    /// borrowed grid. Horizontal bounds always apply; rows above the
    /// visible top are exempt from the occupancy check only.
    pub fn collides(x: i32, y: i32, matrix: &ShapeMatrix, grid: &Grid) -> bool {
        for (i, row) in matrix.iter().enumerate() {
            for (j, &filled) in row.iter().enumerate() {
                if !filled {
                    continue;
                }
                let r = y + i as i32;
                let c = x + j as i32;
                if r >= GRID_HEIGHT as i32 || c < 0 || c >= GRID_WIDTH as i32 {
                    return true;
                }
                if r >= 0 && grid.is_occupied(r as usize, c as usize) {
                    return true;
                }
            }
        }
        false
    }
}

/// Uniform random piece selection (plain LCG, no bag).
#[derive(Debug, Clone)]
pub struct PieceRng {
    state: u32,
}

impl PieceRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from the system clock.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos().wrapping_add(d.as_secs() as u32))
            .unwrap_or(0x1234_5678);
        Self::new(nanos)
    }

    fn next_rand(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        self.state >> 16
    }

    pub fn next_kind(&mut self) -> Tetromino {
        Tetromino::ALL[(self.next_rand() % 7) as usize]
    }
}

/// Game state: grid, current and next piece, score, level, gravity clock.
///
/// All commands are total: illegal moves return false (or no-op) and leave
/// state unchanged. Game over is a terminal state; restart by constructing
/// a fresh `GameState`.
#[derive(Debug)]
pub struct GameState {
    grid: Grid,
    piece: Piece,
    next: Piece,
    rng: PieceRng,
    score: u32,
    level: u32,
    lines_cleared: u32,
    /// Seconds per cell, derived from level.
    fall_interval: f64,
    /// Accumulates frame dt; each full interval is one gravity step.
    fall_timer: f64,
    game_over: bool,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_rng(PieceRng::from_entropy())
    }

    pub fn with_rng(mut rng: PieceRng) -> Self {
        let piece = Piece::spawn(rng.next_kind());
        let next = Piece::spawn(rng.next_kind());
        Self {
            grid: Grid::new(),
            piece,
            next,
            rng,
            score: 0,
            level: 1,
            lines_cleared: 0,
            fall_interval: INITIAL_FALL_INTERVAL,
            fall_timer: 0.0,
            game_over: false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    pub fn next_piece(&self) -> &Piece {
        &self.next
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn fall_interval(&self) -> f64 {
        self.fall_interval
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Move the piece by (dx, dy) if the target position is free.
    pub fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        if self.game_over {
            return false;
        }
        if Piece::collides(self.piece.x + dx, self.piece.y + dy, &self.piece.matrix, &self.grid) {
            return false;
        }
        self.piece.x += dx;
        self.piece.y += dy;
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.try_move(-1, 0)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_move(1, 0)
    }

    /// Drop one row. A failed soft drop does not lock; gravity does that.
    pub fn soft_drop(&mut self) -> bool {
        self.try_move(0, 1)
    }

    /// Rotate clockwise in place. Origin is unchanged and there is no wall
    /// kick: rotations that would need a nudge are rejected.
    pub fn try_rotate(&mut self) -> bool {
        if self.game_over {
            return false;
        }
        let rotated = self.piece.rotated();
        if Piece::collides(self.piece.x, self.piece.y, &rotated, &self.grid) {
            return false;
        }
        self.piece.matrix = rotated;
        true
    }

    /// Fall to the lowest legal position and lock immediately.
    pub fn hard_drop(&mut self) {
        if self.game_over {
            return;
        }
        while self.try_move(0, 1) {}
        self.lock();
    }

    /// Advance the gravity clock by `dt` seconds. Each elapsed interval is
    /// one downward step; a blocked step locks the piece and stops
    /// consuming intervals for this call (at most one lock per tick).
    pub fn tick(&mut self, dt: f64) {
        if self.game_over {
            return;
        }
        self.fall_timer += dt;
        while self.fall_timer >= self.fall_interval {
            self.fall_timer -= self.fall_interval;
            if !self.try_move(0, 1) {
                self.lock();
                break;
            }
        }
    }

    /// Write the piece into the grid, clear lines, advance to the next
    /// piece. A piece locking with cells still above the visible top means
    /// the stack has reached the ceiling: the visible cells are written and
    /// scored, then the game ends instead of spawning.
    fn lock(&mut self) {
        let mut above_top = false;
        for (i, row) in self.piece.matrix.iter().enumerate() {
            for (j, &filled) in row.iter().enumerate() {
                if !filled {
                    continue;
                }
                let r = self.piece.y + i as i32;
                if r < 0 {
                    above_top = true;
                    continue;
                }
                self.grid.set(r as usize, (self.piece.x + j as i32) as usize, self.piece.kind);
            }
        }
        self.clear_lines();
        if above_top {
            self.game_over = true;
            return;
        }
        self.spawn_next();
    }

    /// Clear full rows and update score, lines, level and fall speed.
    /// The score for a clear uses the level it was achieved at.
    fn clear_lines(&mut self) {
        let full = self.grid.full_rows();
        if full.is_empty() {
            return;
        }
        let n = full.len() as u32;
        self.grid.clear_rows(&full);
        self.score += CLEAR_SCORES[(n as usize - 1).min(3)] * self.level;
        self.lines_cleared += n;
        self.level = self.lines_cleared / LINES_PER_LEVEL + 1;
        self.fall_interval = fall_interval_for_level(self.level);
    }

    /// Promote the buffered piece and draw a fresh one. A spawn that
    /// already collides is game over, with no grid mutation.
    fn spawn_next(&mut self) {
        self.piece = std::mem::replace(&mut self.next, Piece::spawn(self.rng.next_kind()));
        if Piece::collides(self.piece.x, self.piece.y, &self.piece.matrix, &self.grid) {
            self.game_over = true;
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Seconds per cell for a level: 0.5 at level 1, 0.05 faster per level,
/// floored at 0.05.
pub fn fall_interval_for_level(level: u32) -> f64 {
    (INITIAL_FALL_INTERVAL - f64::from(level - 1) * FALL_SPEEDUP_PER_LEVEL).max(MIN_FALL_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> GameState {
        GameState::with_rng(PieceRng::new(42))
    }

    fn matrix(rows: &[&[u8]]) -> ShapeMatrix {
        rows.iter()
            .map(|row| row.iter().map(|&c| c != 0).collect())
            .collect()
    }

    fn fill_row(grid: &mut Grid, row: usize, except: &[usize]) {
        for col in 0..GRID_WIDTH {
            if !except.contains(&col) {
                grid.set(row, col, Tetromino::O);
            }
        }
    }

    fn occupied_count(grid: &Grid) -> usize {
        (0..GRID_HEIGHT)
            .flat_map(|r| (0..GRID_WIDTH).map(move |c| (r, c)))
            .filter(|&(r, c)| grid.is_occupied(r, c))
            .count()
    }

    #[test]
    fn test_spawn_centering() {
        let i = Piece::spawn(Tetromino::I);
        assert_eq!((i.x, i.y), (3, 0)); // cols 3..=6
        let o = Piece::spawn(Tetromino::O);
        assert_eq!((o.x, o.y), (4, 0));
        let t = Piece::spawn(Tetromino::T);
        assert_eq!((t.x, t.y), (4, 0));
    }

    #[test]
    fn test_rotation_dimensions_swap() {
        let t = Piece::spawn(Tetromino::T);
        let r = t.rotated();
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].len(), 2);
        assert_eq!(r, matrix(&[&[0, 1], &[1, 1], &[0, 1]]));
    }

    #[test]
    fn test_rotate_o_invariant() {
        let o = Piece::spawn(Tetromino::O);
        assert_eq!(o.rotated(), o.matrix);
    }

    #[test]
    fn test_rotate_i_cycles() {
        let mut p = Piece::spawn(Tetromino::I);
        let base = p.matrix.clone();
        p.matrix = p.rotated();
        assert_eq!(p.matrix, matrix(&[&[1], &[1], &[1], &[1]]));
        p.matrix = p.rotated();
        // Two rotations: congruent with the original.
        assert_eq!(p.matrix, base);
        let first = matrix(&[&[1], &[1], &[1], &[1]]);
        p.matrix = p.rotated();
        p.matrix = p.rotated();
        p.matrix = p.rotated();
        assert_eq!(p.matrix, first);
    }

    #[test]
    fn test_collision_bounds() {
        let grid = Grid::new();
        let m = Tetromino::I.base_matrix();
        assert!(Piece::collides(-1, 0, &m, &grid)); // off the left edge
        assert!(Piece::collides(7, 0, &m, &grid)); // cols 7..=10, off the right
        assert!(!Piece::collides(6, 0, &m, &grid));
        assert!(!Piece::collides(3, 19, &m, &grid)); // bottom row is fine
        assert!(Piece::collides(3, 20, &m, &grid)); // below the floor
    }

    #[test]
    fn test_collision_above_top_skips_occupancy_not_walls() {
        let grid = Grid::new();
        let m = Tetromino::I.base_matrix();
        // Negative row: exempt from the occupancy check on an empty grid.
        assert!(!Piece::collides(3, -1, &m, &grid));
        // But horizontal bounds still apply above the top.
        assert!(Piece::collides(-1, -1, &m, &grid));
        assert!(Piece::collides(7, -1, &m, &grid));
    }

    #[test]
    fn test_collision_with_locked_cells() {
        let mut grid = Grid::new();
        grid.set(19, 4, Tetromino::Z);
        let m = Tetromino::I.base_matrix();
        assert!(Piece::collides(3, 19, &m, &grid));
        assert!(!Piece::collides(3, 18, &m, &grid));
        // A sub-cell above the top ignores occupancy; one at row 0 does not.
        let tall = matrix(&[&[1], &[1]]);
        grid.set(0, 0, Tetromino::Z);
        assert!(Piece::collides(0, -1, &tall, &grid)); // bottom sub-cell hits (0,0)
        assert!(!Piece::collides(1, -1, &tall, &grid));
    }

    #[test]
    fn test_full_rows_ascending() {
        let mut grid = Grid::new();
        fill_row(&mut grid, 19, &[]);
        fill_row(&mut grid, 17, &[]);
        fill_row(&mut grid, 18, &[0]);
        assert_eq!(grid.full_rows(), vec![17, 19]);
    }

    #[test]
    fn test_clear_rows_preserves_shape_and_order() {
        let mut grid = Grid::new();
        fill_row(&mut grid, 17, &[]);
        fill_row(&mut grid, 19, &[]);
        // Marker row between the two cleared rows.
        grid.set(18, 0, Tetromino::L);
        grid.clear_rows(&[17, 19]);
        assert_eq!(grid.rows.len(), GRID_HEIGHT);
        assert!(grid.rows.iter().all(|r| r.len() == GRID_WIDTH));
        // The marker survives, shifted down past the cleared row above it.
        assert!(grid.is_occupied(19, 0));
        assert_eq!(occupied_count(&grid), 1);
    }

    #[test]
    fn test_clear_adjacent_rows() {
        let mut grid = Grid::new();
        fill_row(&mut grid, 18, &[]);
        fill_row(&mut grid, 19, &[]);
        grid.set(16, 3, Tetromino::S);
        let full = grid.full_rows();
        grid.clear_rows(&full);
        assert!(grid.is_occupied(18, 3));
        assert_eq!(occupied_count(&grid), 1);
    }

    #[test]
    fn test_scoring_table() {
        for (k, &base) in CLEAR_SCORES.iter().enumerate() {
            let mut state = seeded();
            for row in (GRID_HEIGHT - k - 1)..GRID_HEIGHT {
                fill_row(&mut state.grid, row, &[]);
            }
            state.clear_lines();
            assert_eq!(state.score, base);
            assert_eq!(state.lines_cleared, (k + 1) as u32);
        }
    }

    #[test]
    fn test_score_uses_level_at_time_of_clear() {
        let mut state = seeded();
        state.level = 3;
        fill_row(&mut state.grid, 19, &[]);
        state.clear_lines();
        // 100 * level 3; level then recomputes from lines (back to 1).
        assert_eq!(state.score, 300);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn test_no_clear_no_score() {
        let mut state = seeded();
        fill_row(&mut state.grid, 19, &[9]);
        state.clear_lines();
        assert_eq!(state.score, 0);
        assert_eq!(state.lines_cleared, 0);
    }

    #[test]
    fn test_leveling_and_speed_curve() {
        let mut state = seeded();
        state.lines_cleared = 9;
        fill_row(&mut state.grid, 19, &[]);
        state.clear_lines();
        assert_eq!(state.lines_cleared, 10);
        assert_eq!(state.level, 2);
        assert!((state.fall_interval - 0.45).abs() < 1e-9);

        assert!((fall_interval_for_level(1) - 0.5).abs() < 1e-9);
        assert!((fall_interval_for_level(10) - 0.05).abs() < 1e-9);
        // Level keeps rising past 10 but speed is floored.
        assert!((fall_interval_for_level(11) - 0.05).abs() < 1e-9);
        assert!((fall_interval_for_level(42) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_game_over_on_spawn_collision() {
        let mut state = seeded();
        fill_row(&mut state.grid, 0, &[]);
        fill_row(&mut state.grid, 1, &[]);
        let before = occupied_count(&state.grid);
        state.spawn_next();
        assert!(state.is_game_over());
        assert_eq!(occupied_count(&state.grid), before);
    }

    #[test]
    fn test_lock_above_top_ends_game() {
        let mut state = seeded();
        // Vertical I straddling the top edge: rows -2..=1 in column 0.
        state.piece = Piece {
            kind: Tetromino::I,
            matrix: matrix(&[&[1], &[1], &[1], &[1]]),
            x: 0,
            y: -2,
        };
        state.lock();
        assert!(state.is_game_over());
        // Visible cells were written; the off-grid ones were not.
        assert!(state.grid.is_occupied(0, 0));
        assert!(state.grid.is_occupied(1, 0));
        assert_eq!(occupied_count(&state.grid), 2);
    }

    #[test]
    fn test_hard_drop_i_piece_no_clear() {
        let mut state = seeded();
        state.piece = Piece::spawn(Tetromino::I);
        state.hard_drop();
        for col in 3..=6 {
            assert!(state.grid.is_occupied(19, col));
        }
        for col in [0, 1, 2, 7, 8, 9] {
            assert!(!state.grid.is_occupied(19, col));
        }
        assert_eq!(state.score, 0);
        assert_eq!(state.lines_cleared, 0);
        assert!(!state.is_game_over());
    }

    #[test]
    fn test_lock_completing_a_row_clears_it() {
        let mut state = seeded();
        fill_row(&mut state.grid, 19, &[9]);
        // Vertical I against the right wall; its bottom cell fills (19, 9).
        state.piece = Piece {
            kind: Tetromino::I,
            matrix: matrix(&[&[1], &[1], &[1], &[1]]),
            x: 9,
            y: 16,
        };
        assert_eq!(state.grid.full_rows(), Vec::<usize>::new());
        state.hard_drop();
        assert_eq!(state.score, 100);
        assert_eq!(state.lines_cleared, 1);
        // Row 19 cleared; the rest of the I shifted down one row.
        assert!(state.grid.is_occupied(19, 9));
        assert!(state.grid.is_occupied(17, 9));
        assert!(!state.grid.is_occupied(19, 0));
        assert_eq!(occupied_count(&state.grid), 3);
    }

    #[test]
    fn test_tick_subtracts_interval() {
        let mut state = seeded();
        let y0 = state.piece.y;
        state.tick(0.3);
        assert_eq!(state.piece.y, y0);
        state.tick(0.3);
        assert_eq!(state.piece.y, y0 + 1);
        // Subtract-interval policy: the 0.1 s remainder carries over.
        assert!((state.fall_timer - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_tick_multiple_intervals_multiple_steps() {
        let mut state = seeded();
        let y0 = state.piece.y;
        state.tick(1.6);
        assert_eq!(state.piece.y, y0 + 3);
    }

    #[test]
    fn test_tick_locks_at_most_once() {
        let mut state = seeded();
        state.piece = Piece::spawn(Tetromino::O);
        state.piece.y = 18; // resting on the floor
        state.tick(5.0);
        assert_eq!(occupied_count(&state.grid), 4);
        assert_eq!(state.piece.y, 0); // fresh spawn, not ticked further
        assert!(!state.is_game_over());
    }

    #[test]
    fn test_rotation_rejected_at_wall() {
        let mut state = seeded();
        state.piece = Piece::spawn(Tetromino::I);
        assert!(state.try_rotate()); // horizontal -> vertical, in the open
        state.piece.x = 9;
        state.piece.y = 5;
        let before = state.piece.matrix.clone();
        // Vertical I at the right wall: no kick, so rotation is rejected.
        assert!(!state.try_rotate());
        assert_eq!(state.piece.matrix, before);
    }

    #[test]
    fn test_commands_rejected_after_game_over() {
        let mut state = seeded();
        state.game_over = true;
        let (x0, y0) = (state.piece.x, state.piece.y);
        assert!(!state.try_move(-1, 0));
        assert!(!state.try_rotate());
        state.hard_drop();
        state.tick(10.0);
        assert_eq!((state.piece.x, state.piece.y), (x0, y0));
        assert_eq!(occupied_count(&state.grid), 0);
    }

    #[test]
    fn test_rng_hits_every_kind() {
        let mut rng = PieceRng::new(7);
        let mut seen = [false; 7];
        for _ in 0..1000 {
            seen[rng.next_kind().color_index() as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
