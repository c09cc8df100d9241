//! Game state: grid, snake, food placement, tick transition.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Points awarded per food eaten.
pub const FOOD_REWARD: u32 = 10;

/// Snake length at run start (clamped to the grid when it would not fit).
const START_LENGTH: i32 = 3;

/// One grid cell. `x` grows rightward, `y` grows downward; `(0, 0)` is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn step(self, d: Direction) -> Self {
        let (dx, dy) = d.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Idle,
    Running,
    Paused,
    GameOver,
}

/// Why a run ended. Board-full is a win, kept distinct from collision losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    HitWall,
    HitSelf,
    BoardFull,
}

/// Terminal report, produced exactly once per run by the tick that ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub score: u32,
    pub reason: EndReason,
}

/// The grid simulation. All mutation happens in `tick`; input only stages a
/// direction change in a single slot that the next tick consumes.
#[derive(Debug)]
pub struct SnakeGame {
    width: i32,
    height: i32,
    /// Head at the front. Cells are unique and in bounds while a run is live.
    snake: VecDeque<Point>,
    direction: Direction,
    pending: Option<Direction>,
    /// `None` only once the board is full (terminal).
    food: Option<Point>,
    status: GameStatus,
    score: u32,
    end_reason: Option<EndReason>,
    rng: SmallRng,
}

impl SnakeGame {
    /// New engine in `Idle`; call [`start`](Self::start) to begin a run.
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_rng(width, height, SmallRng::from_os_rng())
    }

    /// Deterministic food placement for a fixed seed.
    pub fn with_seed(width: u16, height: u16, seed: u64) -> Self {
        Self::with_rng(width, height, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(width: u16, height: u16, rng: SmallRng) -> Self {
        Self {
            width: i32::from(width.max(1)),
            height: i32::from(height.max(1)),
            snake: VecDeque::new(),
            direction: Direction::Right,
            pending: None,
            food: None,
            status: GameStatus::Idle,
            score: 0,
            end_reason: None,
            rng,
        }
    }

    /// Begin a fresh run: centred snake heading right, new food, score 0.
    /// Callable from `Idle` or `GameOver`.
    pub fn start(&mut self) {
        let cx = self.width / 2;
        let cy = self.height / 2;
        let len = START_LENGTH.min(cx + 1).max(1);
        self.snake = (0..len).map(|i| Point::new(cx - i, cy)).collect();
        self.direction = Direction::Right;
        self.pending = None;
        self.score = 0;
        self.end_reason = None;
        self.status = GameStatus::Running;
        self.food = self.spawn_food();
    }

    /// Stage a direction change for the next tick. Silently ignored while not
    /// running or when `d` would reverse the snake onto itself.
    pub fn set_direction(&mut self, d: Direction) {
        if self.status != GameStatus::Running {
            return;
        }
        if d == self.direction.opposite() {
            return;
        }
        self.pending = Some(d);
    }

    pub fn pause(&mut self) {
        if self.status == GameStatus::Running {
            self.status = GameStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == GameStatus::Paused {
            self.status = GameStatus::Running;
        }
    }

    /// Advance the simulation by one step. Returns the terminal report on the
    /// tick that ends the run, and `None` on every other call (including any
    /// call after the run already ended).
    pub fn tick(&mut self) -> Option<RunOutcome> {
        if self.status != GameStatus::Running {
            return None;
        }
        if let Some(d) = self.pending.take() {
            if d != self.direction.opposite() {
                self.direction = d;
            }
        }
        let head = *self.snake.front()?;
        let new_head = head.step(self.direction);

        if !self.in_bounds(new_head) {
            return self.finish(EndReason::HitWall);
        }

        let eating = self.food == Some(new_head);
        // The tail cell vacates this tick unless we grow, so it only counts
        // as a body cell when eating.
        let body_len = if eating {
            self.snake.len()
        } else {
            self.snake.len() - 1
        };
        if self.snake.iter().take(body_len).any(|&c| c == new_head) {
            return self.finish(EndReason::HitSelf);
        }

        self.snake.push_front(new_head);
        if eating {
            self.score += FOOD_REWARD;
            self.food = self.spawn_food();
            if self.food.is_none() {
                return self.finish(EndReason::BoardFull);
            }
        } else {
            self.snake.pop_back();
        }
        None
    }

    fn finish(&mut self, reason: EndReason) -> Option<RunOutcome> {
        self.status = GameStatus::GameOver;
        self.end_reason = Some(reason);
        Some(RunOutcome {
            score: self.score,
            reason,
        })
    }

    fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }

    /// Uniformly random empty cell, or `None` when the snake covers the board.
    fn spawn_food(&mut self) -> Option<Point> {
        let cells = (self.width * self.height) as usize;
        let mut empty = Vec::with_capacity(cells.saturating_sub(self.snake.len()));
        for y in 0..self.height {
            for x in 0..self.width {
                let p = Point::new(x, y);
                if !self.snake.contains(&p) {
                    empty.push(p);
                }
            }
        }
        if empty.is_empty() {
            return None;
        }
        let i = self.rng.random_range(0..empty.len());
        Some(empty[i])
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn food(&self) -> Option<Point> {
        self.food
    }

    pub fn head(&self) -> Option<Point> {
        self.snake.front().copied()
    }

    pub fn snake(&self) -> impl Iterator<Item = Point> + '_ {
        self.snake.iter().copied()
    }

    pub fn snake_len(&self) -> usize {
        self.snake.len()
    }
}
