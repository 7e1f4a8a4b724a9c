//! App: terminal init, main loop, tick and key handling.

use crate::Args;
use crate::game::{GameState, PieceRng};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding. 50 ms ≈ 20 moves/sec.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Target render frame time (~60 FPS).
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

pub struct App {
    args: Args,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    /// Previous frame instant; the elapsed gap is fed to the engine clock.
    last_frame: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    quit_selected: QuitOption,
    /// Lines total as of the previous frame; a jump arms the clear flash.
    lines_seen: u32,
    /// TachyonFX flash for line clears (created when lines disappear).
    clear_flash: Option<Effect>,
    /// Last time we processed the flash effect (for delta).
    clear_flash_time: Option<Instant>,
}

fn new_game(args: &Args) -> GameState {
    match args.seed {
        Some(seed) => GameState::with_rng(PieceRng::new(seed)),
        None => GameState::new(),
    }
}

impl App {
    pub fn new(args: Args, theme: Theme) -> Self {
        let state = new_game(&args);
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Self {
            args,
            theme,
            state,
            screen,
            paused: false,
            last_frame: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            quit_selected: QuitOption::Resume,
            lines_seen: 0,
            clear_flash: None,
            clear_flash_time: None,
        }
    }

    fn reset_game(&mut self) {
        self.state = new_game(&self.args);
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_frame = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.lines_seen = 0;
        self.clear_flash = None;
        self.clear_flash_time = None;
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::MoveLeft => {
                self.state.move_left();
            }
            Action::MoveRight => {
                self.state.move_right();
            }
            Action::Rotate => {
                self.state.try_rotate();
            }
            Action::SoftDrop => {
                self.state.soft_drop();
            }
            Action::HardDrop => {
                self.state.hard_drop();
                self.repeat_state = None;
            }
            Action::Pause | Action::Quit | Action::None => {}
        }
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let (action, first) = match self.repeat_state {
            Some(s) => s,
            None => return,
        };
        if !matches!(
            action,
            Action::MoveLeft | Action::MoveRight | Action::SoftDrop
        ) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action);
            self.last_repeat_fire = Some(now);
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Attempt to enable enhanced keyboard for Release events
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let dt = now.duration_since(self.last_frame).as_secs_f64();
            self.last_frame = now;

            if self.screen == Screen::Playing && !self.paused {
                self.tick_repeat();
                self.state.tick(dt);
                if self.state.lines_cleared() > self.lines_seen {
                    if !self.args.no_animation {
                        self.clear_flash = Some(crate::ui::clear_flash_effect());
                        self.clear_flash_time = None;
                    }
                    self.lines_seen = self.state.lines_cleared();
                }
                if self.state.is_game_over() {
                    self.screen = Screen::GameOver;
                    self.repeat_state = None;
                }
            }

            if self.clear_flash.as_ref().is_some_and(|e| e.done()) {
                self.clear_flash = None;
                self.clear_flash_time = None;
            }

            let quit_selected =
                (self.screen == Screen::QuitMenu).then_some(self.quit_selected);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    f.area(),
                    &mut self.clear_flash,
                    &mut self.clear_flash_time,
                    now,
                    quit_selected,
                )
            })?;

            let frame_duration = Duration::from_millis(FRAME_MS);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);

                        // Ignore OS repeats and only process first Press.
                        if key.kind != KeyEventKind::Press {
                            if key.kind == KeyEventKind::Release
                                && self.repeat_state.map(|(a, _)| a) == Some(action)
                            {
                                self.repeat_state = None;
                                self.last_repeat_fire = None;
                            }
                            continue;
                        }

                        // If we are already repeating this action, ignore subsequent OS Press events
                        if self.repeat_state.map(|(a, _)| a) == Some(action) {
                            continue;
                        }

                        match self.screen {
                            Screen::Menu => match action {
                                Action::Quit => return Ok(()),
                                Action::HardDrop => self.reset_game(),
                                _ => {}
                            },
                            Screen::Playing => {
                                if self.paused {
                                    if action == Action::Pause {
                                        self.paused = false;
                                        self.last_frame = Instant::now();
                                    } else if action == Action::Quit {
                                        self.screen = Screen::QuitMenu;
                                        self.quit_selected = QuitOption::Resume;
                                    }
                                } else if action == Action::Pause {
                                    self.paused = true;
                                    self.repeat_state = None;
                                } else if action == Action::Quit {
                                    self.screen = Screen::QuitMenu;
                                    self.quit_selected = QuitOption::Resume;
                                    self.repeat_state = None;
                                } else {
                                    self.apply_action(action);
                                    let repeatable = matches!(
                                        action,
                                        Action::MoveLeft | Action::MoveRight | Action::SoftDrop
                                    );
                                    if repeatable {
                                        self.repeat_state = Some((action, Instant::now()));
                                        self.last_repeat_fire = None;
                                    }
                                }
                            }
                            Screen::QuitMenu => match action {
                                Action::SoftDrop | Action::MoveRight => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::MainMenu,
                                        QuitOption::MainMenu => QuitOption::Exit,
                                        QuitOption::Exit => QuitOption::Resume,
                                    };
                                }
                                Action::Rotate | Action::MoveLeft => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::Exit,
                                        QuitOption::MainMenu => QuitOption::Resume,
                                        QuitOption::Exit => QuitOption::MainMenu,
                                    };
                                }
                                Action::HardDrop => match self.quit_selected {
                                    QuitOption::Resume => {
                                        self.screen = Screen::Playing;
                                        self.last_frame = Instant::now();
                                    }
                                    QuitOption::MainMenu => self.screen = Screen::Menu,
                                    QuitOption::Exit => return Ok(()),
                                },
                                Action::Pause | Action::Quit => {
                                    self.screen = Screen::Playing;
                                    self.last_frame = Instant::now();
                                }
                                _ => {}
                            },
                            Screen::GameOver => {
                                if action == Action::Quit {
                                    return Ok(());
                                }
                                if matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R')) {
                                    self.reset_game();
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
