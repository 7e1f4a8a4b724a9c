//! Layout and drawing: menu, playfield, next preview, score, overlays.

use crate::app::{QuitOption, Screen};
use crate::game::{Cell, GameState, GRID_HEIGHT, GRID_WIDTH, Piece};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Two terminal columns per grid cell so cells come out square-ish.
const CELL_WIDTH: u16 = 2;
/// Board in terminal cells, border included.
const BOARD_WIDTH: u16 = GRID_WIDTH as u16 * CELL_WIDTH + 2;
const BOARD_HEIGHT: u16 = GRID_HEIGHT as u16 + 2;
const SIDEBAR_WIDTH: u16 = 20;

/// Duration of the line-clear flash.
const CLEAR_FLASH_MS: u32 = 250;

/// Next preview: mini cells.
const NEXT_MINI_CELL_W: u16 = 2;
const NEXT_MINI_CELL_H: u16 = 1;

/// Draw current screen (menu, game, game over), with optional pause overlay.
/// `clear_flash` is the line-clear effect owned by the app; it is processed
/// here and discarded by the app once done.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    area: Rect,
    clear_flash: &mut Option<Effect>,
    clear_flash_time: &mut Option<Instant>,
    now: Instant,
    quit_selected: Option<QuitOption>,
) {
    match screen {
        Screen::Menu => draw_menu(frame, theme, area),
        Screen::Playing => {
            draw_game(frame, state, theme, area);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if clear_flash.is_some() {
                apply_clear_flash(frame, area, clear_flash, clear_flash_time, now);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, area);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => draw_game_over(frame, state, theme, area),
    }
}

/// Fresh flash effect for a line clear; the app creates one when lines
/// disappear and drops it once done.
pub fn clear_flash_effect() -> Effect {
    fx::fade_from(
        Color::White,
        Color::White,
        (CLEAR_FLASH_MS, Interpolation::Linear),
    )
}

/// Board inner rect (no border) for given area; matches draw_game layout.
fn board_rect(area: Rect) -> Rect {
    let total_w = BOARD_WIDTH + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(BOARD_HEIGHT) / 2;
    Rect {
        x: x + 1,
        y: y + 1,
        width: (GRID_WIDTH as u16 * CELL_WIDTH).min(area.width.saturating_sub(2)),
        height: (GRID_HEIGHT as u16).min(area.height.saturating_sub(2)),
    }
}

/// Process the line-clear flash over the board (white fading to content).
fn apply_clear_flash(
    frame: &mut Frame,
    area: Rect,
    clear_flash: &mut Option<Effect>,
    clear_flash_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = clear_flash_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *clear_flash_time = Some(now);
    if let Some(effect) = clear_flash {
        frame.render_effect(effect, board_rect(area), TfxDuration::from_millis(delta_ms));
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 44u16;
    let popup_h = 18u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" RETRO ", Style::default().fg(theme.piece_color(6)).bold()),
        Span::styled(" TETRIS ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let key_style = Style::default().fg(theme.title);
    let text_style = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ←/→ ", key_style),
            Span::styled("Move piece", text_style),
        ]),
        Line::from(vec![
            Span::styled(" ↑ ", key_style),
            Span::styled("Rotate piece", text_style),
        ]),
        Line::from(vec![
            Span::styled(" ↓ ", key_style),
            Span::styled("Soft drop", text_style),
        ]),
        Line::from(vec![
            Span::styled(" SPACE ", key_style),
            Span::styled("Hard drop", text_style),
        ]),
        Line::from(vec![
            Span::styled(" P ", key_style),
            Span::styled("Pause", text_style),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " vim keys (hjkl) work too ",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" SPACE ", key_style),
            Span::styled("Start    ", text_style),
            Span::styled(" Q ", key_style),
            Span::styled("Quit", text_style),
        ]),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: playfield + sidebar; use full area and center the board.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let total_w = BOARD_WIDTH + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_HEIGHT),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let active_area = vert_chunks[1];

    let (playfield_area, sidebar_area) = {
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(BOARD_WIDTH),
                Constraint::Length(SIDEBAR_WIDTH),
            ])
            .split(active_area);
        (inner[0], inner[1])
    };

    draw_playfield(frame, state, theme, playfield_area);
    draw_sidebar(frame, state, theme, sidebar_area);
}

/// True if the falling piece covers this grid cell (rows above the top are
/// never drawn).
fn piece_covers(piece: &Piece, row: usize, col: usize) -> bool {
    let i = row as i32 - piece.y;
    let j = col as i32 - piece.x;
    if i < 0 || j < 0 {
        return false;
    }
    piece
        .matrix
        .get(i as usize)
        .and_then(|r| r.get(j as usize))
        .copied()
        .unwrap_or(false)
}

fn draw_playfield(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Retris ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    let piece = (!state.is_game_over()).then(|| state.piece());
    for row in 0..GRID_HEIGHT {
        for col in 0..GRID_WIDTH {
            let color = if piece.is_some_and(|p| piece_covers(p, row, col)) {
                theme.piece_color(state.piece().kind.color_index())
            } else {
                match state.grid().get(row, col) {
                    Cell::Block(kind) => theme.piece_color(kind.color_index()),
                    Cell::Empty => theme.bg,
                }
            };
            let ry = inner.y + row as u16;
            for dx in 0..CELL_WIDTH {
                let rx = inner.x + col as u16 * CELL_WIDTH + dx;
                if rx < inner.x + inner.width && ry < inner.y + inner.height {
                    buf[(rx, ry)]
                        .set_symbol(" ")
                        .set_style(Style::default().bg(color));
                }
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next (border + title + preview)
            Constraint::Length(1), // gap
            Constraint::Length(6), // Stats (border + score, level, lines, speed)
            Constraint::Length(1), // gap
            Constraint::Length(4), // Level progress (border + label + bar)
        ])
        .split(area);

    // --- Next (own border) ---
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(4)])
        .split(next_inner);
    Paragraph::new(Line::from(Span::styled("Next", title_style)))
        .render(next_layout[0], frame.buffer_mut());
    draw_next_preview(frame, state.next_piece(), theme, next_layout[1]);

    // --- Stats (own border): Score, Level, Lines ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(state.level().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", title_style),
            Span::styled(state.lines_cleared().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Speed: ", title_style),
            Span::styled(format!("{:.2}s", state.fall_interval()), fg_style),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines))
        .render(stats_inner, frame.buffer_mut());

    // --- Level progress (own border): lines towards the next level ---
    let level_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let level_inner = level_block.inner(chunks[4]);
    level_block.render(chunks[4], frame.buffer_mut());
    let level_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(level_inner);
    Paragraph::new(Line::from(Span::styled("Next level", title_style)))
        .render(level_layout[0], frame.buffer_mut());
    let into_level = state.lines_cleared() % 10;
    let gauge = Gauge::default()
        .ratio(f64::from(into_level) / 10.0)
        .label(format!("{}/10", into_level))
        .gauge_style(Style::default().fg(theme.title).bg(theme.bg));
    gauge.render(level_layout[1], frame.buffer_mut());
}

/// Draw the next piece's matrix as a small block preview (actual shape).
fn draw_next_preview(frame: &mut Frame, piece: &Piece, theme: &Theme, area: Rect) {
    let color = theme.piece_color(piece.kind.color_index());
    let bw = piece.matrix[0].len() as u16;
    let bh = piece.matrix.len() as u16;
    let off_x = area.width.saturating_sub(bw * NEXT_MINI_CELL_W) / 2;
    let off_y = area.height.saturating_sub(bh * NEXT_MINI_CELL_H) / 2;

    for (i, row) in piece.matrix.iter().enumerate() {
        for (j, &filled) in row.iter().enumerate() {
            if !filled {
                continue;
            }
            let r = Rect {
                x: area.x + off_x + j as u16 * NEXT_MINI_CELL_W,
                y: area.y + off_y + i as u16 * NEXT_MINI_CELL_H,
                width: NEXT_MINI_CELL_W,
                height: NEXT_MINI_CELL_H,
            };
            if r.x + r.width <= area.x + area.width && r.y + r.height <= area.y + area.height {
                let p = Paragraph::new("██").style(Style::default().fg(color).bg(color));
                p.render(r, frame.buffer_mut());
            }
        }
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup_w = 36u16;
    let popup_h = 12u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", state.score()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Level: {} ", state.level()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Lines: {} ", state.lines_cleared()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R — Restart    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Retris ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}
