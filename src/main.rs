//! Retris — classic falling-block puzzle game in the terminal.

mod app;
mod game;
mod input;
mod shapes;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let mut app = App::new(args, theme);
    app.run()?;
    Ok(())
}

/// Classic falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "retris",
    version,
    about = "Classic falling-block puzzle in the terminal. Stack the pieces and clear full rows to score.",
    long_about = "Retris is a terminal rendition of the classic falling-block puzzle.\n\n\
        Pieces fall into a 10×20 well; full rows clear and the game speeds up every 10 lines.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Up         Rotate     Down       Soft drop\n  Enter/Space Hard drop   P          Pause      Q / Esc    Quit\n\n\
        CONTROLS (vim):\n  h/l         Move    k or i     Rotate     j          Soft drop\n  Space       Hard drop   p          Pause      q          Quit\n\n\
        Hold a movement key to keep the piece moving. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for piece selection (reproducible games). Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u32>,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the line-clear flash animation.
    #[arg(long)]
    pub no_animation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
