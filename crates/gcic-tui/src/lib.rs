//! GalacticCIC dashboard
//!
//! Read-only TUI over the metrics store. The collector daemon is the only
//! writer; this process just re-reads the store on a bounded cadence and
//! renders panels.

pub mod data;
pub mod panels;
pub mod theme;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gcic_core::constants::now_epoch;
use gcic_core::{DashboardConfig, Result};
use gcic_db::Database;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use data::DashboardData;

/// Dashboard state
struct App {
    db: Database,
    config: DashboardConfig,
    config_path: PathBuf,
    data: DashboardData,
    banner: Option<String>,
    focus: usize,
    show_help: bool,
    should_quit: bool,
}

impl App {
    /// Re-read everything from the store. A store failure becomes a banner
    /// over the last good data; the dashboard never crashes on reads.
    async fn refresh(&mut self) {
        match data::load(&self.db, now_epoch()).await {
            Ok(data) => {
                self.data = data;
                self.banner = None;
            }
            Err(e) => {
                self.banner = Some(e.to_string());
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => return true,
            KeyCode::Char(c @ '1'..='6') => {
                self.focus = (c as usize) - ('1' as usize);
            }
            KeyCode::Tab => self.focus = (self.focus + 1) % 6,
            KeyCode::Char('t') => {
                self.config.theme = theme::next_theme_name(&self.config.theme).to_string();
            }
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Esc => self.show_help = false,
            _ => {}
        }
        false
    }
}

/// Run the dashboard until quit. The active theme is persisted back to the
/// config file on exit.
pub async fn run(db_path: &Path, config_path: &Path) -> Result<()> {
    let config = DashboardConfig::load(config_path);
    let db = Database::open_existing(db_path).await?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App {
        db,
        config,
        config_path: config_path.to_path_buf(),
        data: DashboardData::default(),
        banner: None,
        focus: 0,
        show_help: false,
        should_quit: false,
    };

    let result = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Persist the (possibly cycled) theme choice.
    app.config.save(&app.config_path)?;
    app.db.close().await;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    // Renderer refresh floor is 1s; independent of collector tiers.
    let tick_rate = Duration::from_secs(app.config.effective_refresh());
    app.refresh().await;
    let mut last_tick = Instant::now();

    loop {
        let active_theme = theme::theme(&app.config.theme);
        terminal.draw(|f| {
            panels::render_dashboard(
                f,
                &app.data,
                app.banner.as_deref(),
                active_theme,
                app.focus,
                app.show_help,
            )
        })?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let force_refresh = app.handle_key(key.code);
                    if force_refresh {
                        app.refresh().await;
                        last_tick = Instant::now();
                    }
                }
                // Resize invalidates the layout; the next draw recomputes it.
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.refresh().await;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_app() -> (App, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();
        let app = App {
            db,
            config: DashboardConfig::default(),
            config_path: dir.path().join("config.json"),
            data: DashboardData::default(),
            banner: None,
            focus: 0,
            show_help: false,
            should_quit: false,
        };
        (app, dir)
    }

    #[tokio::test]
    async fn test_focus_keys() {
        let (mut app, _dir) = test_app().await;

        app.handle_key(KeyCode::Char('4'));
        assert_eq!(app.focus, 3);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focus, 4);
        app.handle_key(KeyCode::Char('6'));
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focus, 0);
    }

    #[tokio::test]
    async fn test_theme_cycle_persists_on_save() {
        let (mut app, dir) = test_app().await;
        assert_eq!(app.config.theme, "phosphor");

        for _ in 0..3 {
            app.handle_key(KeyCode::Char('t'));
        }
        assert_eq!(app.config.theme, "phosphor");

        app.handle_key(KeyCode::Char('t'));
        assert_eq!(app.config.theme, "amber");

        app.config.save(&app.config_path).unwrap();
        let reloaded = DashboardConfig::load(&dir.path().join("config.json"));
        assert_eq!(reloaded.theme, "amber");
    }

    #[tokio::test]
    async fn test_quit_and_help_keys() {
        let (mut app, _dir) = test_app().await;

        app.handle_key(KeyCode::Char('?'));
        assert!(app.show_help);
        app.handle_key(KeyCode::Esc);
        assert!(!app.show_help);

        assert!(app.handle_key(KeyCode::Char('r')));

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_refresh_on_empty_store() {
        let (mut app, _dir) = test_app().await;
        app.refresh().await;
        assert!(app.banner.is_none());
        assert!(app.data.agents.agents.is_empty());
    }
}
