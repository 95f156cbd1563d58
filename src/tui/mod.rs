//! TUI module - plan dashboard with ratatui

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Table, Row, Cell},
};
use std::io::{stdout, Stdout};
use tracing::warn;

use crate::store::{NextWorkout, UserId, WorkoutDay, WorkoutStore};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// App state for TUI
pub struct App<S: WorkoutStore> {
    store: S,
    user: UserId,
    days: Vec<WorkoutDay>,
    next: Option<NextWorkout>,
    selected: usize,
    error: Option<String>,
    should_quit: bool,
}

impl<S: WorkoutStore> App<S> {
    pub fn new(store: S, user: UserId) -> Self {
        let mut app = Self {
            store,
            user,
            days: Vec::new(),
            next: None,
            selected: 0,
            error: None,
            should_quit: false,
        };
        app.refresh();
        app
    }

    /// Reload plan and recommendation; failures leave an empty dashboard
    fn refresh(&mut self) {
        let fetched = self
            .store
            .list_days(&self.user)
            .and_then(|days| Ok((days, self.store.next_workout(&self.user)?)));

        match fetched {
            Ok((days, next)) => {
                self.days = days;
                self.next = Some(next);
                self.error = None;
            }
            Err(e) => {
                warn!("Dashboard refresh failed: {}", e);
                self.days.clear();
                self.next = None;
                self.error = Some(e.to_string());
            }
        }
        self.selected = self.selected.min(self.days.len().saturating_sub(1));
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }

        restore_terminal()?;
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(8),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let header = Paragraph::new(format!("liftday - {}", self.user))
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        // Plan days
        let next_day = self.next.as_ref().and_then(|n| n.next_day);
        let rows: Vec<Row> = self.days.iter().enumerate().map(|(i, day)| {
            let last = self
                .next
                .as_ref()
                .and_then(|n| n.last_sessions.get(&day.day_number))
                .map(|l| format!("{} ({}')", l.completed_at.format("%Y-%m-%d %H:%M"), l.duration_minutes))
                .unwrap_or_else(|| "-".to_string());
            let marker = if Some(day.day_number) == next_day { "NEXT" } else { "" };

            let mut style = Style::default();
            if i == self.selected {
                style = style.reversed();
            }
            Row::new(vec![
                Cell::from(day.day_number.to_string()),
                Cell::from(day.name.clone()),
                Cell::from(day.exercises.len().to_string()),
                Cell::from(last),
                Cell::from(marker).style(Style::default().fg(Color::Green).bold()),
            ]).style(style)
        }).collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Length(16),
                Constraint::Length(10),
                Constraint::Length(24),
                Constraint::Min(6),
            ],
        )
        .header(Row::new(vec!["Day", "Name", "Exercises", "Last completed", ""])
            .style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title("Plan"));
        frame.render_widget(table, chunks[1]);

        // Exercises of the selected day
        let exercise_rows: Vec<Row> = self.days.get(self.selected)
            .map(|day| day.exercises.iter().map(|ex| {
                let load = if ex.is_bodyweight() { "--".to_string() } else { ex.current_load.clone() };
                Row::new(vec![
                    Cell::from(ex.name.clone()),
                    Cell::from(ex.muscle_group.label()),
                    Cell::from(ex.scheme()),
                    Cell::from(load),
                    Cell::from(ex.rest_label()),
                ])
            }).collect::<Vec<Row>>())
            .unwrap_or_default();

        let exercises = Table::new(
            exercise_rows,
            [
                Constraint::Length(24),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(10),
                Constraint::Min(6),
            ],
        )
        .header(Row::new(vec!["Exercise", "Muscle", "Scheme", "Load", "Rest"])
            .style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title("Exercises"));
        frame.render_widget(exercises, chunks[2]);

        // Footer
        let footer_text = match &self.error {
            Some(e) => format!("store error: {}", e),
            None => "q: quit | r: refresh | j/k: select".to_string(),
        };
        let footer = Paragraph::new(footer_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => self.should_quit = true,
                        KeyCode::Char('r') => self.refresh(),
                        KeyCode::Char('j') | KeyCode::Down => {
                            if self.selected + 1 < self.days.len() {
                                self.selected += 1;
                            }
                        }
                        KeyCode::Char('k') | KeyCode::Up => {
                            self.selected = self.selected.saturating_sub(1);
                        }
                        _ => {}
                    }
                }
        Ok(())
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, seed_default_plan};

    #[test]
    fn test_refresh_loads_plan() {
        let store = MemoryStore::new();
        let user = UserId::from("andrea");
        seed_default_plan(&store, &user).unwrap();

        let app = App::new(store, user);
        assert_eq!(app.days.len(), 3);
        assert_eq!(app.next.as_ref().and_then(|n| n.next_day), Some(1));
        assert!(app.error.is_none());
    }

    #[test]
    fn test_failed_fetch_shows_empty_state() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);
        let app = App::new(store, UserId::from("andrea"));
        assert!(app.days.is_empty());
        assert!(app.error.is_some());
    }
}
