use std::io::stdout;

use crate::gui::error::GuiError;
use crate::plot::Figure;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{prelude::*, widgets::*, Terminal};

/// Shows `figures` one after another in the terminal.
///
/// `q`, `Esc`, `Enter` or `Right` close the current figure and move on to
/// the next one, `Left` goes back, `Ctrl-C` closes all of them. The
/// terminal is restored even when drawing fails.
pub fn show_figures(figures: &[Figure]) -> Result<(), GuiError> {
    if figures.is_empty() {
        return Ok(());
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let res = run_viewer(&mut terminal, figures);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn instructions(current: usize, count: usize) -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        " Figure ".into(),
        format!("{}/{}", current + 1, count).magenta().bold(),
        " Next ".into(),
        "<Q>/<Enter>".magenta().bold(),
        " Previous ".into(),
        "<Left>".magenta().bold(),
        " Quit all ".into(),
        "<Ctrl-C> ".magenta().bold(),
    ]))
    .alignment(Alignment::Center)
}

fn run_viewer<B: Backend>(terminal: &mut Terminal<B>, figures: &[Figure]) -> Result<(), GuiError> {
    let mut current = 0;
    loop {
        let figure = &figures[current];
        terminal.draw(|frame| {
            let areas = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(frame.size());
            figure.render(frame, areas[0]);
            frame.render_widget(instructions(current, figures.len()), areas[1]);
        })?;

        // Block until something happens, a resize simply redraws.
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(())
                }
                KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter | KeyCode::Right => {
                    if current + 1 == figures.len() {
                        return Ok(());
                    }
                    current += 1;
                }
                KeyCode::Left => current = current.saturating_sub(1),
                _ => {}
            }
        }
    }
}
