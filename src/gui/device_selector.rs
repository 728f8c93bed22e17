use std::io::stdout;

use crate::gui::error::GuiError;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Lets the user pick one of several serial devices. Returns the index of
/// the chosen entry, or `None` when the user quits. The terminal is
/// restored even when drawing fails.
pub fn device_selector(entries: &[String]) -> Result<Option<usize>, GuiError> {
    if entries.is_empty() {
        return Err(GuiError::NoDevices);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let res = run_selector(&mut terminal, entries);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// Outcome of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Pending,
    Selected(usize),
    Quit,
}

/// Cursor over a list of `count` entries, wrapping at both ends.
#[derive(Debug)]
struct Selector {
    state: ListState,
    count: usize,
}

impl Selector {
    fn new(count: usize) -> Self {
        Self {
            state: ListState::default().with_selected(Some(0)),
            count,
        }
    }

    fn cursor(&self) -> usize {
        self.state.selected().unwrap_or(0)
    }

    fn on_key(&mut self, code: KeyCode) -> Choice {
        let cursor = self.cursor();
        match code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.state.select(Some((cursor + 1) % self.count));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.select(Some((cursor + self.count - 1) % self.count));
            }
            KeyCode::Enter => return Choice::Selected(cursor),
            KeyCode::Char('q') | KeyCode::Esc => return Choice::Quit,
            _ => {}
        }
        Choice::Pending
    }
}

fn device_list(entries: &[String]) -> List<'_> {
    let instructions = Title::from(Line::from(vec![
        " Navigate ".into(),
        "<Up>/<Down>".magenta().bold(),
        " Select ".into(),
        "<Enter>".magenta().bold(),
        " Quit ".into(),
        "<Q> ".magenta().bold(),
    ]));
    let block = Block::default()
        .title(Title::from(" Serial devices ".magenta().bold()).alignment(Alignment::Center))
        .title(
            instructions
                .alignment(Alignment::Center)
                .position(Position::Bottom),
        )
        .borders(Borders::ALL);
    List::new(entries.iter().map(String::as_str))
        .style(Style::default().fg(Color::White))
        .highlight_symbol(">> ")
        .highlight_style(Style::default().fg(Color::Magenta))
        .block(block)
}

fn run_selector<B: Backend>(
    terminal: &mut Terminal<B>,
    entries: &[String],
) -> Result<Option<usize>, GuiError> {
    let mut selector = Selector::new(entries.len());
    loop {
        terminal.draw(|frame| {
            frame.render_stateful_widget(device_list(entries), frame.size(), &mut selector.state);
        })?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match selector.on_key(key.code) {
                Choice::Pending => {}
                Choice::Selected(index) => return Ok(Some(index)),
                Choice::Quit => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn cursor_wraps_around() {
        let mut selector = Selector::new(3);
        assert_eq!(selector.on_key(KeyCode::Up), Choice::Pending);
        assert_eq!(selector.cursor(), 2);
        selector.on_key(KeyCode::Down);
        selector.on_key(KeyCode::Down);
        assert_eq!(selector.on_key(KeyCode::Enter), Choice::Selected(1));
        assert_eq!(selector.on_key(KeyCode::Esc), Choice::Quit);
    }

    #[test]
    fn list_marks_the_cursor() {
        let entries = vec!["/dev/ttyACM0 [Teensy 4.0]".to_owned(), "/dev/ttyACM1".to_owned()];
        let mut selector = Selector::new(entries.len());
        selector.on_key(KeyCode::Down);
        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        terminal
            .draw(|frame| {
                frame.render_stateful_widget(device_list(&entries), frame.size(), &mut selector.state);
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        let rows: Vec<String> = buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect();
        assert!(rows[1].contains("/dev/ttyACM0 [Teensy 4.0]") && !rows[1].contains(">>"));
        assert!(rows[2].contains(">> /dev/ttyACM1"));
    }

    #[test]
    fn nothing_to_select() {
        assert!(matches!(device_selector(&[]), Err(GuiError::NoDevices)));
    }
}
