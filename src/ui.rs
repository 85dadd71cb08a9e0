use crate::recipe_entry::SavedRecipe;
use crate::recipe_history::RecipeHistory;
use crate::storage::KeyValueStore;
use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::{Duration, Instant},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const CURSOR_BLINK: Duration = Duration::from_millis(500);

pub enum Action {
    Generate,
    Save,
    History,
    Delete,
    ClearRecipe,
    ClearAll,
    ToggleSidebar,
    Quit,
}

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    cursor_visible: bool,
    last_cursor_update: Instant,
    notice: Option<String>,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            cursor_visible: true,
            last_cursor_update: Instant::now(),
            notice: None,
        })
    }

    /// Shows `message` under the controls until the next key press.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn display<S: KeyValueStore>(
        &mut self,
        history: &RecipeHistory<S>,
        loading: bool,
    ) -> Result<()> {
        let notice = self.notice.clone();
        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(3),
                ])
                .split(f.area());

            f.render_widget(title("Kitz Chef"), chunks[0]);

            let recipe_area = if history.entries().is_empty() {
                chunks[1]
            } else {
                let sidebar_width = if history.is_sidebar_expanded() {
                    Constraint::Percentage(35)
                } else {
                    Constraint::Length(26)
                };
                let body = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([sidebar_width, Constraint::Min(0)])
                    .split(chunks[1]);
                render_sidebar(f, body[0], history);
                body[1]
            };
            render_recipe(f, recipe_area, history, loading);

            let mut lines = Vec::with_capacity(2);
            if let Some(notice) = &notice {
                lines.push(Line::from(Span::styled(
                    notice.clone(),
                    Style::default().fg(Color::Green),
                )));
            }
            lines.push(controls(history, loading));
            let controls_paragraph = Paragraph::new(lines)
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            f.render_widget(controls_paragraph, chunks[2]);
        })?;

        Ok(())
    }

    /// Waits briefly for a key press so the caller can keep ticking timers.
    pub fn handle_input<S: KeyValueStore>(
        &mut self,
        history: &RecipeHistory<S>,
    ) -> Result<Option<Action>> {
        if !event::poll(POLL_INTERVAL)? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        self.notice = None;

        let has_entries = !history.entries().is_empty();
        let action = match key.code {
            KeyCode::Char('g') => Some(Action::Generate),
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('s') if history.can_save_current() => Some(Action::Save),
            KeyCode::Char('c') if history.current_recipe().is_some() => {
                Some(Action::ClearRecipe)
            }
            KeyCode::Char('h') if has_entries => Some(Action::History),
            KeyCode::Char('d') if has_entries => Some(Action::Delete),
            KeyCode::Char('x') if has_entries => Some(Action::ClearAll),
            KeyCode::Char('t') if has_entries => Some(Action::ToggleSidebar),
            _ => None,
        };
        Ok(action)
    }

    /// Reads a comma-separated ingredient list. `None` when cancelled.
    pub fn get_ingredients(&mut self) -> Result<Option<String>> {
        let mut input = String::new();
        self.cursor_visible = true;
        self.last_cursor_update = Instant::now();

        loop {
            let now = Instant::now();
            if now.duration_since(self.last_cursor_update) >= CURSOR_BLINK {
                self.cursor_visible = !self.cursor_visible;
                self.last_cursor_update = now;
            }

            let shown = if self.cursor_visible {
                format!("{input}|")
            } else {
                input.clone()
            };
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(1),
                    ])
                    .split(f.area());

                f.render_widget(title("Your Recipe"), chunks[0]);

                let ingredients_input = Paragraph::new(shown).block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Ingredients (comma-separated)"),
                );
                f.render_widget(ingredients_input, chunks[1]);

                let instructions = Paragraph::new("Enter: Generate Recipe, Esc: Cancel")
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[2]);
            })?;

            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Enter => return Ok(Some(input)),
                    KeyCode::Esc => return Ok(None),
                    KeyCode::Char(c) => input.push(c),
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    _ => {}
                }
            }
        }
    }

    /// Lets the user pick a saved recipe, starting at the active one.
    pub fn select_recipe<S: KeyValueStore>(
        &mut self,
        history: &RecipeHistory<S>,
        heading: &str,
    ) -> Result<Option<String>> {
        let entries = history.entries();
        if entries.is_empty() {
            return Ok(None);
        }
        let mut selected_index = history
            .active_id()
            .and_then(|id| entries.iter().position(|e| e.id == id))
            .unwrap_or(0);

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Min(10),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                f.render_widget(title(heading), chunks[0]);

                let width = chunks[1].width.saturating_sub(4) as usize;
                let items: Vec<ListItem> = entries
                    .iter()
                    .map(|e| {
                        ListItem::new(vec![
                            Line::from(Span::raw(truncate_to_width(&e.preview, width))),
                            Line::from(Span::styled(
                                format!("{}  {}", e.date_info.date, e.date_info.time),
                                Style::default().fg(Color::DarkGray),
                            )),
                        ])
                    })
                    .collect();

                let entries_list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Recipe History"))
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");

                f.render_stateful_widget(
                    entries_list,
                    chunks[1],
                    &mut ListState::default().with_selected(Some(selected_index)),
                );

                let instructions = Paragraph::new("Up/Down: Navigate, Enter: Select, Esc: Cancel")
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[2]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Up => selected_index = selected_index.saturating_sub(1),
                    KeyCode::Down => {
                        if selected_index < entries.len() - 1 {
                            selected_index += 1;
                        }
                    }
                    KeyCode::Enter => return Ok(Some(entries[selected_index].id.clone())),
                    KeyCode::Esc => return Ok(None),
                    _ => {}
                }
            }
        }
    }

    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(1),
                    ])
                    .split(f.area());

                f.render_widget(title("Please Confirm"), chunks[0]);

                let prompt = Paragraph::new(question)
                    .block(Block::default().borders(Borders::ALL))
                    .alignment(Alignment::Center);
                f.render_widget(prompt, chunks[1]);

                let instructions = Paragraph::new("y: Yes, n/Esc: No")
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[2]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => return Ok(false),
                    _ => {}
                }
            }
        }
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

fn title(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
}

fn render_sidebar<S: KeyValueStore>(f: &mut Frame, area: Rect, history: &RecipeHistory<S>) {
    let expanded = history.is_sidebar_expanded();
    let width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = history
        .entries()
        .iter()
        .map(|entry| history_item(entry, history.active_id(), expanded, width))
        .collect();

    let heading = format!("Recipe History ({})", history.entries().len());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(heading));
    f.render_widget(list, area);
}

fn history_item(
    entry: &SavedRecipe,
    active_id: Option<&str>,
    expanded: bool,
    width: usize,
) -> ListItem<'static> {
    let mut style = Style::default();
    if active_id == Some(entry.id.as_str()) {
        style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
    }
    if entry.is_new {
        style = style.fg(Color::Green);
    }

    let mut lines = vec![Line::from(Span::styled(
        truncate_to_width(&entry.preview, width),
        style,
    ))];
    let meta = if expanded {
        format!("{}  {}", entry.date_info.date, entry.date_info.time)
    } else {
        entry.date_info.relative_time.clone()
    };
    lines.push(Line::from(Span::styled(
        truncate_to_width(&meta, width),
        Style::default().fg(Color::DarkGray),
    )));
    ListItem::new(lines)
}

fn render_recipe<S: KeyValueStore>(
    f: &mut Frame,
    area: Rect,
    history: &RecipeHistory<S>,
    loading: bool,
) {
    if loading {
        let generating = Paragraph::new("Generating...")
            .block(Block::default().borders(Borders::ALL).title("Generated Recipe"))
            .alignment(Alignment::Center);
        f.render_widget(generating, area);
        return;
    }

    match history.current_recipe() {
        Some(recipe) => {
            let heading = match history.active_entry() {
                Some(entry) => format!("Generated Recipe - {}", entry.date_info.full_date_time),
                None => "Generated Recipe".to_string(),
            };
            let content = Paragraph::new(recipe)
                .block(Block::default().borders(Borders::ALL).title(heading))
                .wrap(Wrap { trim: false });
            f.render_widget(content, area);
        }
        None if history.entries().is_empty() => {
            let welcome = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Welcome to Kitz Chef!",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from("Here you can create inspired recipes"),
            ])
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
            f.render_widget(welcome, area);
        }
        None => {
            let hint = Paragraph::new("Generate a new recipe or open one from your history.")
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center);
            f.render_widget(hint, area);
        }
    }
}

fn controls<S: KeyValueStore>(history: &RecipeHistory<S>, loading: bool) -> Line<'static> {
    if loading {
        return Line::from("Generating recipe, please wait...");
    }

    let mut hints = vec![("g", "generate")];
    if history.can_save_current() {
        hints.push(("s", "save"));
    }
    if history.current_recipe().is_some() {
        hints.push(("c", "clear recipe"));
    }
    if !history.entries().is_empty() {
        hints.extend([
            ("h", "history"),
            ("d", "delete"),
            ("x", "clear all"),
            ("t", "toggle sidebar"),
        ]);
    }
    hints.push(("q", "quit"));

    let mut spans = vec![Span::raw("Press ")];
    for (i, (key, label)) in hints.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(", "));
        }
        spans.push(Span::styled(
            key,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" to {label}")));
    }
    Line::from(spans)
}

/// Cuts `text` to at most `max` terminal columns, marking the cut with `…`.
fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut truncated = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        truncated.push(c);
        used += w;
    }
    truncated.push('…');
    truncated
}
