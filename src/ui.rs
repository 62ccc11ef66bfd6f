//! TUI module using ratatui.
//!
//! One screen: subject-line input, optional row input, two result panels side
//! by side and a save action per panel. Analysis runs inline, so the screen
//! is frozen on "Analyzing..." until both replies are back.

use crate::agent::{build_generator, TextGenerator};
use crate::analysis::Analysis;
use crate::config::{Config, Target};
use crate::session::{parse_row, Panel, PanelId, Session};
use crate::store::build_sink;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};
use std::time::Duration;
use tracing::{error, info};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Subject,
    Row,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Feedback {
    Success(String),
    Error(String),
}

impl Feedback {
    fn line(&self) -> Line<'_> {
        match self {
            Feedback::Success(msg) => Line::styled(msg.as_str(), Style::default().fg(Color::Green)),
            Feedback::Error(msg) => Line::styled(msg.as_str(), Style::default().fg(Color::Red)),
        }
    }
}

/// What the main loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Analyze,
    Save(PanelId),
    Quit,
}

struct App {
    config: Config,
    generator: Result<Box<dyn TextGenerator>, String>,
    session: Session,
    subject: String,
    row: String,
    focus: Focus,
    status: Feedback,
    feedback: [Option<Feedback>; 2],
}

impl App {
    fn new(config: Config) -> Self {
        let generator = build_generator(&config).map_err(|e| e.to_string());
        let status = match &generator {
            Ok(g) => Feedback::Success(format!("Ready ({})", g.describe())),
            Err(e) => Feedback::Error(e.clone()),
        };
        Self {
            config,
            generator,
            session: Session::new(),
            subject: String::new(),
            row: String::new(),
            focus: Focus::Subject,
            status,
            feedback: [None, None],
        }
    }

    fn target(&self) -> Target {
        self.config.store.target
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Enter => Action::Analyze,
            KeyCode::F(2) => Action::Save(PanelId::First),
            KeyCode::F(3) => Action::Save(PanelId::Second),
            KeyCode::Tab | KeyCode::BackTab => {
                if self.target() == Target::Sheet {
                    self.focus = match self.focus {
                        Focus::Subject => Focus::Row,
                        Focus::Row => Focus::Subject,
                    };
                }
                Action::None
            }
            KeyCode::Backspace => {
                self.focused_input().pop();
                Action::None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.focused_input().push(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn focused_input(&mut self) -> &mut String {
        match self.focus {
            Focus::Subject => &mut self.subject,
            Focus::Row => &mut self.row,
        }
    }

    async fn analyze(&mut self) {
        self.feedback = [None, None];
        let generator = match &self.generator {
            Ok(generator) => generator,
            Err(e) => {
                self.status = Feedback::Error(e.clone());
                return;
            }
        };

        let format = self.config.agent.format;
        self.status = match self
            .session
            .analyze(generator.as_ref(), &self.subject, format)
            .await
        {
            Ok(()) => Feedback::Success("Analysis complete. F2 / F3 saves a result.".to_string()),
            Err(e) => {
                error!(error = %e, "analysis failed");
                Feedback::Error(e.to_string())
            }
        };
    }

    async fn save(&mut self, id: PanelId) {
        let row = match self.target() {
            Target::Sheet => match parse_row(&self.row) {
                Ok(row) => row,
                Err(e) => {
                    self.feedback[id.index()] = Some(Feedback::Error(e.to_string()));
                    return;
                }
            },
            Target::Database => 0,
        };

        let outcome = match build_sink(&self.config, self.target(), row) {
            Ok(sink) => self
                .session
                .save(id, sink.as_ref())
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(format!("Error saving {id}: {e}")),
        };

        self.feedback[id.index()] = Some(match outcome {
            Ok(message) => Feedback::Success(message),
            Err(message) => {
                error!(panel = %id, error = %message, "save failed");
                Feedback::Error(message)
            }
        });
    }

    fn draw(&self, frame: &mut Frame) {
        let show_row = self.target() == Target::Sheet;
        let [title, subject, row, help, panels, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(if show_row { 3 } else { 0 }),
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(
            Line::styled(
                "Subject Lines Automation",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            title,
        );

        self.draw_input(frame, subject, "Email subject line", &self.subject, Focus::Subject);
        if show_row {
            self.draw_input(frame, row, "Row to edit", &self.row, Focus::Row);
        }

        let save_hint = match self.target() {
            Target::Sheet => "save to Google Sheets",
            Target::Database => "save to database",
        };
        frame.render_widget(
            Line::styled(
                format!("Enter analyze · Tab switch field · F2/F3 {save_hint} · Esc quit"),
                Style::default().fg(Color::DarkGray),
            ),
            help,
        );

        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(panels);
        for (id, area) in PanelId::BOTH.into_iter().zip([left, right]) {
            self.draw_panel(frame, area, id);
        }

        frame.render_widget(self.status.line(), status);
    }

    fn draw_input(&self, frame: &mut Frame, area: Rect, title: &str, value: &str, focus: Focus) {
        let focused = self.focus == focus;
        let border = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        frame.render_widget(
            Paragraph::new(value).block(Block::bordered().title(title).border_style(border)),
            area,
        );
        if focused {
            let x = area.x + 1 + value.chars().count() as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
        }
    }

    fn draw_panel(&self, frame: &mut Frame, area: Rect, id: PanelId) {
        let mut text = Text::default();
        match self.session.panel(id) {
            Some(panel) => text.extend(panel_lines(panel)),
            None if self.session.is_analyzed() => text.push_line(Line::from("No result.")),
            None => {}
        }
        if let Some(feedback) = &self.feedback[id.index()] {
            text.push_line(Line::default());
            text.push_line(feedback.line());
        }

        frame.render_widget(
            Paragraph::new(text)
                .block(Block::bordered().title(id.to_string()))
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

fn panel_lines(panel: &Panel) -> Vec<Line<'_>> {
    let mut lines = vec![Line::styled("Output:", Style::default().fg(Color::DarkGray))];
    lines.extend(panel.raw.lines().map(Line::from));
    lines.push(Line::default());
    match &panel.parsed {
        Ok(analysis) => lines.extend(analysis_lines(analysis)),
        Err(e) => lines.push(Line::styled(
            format!("Cannot use this result: {e}"),
            Style::default().fg(Color::Red),
        )),
    }
    lines
}

fn analysis_lines(analysis: &Analysis) -> Vec<Line<'_>> {
    let label = Style::default().add_modifier(Modifier::BOLD);
    vec![
        Line::from(vec![
            Span::styled("Score:    ", label),
            Span::raw(analysis.score.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Template: ", label),
            Span::raw(analysis.template.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Category: ", label),
            Span::raw(analysis.category.as_str()),
        ]),
    ]
}

async fn event_loop(terminal: &mut DefaultTerminal, app: &mut App) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| app.draw(frame))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match app.handle_key(key) {
            Action::None => {}
            Action::Quit => return Ok(()),
            Action::Analyze => {
                app.status = Feedback::Success("Analyzing...".to_string());
                terminal.draw(|frame| app.draw(frame))?;
                app.analyze().await;
            }
            Action::Save(id) => {
                app.feedback[id.index()] = Some(Feedback::Success("Saving...".to_string()));
                terminal.draw(|frame| app.draw(frame))?;
                app.save(id).await;
            }
        }
    }
}

/// Run the interactive screen until the user quits
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!(target = ?config.store.target, format = ?config.agent.format, "starting TUI");
    let mut app = App::new(config);
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app).await;
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(target: Target) -> App {
        let mut config = Config::default();
        config.api.openai_key = Some("test-key".to_string());
        config.store.target = target;
        App::new(config)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_goes_to_focused_field() {
        let mut app = app(Target::Sheet);
        for c in "Hi!".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Char('4')));
        app.handle_key(press(KeyCode::Backspace));
        app.handle_key(press(KeyCode::Char('5')));

        assert_eq!(app.subject, "Hi!");
        assert_eq!(app.row, "5");
    }

    #[test]
    fn database_target_has_no_row_field() {
        let mut app = app(Target::Database);
        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Subject);
    }

    #[test]
    fn keys_map_to_actions() {
        let mut app = app(Target::Sheet);
        assert_eq!(app.handle_key(press(KeyCode::Enter)), Action::Analyze);
        assert_eq!(app.handle_key(press(KeyCode::F(3))), Action::Save(PanelId::Second));
        assert_eq!(app.handle_key(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert!(app.subject.is_empty());
    }

    #[tokio::test]
    async fn empty_subject_shows_error() {
        let mut app = app(Target::Sheet);
        app.analyze().await;
        assert_eq!(
            app.status,
            Feedback::Error("Please enter a subject line.".to_string())
        );
        assert!(!app.session.is_analyzed());
    }

    #[tokio::test]
    async fn invalid_row_is_reported_on_the_panel() {
        let mut app = app(Target::Sheet);
        app.row = "abc".to_string();
        app.save(PanelId::Second).await;
        assert!(matches!(
            &app.feedback[1],
            Some(Feedback::Error(msg)) if msg.starts_with("Invalid row 'abc'")
        ));
        assert!(app.feedback[0].is_none());
    }

    #[tokio::test]
    async fn missing_api_key_blocks_analysis() {
        let mut config = Config::default();
        config.api.openai_key = None;
        let mut app = App::new(config);
        app.subject = "Hello".to_string();
        app.analyze().await;
        assert!(matches!(app.status, Feedback::Error(_)));
        assert!(!app.session.is_analyzed());
    }
}
