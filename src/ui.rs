use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ChatRole, InputMode, Screen};
use crate::prompt::{Category, EXAMPLE_PROBLEMS};
use crate::render::Segment;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Solver => render_solver_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.show_category_picker {
        render_category_picker(app, frame, area);
    } else if app.show_example_picker {
        render_example_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let tab_style = |active: bool| {
        if active {
            Style::default().fg(Color::Black).bg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    let title = Line::from(vec![
        Span::styled(" Math Tutor ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(" "),
        Span::styled(" Solver ", tab_style(app.screen == Screen::Solver)),
        Span::raw(" "),
        Span::styled(" Chat ", tab_style(app.screen == Screen::Chat)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match (app.screen, app.input_mode) {
        (Screen::Solver, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" solve ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" chat ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" normal ", label_style),
        ],
        (Screen::Solver, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" edit ", label_style),
            Span::styled(" t ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" e ", key_style),
            Span::styled(" examples ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" chat ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" solver ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" normal ", label_style),
        ],
        (Screen::Chat, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" edit ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" solver ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_solver_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, category_area, result_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    render_problem_input(app, frame, input_area);

    // Category line
    let category_label = match app.selected_category {
        Some(category) => category.display_name(),
        None => "(none)",
    };
    let category_line = Line::from(vec![
        Span::styled(" Type: ", Style::default().fg(Color::DarkGray)),
        Span::styled(category_label, Style::default().fg(Color::Magenta)),
        Span::styled("  [t to change, e for examples]", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(category_line), category_area);

    render_result(app, frame, result_area);
}

fn render_problem_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Problem (Enter to solve) ");

    // Horizontal scroll keeps the cursor visible in a single-row input
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.problem_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .problem_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Map response segments to styled lines for the result panel.
fn segment_lines(segments: &[Segment]) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();
    let mut step_no = 0u32;

    for segment in segments {
        match segment {
            Segment::Step(text) => {
                step_no += 1;
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("Step {}: ", step_no),
                        Style::default().fg(Color::Cyan).bold(),
                    ),
                    Span::raw(text.clone()),
                ]));
            }
            Segment::Answer(text) => {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    format!(" Final Answer: {} ", text),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )));
            }
            Segment::Paragraph(text) => {
                // The raw fallback can carry embedded newlines
                for line in text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
        }
    }

    lines
}

fn render_result(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Solution ");

    // Store panel dimensions for wrap-aware scroll bounds
    app.result_height = area.height.saturating_sub(2);
    app.result_width = area.width.saturating_sub(2);

    let text = if app.solver_loading {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Text::from(Span::styled(
            format!("Solving{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if app.result_segments.is_empty() {
        Text::from(Span::styled(
            "Enter a problem above and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        app.recount_result_lines();
        Text::from(segment_lines(&app.result_segments))
    };

    let result = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.result_scroll, 0));

    frame.render_widget(result, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Input grows with content up to a fixed maximum
    let input_rows = app.chat_input_rows();
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_rows + 2),
    ])
    .areas(area);

    // Store transcript dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Tutor Chat ");

    let chat_text = if app.chat_messages.is_empty() && !app.chat_loading {
        Text::from(Span::styled(
            "Ask a math question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.chat_messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                }
                ChatRole::Tutor => {
                    lines.push(Line::from(Span::styled(
                        "Tutor:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                }
            }
            for line in msg.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());
        }

        if app.chat_loading {
            lines.push(Line::from(Span::styled(
                "Tutor:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_chat_input(app, frame, input_area);
}

fn render_chat_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send, Shift+Enter for newline) ");

    let input = Paragraph::new(app.chat_input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if editing {
        // Cursor row/col from the character offset within the input
        let before: String = app.chat_input.chars().take(app.chat_cursor).collect();
        let row = before.matches('\n').count() as u16;
        let col = before
            .rsplit('\n')
            .next()
            .map(|l| l.chars().count())
            .unwrap_or(0) as u16;
        let visible_rows = area.height.saturating_sub(2);
        let row = row.min(visible_rows.saturating_sub(1));
        frame.set_cursor_position((area.x + col + 1, area.y + row + 1));
    }
}

fn render_category_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let categories = Category::all();

    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (categories.len() as u16 + 3).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Problem Type (Enter to select, Esc to cancel) ");

    let mut items: Vec<ListItem> = vec![ListItem::new(" (none) ")];
    items.extend(categories.iter().map(|category| {
        let style = if Some(*category) == app.selected_category {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        ListItem::new(format!(" {} ", category.display_name())).style(style)
    }));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.category_state);
}

fn render_example_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = (EXAMPLE_PROBLEMS.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Example Problems (Enter to use, Esc to cancel) ");

    let items: Vec<ListItem> = EXAMPLE_PROBLEMS
        .iter()
        .map(|(category, problem)| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" [{}] ", category.display_name()),
                    Style::default().fg(Color::Magenta),
                ),
                Span::raw(*problem),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.example_state);
}
