use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode, Screen};
use crate::gemini::GeminiError;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

/// Reap finished query tasks and fold their results into UI state. Called
/// from the main loop on every tick; a still-running task is left alone.
pub async fn poll_tasks(app: &mut App) {
    if let Some(task) = app.solve_task.take_if(|t| t.is_finished()) {
        match task.await {
            Ok(result) => app.finish_solve(result),
            Err(err) => {
                tracing::error!(error = %err, "solver task aborted");
                app.finish_solve(Err(GeminiError::MalformedResponse("task aborted")));
            }
        }
    }

    if let Some(task) = app.chat_task.take_if(|t| t.is_finished()) {
        match task.await {
            Ok(result) => app.finish_chat(result),
            Err(err) => {
                tracing::error!(error = %err, "chat task aborted");
                app.finish_chat(Err(GeminiError::MalformedResponse("task aborted")));
            }
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Pickers take priority over everything else
    if app.show_category_picker {
        handle_category_picker(app, key);
        return Ok(());
    }
    if app.show_example_picker {
        handle_example_picker(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_category_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_category_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.category_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.category_picker_nav_up(),
        KeyCode::Enter => app.select_category(),
        _ => {}
    }
}

fn handle_example_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_example_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.example_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.example_picker_nav_up(),
        KeyCode::Enter => app.select_example(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Tab switches between the solver and chat screens
        KeyCode::Tab => app.switch_screen(),

        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('j') | KeyCode::Down => match app.screen {
            Screen::Solver => app.result_scroll_down(),
            Screen::Chat => app.chat_scroll_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.screen {
            Screen::Solver => app.result_scroll_up(),
            Screen::Chat => app.chat_scroll_up(),
        },

        // Solver-only actions
        KeyCode::Char('t') if app.screen == Screen::Solver => app.open_category_picker(),
        KeyCode::Char('e') if app.screen == Screen::Solver => app.open_example_picker(),
        KeyCode::Enter if app.screen == Screen::Solver => {
            app.submit_problem();
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Solver => handle_solver_editing(app, key),
        Screen::Chat => handle_chat_editing(app, key),
    }
}

fn handle_solver_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => app.switch_screen(),
        KeyCode::Enter => {
            if app.submit_problem() {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Backspace => {
            if app.problem_cursor > 0 {
                app.problem_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.problem_input, app.problem_cursor);
                app.problem_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.problem_input.chars().count();
            if app.problem_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.problem_input, app.problem_cursor);
                app.problem_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.problem_cursor = app.problem_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.problem_input.chars().count();
            app.problem_cursor = (app.problem_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.problem_cursor = 0;
        }
        KeyCode::End => {
            app.problem_cursor = app.problem_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.problem_input, app.problem_cursor);
            app.problem_input.insert(byte_pos, c);
            app.problem_cursor += 1;
        }
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => app.switch_screen(),
        // Enter sends; Shift/Alt+Enter inserts a newline instead
        KeyCode::Enter => {
            if key.modifiers.contains(KeyModifiers::SHIFT)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.insert(byte_pos, '\n');
                app.chat_cursor += 1;
            } else {
                app.send_chat_message();
            }
        }
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat_input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "π = 3.14";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 2); // π is two bytes
        assert_eq!(char_to_byte_index(s, 100), s.len());
    }

    #[tokio::test]
    async fn test_typing_inserts_at_cursor() {
        let mut app = App::new(None);
        app.screen = Screen::Solver;
        app.input_mode = InputMode::Editing;
        for c in "2+2".chars() {
            handle_event(&mut app, AppEvent::Key(key(KeyCode::Char(c)))).unwrap();
        }
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Left))).unwrap();
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Char('x')))).unwrap();
        assert_eq!(app.problem_input, "2+x2");
        assert_eq!(app.problem_cursor, 3);
    }

    #[tokio::test]
    async fn test_enter_on_empty_chat_sends_nothing() {
        let mut app = App::new(None);
        app.screen = Screen::Chat;
        app.input_mode = InputMode::Editing;
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Enter))).unwrap();
        assert!(app.chat_messages.is_empty());
        assert!(app.chat_task.is_none());
    }

    #[tokio::test]
    async fn test_shift_enter_inserts_newline() {
        let mut app = App::new(None);
        app.screen = Screen::Chat;
        app.input_mode = InputMode::Editing;
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Char('h')))).unwrap();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)),
        )
        .unwrap();
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Char('i')))).unwrap();
        assert_eq!(app.chat_input, "h\ni");
        assert!(app.chat_messages.is_empty());
    }

    #[tokio::test]
    async fn test_tab_toggles_screen() {
        let mut app = App::new(None);
        assert_eq!(app.screen, Screen::Solver);
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Tab))).unwrap();
        assert_eq!(app.screen, Screen::Chat);
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Tab))).unwrap();
        assert_eq!(app.screen, Screen::Solver);
    }

    #[tokio::test]
    async fn test_finished_task_is_reaped_on_poll() {
        let mut app = App::new(None);
        app.solver_loading = true;
        let task = tokio::spawn(async { Ok("ANSWER: 4".to_string()) });
        app.solve_task = Some(task);
        while !app.solve_task.as_ref().unwrap().is_finished() {
            tokio::task::yield_now().await;
        }
        poll_tasks(&mut app).await;
        assert!(app.solve_task.is_none());
        assert!(!app.solver_loading);
        assert_eq!(app.result_segments.len(), 1);
    }

    #[tokio::test]
    async fn test_unfinished_task_is_left_in_place() {
        let mut app = App::new(None);
        app.solver_loading = true;
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok("never".to_string())
        });
        app.solve_task = Some(task);
        poll_tasks(&mut app).await;
        assert!(app.solve_task.is_some());
        assert!(app.solver_loading);
        app.solve_task.take().unwrap().abort();
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_everywhere() {
        let mut app = App::new(None);
        app.input_mode = InputMode::Editing;
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL,
            )),
        )
        .unwrap();
        assert!(app.should_quit);
    }
}
