use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::gemini::{GeminiClient, GeminiError};
use crate::prompt::{self, Category, EXAMPLE_PROBLEMS};
use crate::render::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Solver,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Tutor,
}

/// Fallback shown in the chat transcript when the backend call fails.
pub const CHAT_FALLBACK: &str = "Sorry, I had trouble processing that. Please try again.";
/// Fallback shown in the solver result area when the backend call fails.
pub const SOLVER_FALLBACK: &str =
    "Sorry, there was an error solving the problem. Please try again.";
/// Shown when no API key is configured.
pub const NO_KEY_HINT: &str =
    "No API key configured. Set GEMINI_API_KEY or add api_key to the config file.";

/// Maximum height of the chat input in text rows (it grows with content).
pub const CHAT_INPUT_MAX_ROWS: u16 = 4;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Solver state
    pub problem_input: String,
    pub problem_cursor: usize,
    pub selected_category: Option<Category>,
    pub result_segments: Vec<Segment>,
    pub solver_loading: bool,
    pub result_scroll: u16,
    pub result_height: u16,
    pub result_width: u16,
    pub total_result_lines: u16,
    pub solve_task: Option<JoinHandle<Result<String, GeminiError>>>,

    // Picker popups
    pub show_category_picker: bool,
    pub category_state: ListState,
    pub show_example_picker: bool,
    pub example_state: ListState,

    // Chat state
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_messages: Vec<ChatMessage>,
    pub chat_loading: bool,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_task: Option<JoinHandle<Result<String, GeminiError>>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Backend (None until an API key is configured)
    pub client: Option<GeminiClient>,
}

impl App {
    pub fn new(client: Option<GeminiClient>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Solver,
            input_mode: InputMode::Editing,

            problem_input: String::new(),
            problem_cursor: 0,
            selected_category: None,
            result_segments: Vec::new(),
            solver_loading: false,
            result_scroll: 0,
            result_height: 0,
            result_width: 0,
            total_result_lines: 0,
            solve_task: None,

            show_category_picker: false,
            category_state: ListState::default(),
            show_example_picker: false,
            example_state: ListState::default(),

            chat_input: String::new(),
            chat_cursor: 0,
            chat_messages: Vec::new(),
            chat_loading: false,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_task: None,

            animation_frame: 0,

            client,
        }
    }

    pub fn switch_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Solver => Screen::Chat,
            Screen::Chat => Screen::Solver,
        };
        self.input_mode = InputMode::Editing;
    }

    /// Submit the current problem to the solver. Returns true when a request
    /// was actually dispatched. Whitespace-only input and an in-flight
    /// request both suppress the call entirely.
    pub fn submit_problem(&mut self) -> bool {
        let problem = self.problem_input.trim().to_string();
        if problem.is_empty() || self.solve_task.is_some() {
            return false;
        }

        let Some(client) = self.client.clone() else {
            self.result_segments = vec![Segment::Paragraph(NO_KEY_HINT.to_string())];
            return false;
        };

        let prompt = prompt::build_solver_prompt(&problem, self.selected_category);

        self.result_segments.clear();
        self.result_scroll = 0;
        self.solver_loading = true;

        self.solve_task = Some(tokio::spawn(async move { client.query(&prompt).await }));
        true
    }

    /// Send the current chat input. Same guards as the solver: empty input
    /// and an outstanding request are early returns, not errors.
    pub fn send_chat_message(&mut self) -> bool {
        let message = self.chat_input.trim().to_string();
        if message.is_empty() || self.chat_task.is_some() {
            return false;
        }

        let Some(client) = self.client.clone() else {
            self.chat_messages.push(ChatMessage {
                role: ChatRole::Tutor,
                content: NO_KEY_HINT.to_string(),
            });
            return false;
        };

        self.chat_messages.push(ChatMessage {
            role: ChatRole::User,
            content: message.clone(),
        });
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.chat_loading = true;

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();

        let prompt = prompt::build_chat_prompt(&message);
        self.chat_task = Some(tokio::spawn(async move { client.query(&prompt).await }));
        true
    }

    /// Fold a finished solver request back into UI state.
    pub fn finish_solve(&mut self, result: Result<String, GeminiError>) {
        self.solver_loading = false;
        match result {
            Ok(text) => {
                self.result_segments = crate::render::render(&text);
            }
            Err(err) => {
                tracing::error!(error = %err, "solver request failed");
                self.result_segments = vec![Segment::Paragraph(SOLVER_FALLBACK.to_string())];
            }
        }
    }

    /// Fold a finished chat request back into the transcript.
    pub fn finish_chat(&mut self, result: Result<String, GeminiError>) {
        self.chat_loading = false;
        let content = match result {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                CHAT_FALLBACK.to_string()
            }
        };
        self.chat_messages.push(ChatMessage {
            role: ChatRole::Tutor,
            content,
        });
        self.scroll_chat_to_bottom();
    }

    // Result scrolling
    pub fn result_scroll_down(&mut self) {
        if self.result_scroll < self.total_result_lines.saturating_sub(self.result_height) {
            self.result_scroll = self.result_scroll.saturating_add(1);
        }
    }

    pub fn result_scroll_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(1);
    }

    /// Recount rendered result rows. Wrap-aware: a long line occupies
    /// several rows, so the scroll cap has to count rows, not lines.
    /// The fixed offsets match the prefixes the result panel draws.
    pub fn recount_result_lines(&mut self) {
        let wrap_width = if self.result_width > 0 {
            self.result_width as usize
        } else {
            60
        };

        let mut total_lines: u16 = 0;

        for segment in &self.result_segments {
            match segment {
                Segment::Step(text) => {
                    // "Step N: " prefix
                    let char_count = text.chars().count() + 8;
                    total_lines += char_count.div_ceil(wrap_width) as u16;
                }
                Segment::Answer(text) => {
                    total_lines += 1; // blank line before the answer
                    // " Final Answer: " prefix plus padding
                    let char_count = text.chars().count() + 16;
                    total_lines += char_count.div_ceil(wrap_width) as u16;
                }
                Segment::Paragraph(text) => {
                    // The raw fallback can span several lines
                    for line in text.lines() {
                        let char_count = line.chars().count();
                        total_lines += char_count.div_ceil(wrap_width).max(1) as u16;
                    }
                }
            }
        }

        self.total_result_lines = total_lines;
    }

    pub fn chat_scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn chat_scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll the transcript so the newest message (or the thinking
    /// indicator) is visible. Wrap-aware: counts rendered rows, not lines.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.chat_messages {
            total_lines += 1; // Role line ("You:" or "Tutor:")
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += char_count.div_ceil(wrap_width) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.chat_loading {
            total_lines += 2; // "Tutor:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    /// Height of the chat input area in text rows, growing with content up
    /// to a fixed maximum.
    pub fn chat_input_rows(&self) -> u16 {
        let rows = self.chat_input.lines().count().max(1) as u16;
        let rows = if self.chat_input.ends_with('\n') {
            rows + 1
        } else {
            rows
        };
        rows.min(CHAT_INPUT_MAX_ROWS)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.solver_loading || self.chat_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Category picker
    pub fn open_category_picker(&mut self) {
        self.show_category_picker = true;
        let current = self
            .selected_category
            .and_then(|c| Category::all().iter().position(|&x| x == c));
        self.category_state
            .select(Some(current.map(|i| i + 1).unwrap_or(0)));
    }

    pub fn category_picker_nav_down(&mut self) {
        // Entry 0 is "(none)", then one entry per category
        let len = Category::all().len() + 1;
        let i = self.category_state.selected().unwrap_or(0);
        self.category_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn category_picker_nav_up(&mut self) {
        let i = self.category_state.selected().unwrap_or(0);
        self.category_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_category(&mut self) {
        if let Some(i) = self.category_state.selected() {
            self.selected_category = if i == 0 {
                None
            } else {
                Category::all().get(i - 1).copied()
            };
        }
        self.show_category_picker = false;
    }

    // Example picker
    pub fn open_example_picker(&mut self) {
        self.show_example_picker = true;
        self.example_state.select(Some(0));
    }

    pub fn example_picker_nav_down(&mut self) {
        let len = EXAMPLE_PROBLEMS.len();
        if len > 0 {
            let i = self.example_state.selected().unwrap_or(0);
            self.example_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn example_picker_nav_up(&mut self) {
        let i = self.example_state.selected().unwrap_or(0);
        self.example_state.select(Some(i.saturating_sub(1)));
    }

    /// Populate the problem input (and category) from the chosen example.
    pub fn select_example(&mut self) {
        if let Some(i) = self.example_state.selected() {
            if let Some(&(category, problem)) = EXAMPLE_PROBLEMS.get(i) {
                self.problem_input = problem.to_string();
                self.problem_cursor = self.problem_input.chars().count();
                self.selected_category = Some(category);
                self.input_mode = InputMode::Editing;
            }
        }
        self.show_example_picker = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::DEFAULT_MODEL;

    fn app_with_client() -> App {
        App::new(Some(GeminiClient::new("test-key", DEFAULT_MODEL)))
    }

    #[tokio::test]
    async fn test_empty_problem_does_not_dispatch() {
        let mut app = app_with_client();
        app.problem_input = "   ".to_string();
        assert!(!app.submit_problem());
        assert!(app.solve_task.is_none());
        assert!(!app.solver_loading);
    }

    #[tokio::test]
    async fn test_empty_chat_does_not_dispatch() {
        let mut app = app_with_client();
        app.chat_input = "\n  ".to_string();
        assert!(!app.send_chat_message());
        assert!(app.chat_task.is_none());
        assert!(app.chat_messages.is_empty());
    }

    #[tokio::test]
    async fn test_inflight_request_blocks_resubmission() {
        let mut app = app_with_client();
        app.solve_task = Some(tokio::spawn(async { Ok("ANSWER: 4".to_string()) }));
        app.problem_input = "2+2".to_string();
        assert!(!app.submit_problem());
    }

    #[tokio::test]
    async fn test_missing_key_shows_hint_instead_of_sending() {
        let mut app = App::new(None);
        app.problem_input = "2+2".to_string();
        assert!(!app.submit_problem());
        assert_eq!(
            app.result_segments,
            vec![Segment::Paragraph(NO_KEY_HINT.to_string())]
        );
    }

    #[test]
    fn test_solver_error_collapses_to_generic_fallback() {
        let mut app = App::new(None);
        app.solver_loading = true;
        app.finish_solve(Err(GeminiError::RequestFailed { status: 500 }));
        assert!(!app.solver_loading);
        assert_eq!(
            app.result_segments,
            vec![Segment::Paragraph(SOLVER_FALLBACK.to_string())]
        );
    }

    #[test]
    fn test_chat_error_collapses_to_generic_fallback() {
        let mut app = App::new(None);
        app.chat_loading = true;
        app.finish_chat(Err(GeminiError::MalformedResponse("no candidates")));
        assert!(!app.chat_loading);
        let last = app.chat_messages.last().unwrap();
        assert_eq!(last.role, ChatRole::Tutor);
        assert_eq!(last.content, CHAT_FALLBACK);
    }

    #[test]
    fn test_successful_solve_renders_segments() {
        let mut app = App::new(None);
        app.solver_loading = true;
        app.finish_solve(Ok("STEP: add 2\nANSWER: 4".to_string()));
        assert_eq!(
            app.result_segments,
            vec![
                Segment::Step("add 2".to_string()),
                Segment::Answer("4".to_string()),
            ]
        );
    }

    #[test]
    fn test_transcript_preserves_append_order() {
        let mut app = App::new(None);
        app.chat_messages.push(ChatMessage {
            role: ChatRole::User,
            content: "what is 2+2?".to_string(),
        });
        app.finish_chat(Ok("4".to_string()));
        assert_eq!(app.chat_messages.len(), 2);
        assert_eq!(app.chat_messages[0].role, ChatRole::User);
        assert_eq!(app.chat_messages[1].role, ChatRole::Tutor);
    }

    #[test]
    fn test_chat_input_grows_to_max_rows() {
        let mut app = App::new(None);
        app.chat_input = "one".to_string();
        assert_eq!(app.chat_input_rows(), 1);
        app.chat_input = "one\ntwo\nthree".to_string();
        assert_eq!(app.chat_input_rows(), 3);
        app.chat_input = "1\n2\n3\n4\n5\n6".to_string();
        assert_eq!(app.chat_input_rows(), CHAT_INPUT_MAX_ROWS);
    }

    #[test]
    fn test_example_selection_populates_input_and_category() {
        let mut app = App::new(None);
        app.open_example_picker();
        app.example_picker_nav_down();
        app.select_example();
        let (category, problem) = EXAMPLE_PROBLEMS[1];
        assert_eq!(app.problem_input, problem);
        assert_eq!(app.selected_category, Some(category));
        assert!(!app.show_example_picker);
    }

    #[test]
    fn test_category_picker_none_entry_clears_selection() {
        let mut app = App::new(None);
        app.selected_category = Some(Category::Calculus);
        app.open_category_picker();
        // Entry 0 is "(none)"
        app.category_state.select(Some(0));
        app.select_category();
        assert_eq!(app.selected_category, None);
    }

    #[test]
    fn test_scroll_chat_to_bottom_accounts_for_wrapping() {
        let mut app = App::new(None);
        app.chat_width = 10;
        app.chat_height = 5;
        app.chat_messages.push(ChatMessage {
            role: ChatRole::User,
            content: "a".repeat(95),
        });
        app.scroll_chat_to_bottom();
        // 1 role line + 10 wrapped rows + 1 blank = 12 total, 5 visible
        assert_eq!(app.chat_scroll, 7);
    }

    #[test]
    fn test_exact_width_line_counts_one_row() {
        let mut app = App::new(None);
        app.chat_width = 10;
        app.chat_height = 5;
        app.chat_messages.push(ChatMessage {
            role: ChatRole::User,
            content: "a".repeat(100), // exact multiple of the wrap width
        });
        app.scroll_chat_to_bottom();
        // 1 role line + exactly 10 wrapped rows + 1 blank = 12 total
        assert_eq!(app.chat_scroll, 7);
    }

    #[test]
    fn test_result_scroll_cap_counts_wrapped_rows() {
        let mut app = App::new(None);
        app.result_width = 50;
        app.result_height = 2;
        app.result_segments = vec![Segment::Paragraph("a".repeat(200))];
        app.recount_result_lines();
        // 200 chars in a 50-col panel occupy 4 rows, not 1
        assert_eq!(app.total_result_lines, 4);
        for _ in 0..10 {
            app.result_scroll_down();
        }
        assert_eq!(app.result_scroll, 2);
    }

    #[test]
    fn test_recount_result_lines_mixed_segments() {
        let mut app = App::new(None);
        app.result_width = 20;
        app.result_segments = vec![
            Segment::Step("x".repeat(30)), // 38 chars with prefix -> 2 rows
            Segment::Answer("4".to_string()), // blank + 1 row
            Segment::Paragraph("short".to_string()), // 1 row
        ];
        app.recount_result_lines();
        assert_eq!(app.total_result_lines, 5);
    }

    #[test]
    fn test_recount_result_lines_multiline_fallback() {
        let mut app = App::new(None);
        app.result_width = 40;
        // Raw fallback paragraph keeps its newlines
        app.result_segments = vec![Segment::Paragraph("  \n\t\n ".to_string())];
        app.recount_result_lines();
        assert_eq!(app.total_result_lines, 3);
    }
}
