#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Arithmetic,
    Algebra,
    Geometry,
    Calculus,
    Statistics,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Arithmetic => "arithmetic",
            Category::Algebra => "algebra",
            Category::Geometry => "geometry",
            Category::Calculus => "calculus",
            Category::Statistics => "statistics",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "arithmetic" => Some(Category::Arithmetic),
            "algebra" => Some(Category::Algebra),
            "geometry" => Some(Category::Geometry),
            "calculus" => Some(Category::Calculus),
            "statistics" => Some(Category::Statistics),
            _ => None,
        }
    }

    pub fn all() -> Vec<Category> {
        vec![
            Category::Arithmetic,
            Category::Algebra,
            Category::Geometry,
            Category::Calculus,
            Category::Statistics,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Arithmetic => "Arithmetic",
            Category::Algebra => "Algebra",
            Category::Geometry => "Geometry",
            Category::Calculus => "Calculus",
            Category::Statistics => "Statistics",
        }
    }
}

/// Example problems for the picker, paired with the category they set.
pub const EXAMPLE_PROBLEMS: &[(Category, &str)] = &[
    (Category::Arithmetic, "What is 15% of 240?"),
    (Category::Algebra, "Solve for x: 2x + 5 = 13"),
    (Category::Geometry, "Find the area of a circle with radius 7"),
    (Category::Calculus, "Find the derivative of x^2 + 3x"),
    (Category::Statistics, "Find the mean of 4, 8, 15, 16, 23, 42"),
];

/// Build the solver prompt. The `STEP:`/`ANSWER:` markers requested here are
/// what `render` later splits the response on.
pub fn build_solver_prompt(problem: &str, category: Option<Category>) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are an expert math tutor. Solve this step by step:\n\n");
    prompt.push_str(&format!("Problem: {}\n", problem));
    if let Some(category) = category {
        prompt.push_str(&format!("Type: {}\n", category.as_str()));
    }
    prompt.push_str("\nPlease format your response with:\n");
    prompt.push_str("1. Clear step-by-step solution\n");
    prompt.push_str("2. Mark each step with \"STEP:\" at the beginning\n");
    prompt.push_str("3. Mark the final answer with \"ANSWER:\" at the beginning\n");
    prompt.push_str("4. Show all calculations clearly\n\n");
    prompt.push_str("Provide educational explanations for each step.");

    prompt
}

/// Build the chat prompt around a single user message.
pub fn build_chat_prompt(message: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are a friendly math tutor. Help with this math question or conversation:\n\n");
    prompt.push_str(message);
    prompt.push_str("\n\nProvide a helpful, concise response. If it's a math problem, ");
    prompt.push_str("solve it step by step. If it's a general question, provide a clear explanation.");

    prompt
}
