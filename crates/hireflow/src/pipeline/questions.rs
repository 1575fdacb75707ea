use serde::Serialize;

use super::domain::Job;

/// One titled group of interview questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionCategory {
    pub category: String,
    pub questions: Vec<String>,
}

/// Skills beyond this many fall back to the generic technical prompts.
pub const MAX_SKILL_QUESTIONS: usize = 5;

const SKILL_TEMPLATES: [&str; 3] = [
    "Walk us through a project where {skill} was central to the outcome. What was your role?",
    "What is the hardest problem you have solved with {skill}, and how did you approach it?",
    "How do you keep your {skill} knowledge current, and what changed recently in how you use it?",
];

const GENERIC_TECHNICAL: &[&str] = &[
    "Which tools and technologies are you most productive with, and why?",
    "Describe a technical decision you made that you would revisit today.",
];

struct RoleTemplate {
    category: &'static str,
    keywords: &'static [&'static str],
    questions: &'static [&'static str],
}

const ROLE_TEMPLATES: &[RoleTemplate] = &[
    RoleTemplate {
        category: "Leadership",
        keywords: &["senior", "lead", "principal", "manager"],
        questions: &[
            "How do you mentor less experienced teammates?",
            "Tell us about a time you drove a technical decision across teams.",
            "How do you balance delivery pressure against long-term code health?",
        ],
    },
    RoleTemplate {
        category: "Frontend",
        keywords: &["frontend", "front-end", "react", "ui"],
        questions: &[
            "How do you keep a large component tree fast and maintainable?",
            "How do you approach accessibility in the interfaces you build?",
            "Describe how you manage client-side state in a complex application.",
        ],
    },
    RoleTemplate {
        category: "Backend",
        keywords: &["backend", "back-end", "api", "server"],
        questions: &[
            "How do you design an API so that it can evolve without breaking clients?",
            "Describe how you diagnosed a production performance problem.",
            "How do you reason about consistency when a request touches several services?",
        ],
    },
    RoleTemplate {
        category: "Data & Analytics",
        keywords: &["data", "analyst", "machine learning", "ml"],
        questions: &[
            "How do you validate the quality of a dataset before relying on it?",
            "Walk us through an analysis that changed a business decision.",
            "How do you explain a statistical result to a non-technical audience?",
        ],
    },
];

const FIXED_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Experience & Background",
        &[
            "Tell us about your current role and the scope of your responsibilities.",
            "Which accomplishment from your career are you most proud of?",
            "Why are you interested in the {title} position?",
        ],
    ),
    (
        "Behavioral",
        &[
            "Describe a time you disagreed with a teammate. How was it resolved?",
            "Tell us about a deadline you missed and what you learned from it.",
            "How do you prioritise when several urgent requests arrive at once?",
        ],
    ),
    (
        "Culture & Fit",
        &[
            "What kind of team environment helps you do your best work?",
            "How do you prefer to give and receive feedback?",
            "What are you looking for in your next role that you do not have today?",
        ],
    ),
];

/// Deterministic question synthesis from a job's title and required skills.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionGenerator;

impl QuestionGenerator {
    /// Technical Skills first, then role categories matched on the title, then the fixed
    /// categories. Same job in, same output out.
    pub fn generate(job: &Job) -> Vec<QuestionCategory> {
        let mut categories = vec![technical_category(job)];

        let title = job.title.to_lowercase();
        categories.extend(
            ROLE_TEMPLATES
                .iter()
                .filter(|template| {
                    template
                        .keywords
                        .iter()
                        .any(|keyword| title_mentions(&title, keyword))
                })
                .map(|template| QuestionCategory {
                    category: template.category.to_string(),
                    questions: template.questions.iter().map(|q| q.to_string()).collect(),
                }),
        );

        let role = display_title(job);
        categories.extend(FIXED_CATEGORIES.iter().map(|(category, questions)| {
            QuestionCategory {
                category: category.to_string(),
                questions: questions
                    .iter()
                    .map(|question| question.replace("{title}", &role))
                    .collect(),
            }
        }));

        categories
    }
}

fn technical_category(job: &Job) -> QuestionCategory {
    let skills: Vec<&str> = job
        .required_skills
        .iter()
        .map(|skill| skill.trim())
        .filter(|skill| !skill.is_empty())
        .take(MAX_SKILL_QUESTIONS)
        .collect();

    let questions = if skills.is_empty() {
        GENERIC_TECHNICAL.iter().map(|q| q.to_string()).collect()
    } else {
        skills
            .iter()
            .enumerate()
            .map(|(index, skill)| {
                SKILL_TEMPLATES[index % SKILL_TEMPLATES.len()].replace("{skill}", skill)
            })
            .collect()
    };

    QuestionCategory {
        category: "Technical Skills".to_string(),
        questions,
    }
}

/// Short keywords like `ui` or `ml` must match a whole word, not a fragment of one.
fn title_mentions(title: &str, keyword: &str) -> bool {
    if keyword.len() > 3 {
        return title.contains(keyword);
    }
    title
        .split(|ch: char| !ch.is_alphanumeric())
        .any(|word| word == keyword)
}

fn display_title(job: &Job) -> String {
    let title = job.title.trim();
    if title.is_empty() {
        "open".to_string()
    } else {
        title.to_string()
    }
}
