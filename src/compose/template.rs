//! Deterministic email template.

use crate::config::ApplicantProfile;
use crate::research::ResearchContext;

use super::{Draft, DraftOrigin, SUBJECT};

/// Shortest publication title worth quoting.
pub const MIN_TITLE_CHARS: usize = 10;

/// Scraped strings that are column headers, not titles.
const PLACEHOLDER_TITLES: [&str; 4] = ["title", "publication", "paper", "article"];

const CLOSING: [&str; 3] = [
    "I am excited about the possibility of contributing to your research and would greatly appreciate the opportunity to discuss potential PhD projects with you. I believe my background and research interests align well with your work, and I am eager to learn from your expertise.",
    "Would you be available for a brief meeting to discuss this opportunity further? I am happy to work around your schedule.",
    "Thank you for considering my interest. I look forward to hearing from you.",
];

/// Interest phrases from every source that produced data, in source order.
pub fn interests(context: &ResearchContext) -> Vec<&str> {
    context
        .data()
        .flat_map(|fields| fields.phrases.iter().map(String::as_str))
        .collect()
}

/// Publication titles from every source that produced data, in source order.
pub fn titles(context: &ResearchContext) -> Vec<&str> {
    context
        .data()
        .flat_map(|fields| fields.titles.iter().map(String::as_str))
        .collect()
}

/// Whether a scraped title is a real publication title.
pub fn is_usable_title(title: &str) -> bool {
    let trimmed = title.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() >= MIN_TITLE_CHARS
        && !PLACEHOLDER_TITLES
            .iter()
            .any(|p| trimmed.eq_ignore_ascii_case(p))
}

/// Personalization sentences, one per kind of signal found.
pub fn personalization(context: &ResearchContext) -> Vec<String> {
    let mut sentences = Vec::new();

    let interests = interests(context);
    if !interests.is_empty() {
        let mut text = format!(
            "I am particularly drawn to your work in {}",
            interests[..interests.len().min(2)].join(", ")
        );
        if let Some(third) = interests.get(2) {
            text.push_str(&format!(", and {third}"));
        }
        text.push('.');
        sentences.push(text);
    }

    if let Some(title) = titles(context).into_iter().find(|t| is_usable_title(t)) {
        sentences.push(format!(
            "Your recent publication \"{title}\" especially resonates with my research interests."
        ));
    }

    sentences
}

/// Compose the template draft. Same inputs, same bytes.
pub fn compose_template(profile: &ApplicantProfile, context: &ResearchContext) -> Draft {
    let mut lines: Vec<String> = vec![
        format!("Dear Professor {},", profile.professor_name),
        String::new(),
        format!(
            "I hope this email finds you well. My name is {}, and I am writing to express my strong interest in pursuing a PhD under your supervision.",
            profile.name
        ),
    ];

    let background = profile.background.trim();
    if !background.is_empty() {
        lines.push(String::new());
        lines.push(background.to_string());
    }

    let personalization = personalization(context);
    if !personalization.is_empty() {
        lines.push(String::new());
        lines.push(personalization.join("\n\n"));
    }

    for paragraph in CLOSING {
        lines.push(String::new());
        lines.push(paragraph.to_string());
    }
    lines.push(String::new());
    lines.push("Best regards,".to_string());
    lines.push(profile.name.clone());

    Draft::with_origin(SUBJECT, lines.join("\n"), DraftOrigin::Template)
}
