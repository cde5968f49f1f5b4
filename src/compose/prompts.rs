//! Prompts for model-written drafts.

use crate::config::ApplicantProfile;

/// System prompt for draft generation.
pub const SYSTEM_PROMPT: &str = "You are an expert at writing professional academic emails.";

/// Digest of what the research found, for the generation prompt.
pub fn research_digest(professor: &str, interests: &[&str], titles: &[&str]) -> String {
    let interests = if interests.is_empty() {
        "Not available".to_string()
    } else {
        interests.join(", ")
    };
    let mut digest = format!("Professor {professor}'s research interests: {interests}.\n");
    if let Some(first) = titles.first() {
        digest.push_str(&format!("Recent publications include: {first}"));
    }
    digest
}

/// The user prompt asking for a complete email body.
pub fn generation_prompt(profile: &ApplicantProfile, interests: &[&str], titles: &[&str]) -> String {
    let professor = &profile.professor_name;
    let digest = research_digest(professor, interests, titles);
    format!(
        "\
You are helping a PhD applicant write a professional, personalized email to a professor.

Applicant Information:
- Name: {name}
- Background: {background}

Professor Information:
- Name: Professor {professor}
- {digest}

Write a professional PhD inquiry email that:
1. Is warm but formal
2. References specific research interests or publications
3. Explains why the applicant is a good fit
4. Requests a meeting to discuss PhD opportunities
5. Is concise (250-300 words)
6. Shows genuine interest in the professor's work

Do not include a subject line. Start with \"Dear Professor {professor},\" and end with \"Best regards,\n{name}\"
",
        name = profile.name,
        background = profile.background.trim(),
    )
}
